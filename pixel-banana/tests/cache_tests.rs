use std::time::Duration;

use pixel_banana::cache::TtlCache;

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let cache = TtlCache::new(Duration::from_secs(1));
    cache.insert("geo:zh:南京".to_string(), 32.06);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(cache.get(&"geo:zh:南京".to_string()), None);
    assert!(cache.is_empty());
}

#[test]
fn test_entry_is_served_within_ttl() {
    let cache = TtlCache::new(Duration::from_secs(100));
    cache.insert("k", "v");

    assert_eq!(cache.get(&"k"), Some("v"));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_per_entry_ttl_overrides_default() {
    let cache = TtlCache::new(Duration::from_secs(100));
    cache.insert_with_ttl("short", 1, Duration::ZERO);
    cache.insert("long", 2);

    assert_eq!(cache.get(&"short"), None);
    assert_eq!(cache.get(&"long"), Some(2));
}

#[test]
fn test_full_cache_evicts_oldest_insertion() {
    let cache = TtlCache::with_capacity(Duration::from_secs(100), 2);
    cache.insert("a", 1);
    std::thread::sleep(Duration::from_millis(2));
    cache.insert("b", 2);
    std::thread::sleep(Duration::from_millis(2));
    cache.insert("c", 3);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&"a"), None);
    assert_eq!(cache.get(&"b"), Some(2));
    assert_eq!(cache.get(&"c"), Some(3));
}

#[test]
fn test_remove_and_clear() {
    let cache = TtlCache::new(Duration::from_secs(100));
    cache.insert(1, "one");
    cache.insert(2, "two");

    assert_eq!(cache.remove(&1), Some("one"));
    assert_eq!(cache.get(&1), None);
    cache.clear();
    assert!(cache.is_empty());
}
