use pixel_banana::config::PetConfig;
use pixel_banana::weather::WeatherClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    let config = PetConfig::from_env();
    let city = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.city.clone());
    if city.trim().is_empty() {
        eprintln!("usage: weather <city>  (or set BANANA_CITY)");
        return Ok(());
    }

    let client = WeatherClient::new(config.weather())?;
    match client.bubble_text(&city).await {
        Some(text) => println!("{}", text),
        None => println!("No weather for {}", city),
    }
    if let Some(alert) = client.alert_summary(&city).await {
        println!("{}", alert);
    }

    Ok(())
}
