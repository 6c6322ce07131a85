use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use pixel_banana::config::{AskPolicy, FallbackReplies};
use pixel_banana::transport::MockTransport;
use pixel_banana::types::chat::ChatResponse;
use pixel_banana::types::HttpResponse;
use pixel_banana::ModelClient;
use pixel_banana::Result;

fn client_with(mock: &MockTransport) -> Result<ModelClient> {
    ModelClient::builder()
        .base_url("http://mock.ollama.local")
        .model("qwen3:1.7b")
        .transport(Arc::new(mock.clone()))
        .build()
}

#[tokio::test]
async fn test_ask_returns_first_usable_answer() -> Result<()> {
    let mock = MockTransport::new().with_json(
        "/api/chat",
        &ChatResponse::with_content("<think>the user greets me</think>你好呀！"),
    );
    let client = client_with(&mock)?;

    assert_eq!(client.ask("你好", None).await, "你好呀！");
    assert_eq!(mock.request_count("/api/chat"), 1);
    Ok(())
}

#[tokio::test]
async fn test_ask_retries_when_first_answer_is_only_reasoning() -> Result<()> {
    let mock = MockTransport::new()
        .with_json(
            "/api/chat",
            &ChatResponse::with_content("<think>I should think about this for a long time"),
        )
        .with_json("/api/chat", &ChatResponse::with_content("答：今天适合散步。"));
    let client = client_with(&mock)?;

    let answer = client.ask("今天做什么好呢？", Some("你是一只桌面宠物")).await;

    assert_eq!(answer, "今天适合散步。");
    assert_eq!(mock.request_count("/api/chat"), 2);
    Ok(())
}

#[tokio::test]
async fn test_second_attempt_is_stricter() -> Result<()> {
    let mock = MockTransport::new()
        .with_json("/api/chat", &ChatResponse::with_content(""))
        .with_json("/api/chat", &ChatResponse::with_content("好的"));
    let client = client_with(&mock)?;

    client.ask("随便说点什么吧", Some("你是一只桌面宠物")).await;

    let requests = mock.requests();
    let first = requests[0].body.clone().unwrap_or_default();
    let second = requests[1].body.clone().unwrap_or_default();

    assert_eq!(first["stream"], json!(false));
    assert_eq!(first["model"], json!("qwen3:1.7b"));
    assert!(first["options"].get("stop").is_none());
    assert!(second["options"]["stop"]
        .as_array()
        .is_some_and(|stops| stops.contains(&json!("User:"))));
    assert_eq!(second["options"]["num_ctx"], json!(1024));

    let policy = client.policy();
    let system_one = first["messages"][0]["content"].as_str().unwrap_or_default();
    let system_two = second["messages"][0]["content"].as_str().unwrap_or_default();
    assert!(system_one.starts_with("你是一只桌面宠物"));
    assert!(system_one.contains(&policy.no_reasoning_instruction));
    assert!(!system_one.contains(&policy.strict_instruction));
    assert!(system_two.contains(&policy.strict_instruction));
    assert_eq!(second["messages"][1]["content"], json!("随便说点什么吧"));
    Ok(())
}

#[tokio::test]
async fn test_suppressing_reasoning_creates_system_message() -> Result<()> {
    let mock = MockTransport::new().with_json("/api/chat", &ChatResponse::with_content("嗯"));
    let client = client_with(&mock)?;

    client.ask("hi", None).await;
    client.ask_with("hi", None, false).await;

    let requests = mock.requests();
    let suppressed = requests[0].body.clone().unwrap_or_default();
    let plain = requests[1].body.clone().unwrap_or_default();
    assert_eq!(suppressed["messages"][0]["role"], json!("system"));
    assert_eq!(plain["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(plain["messages"][0]["role"], json!("user"));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_falls_back() -> Result<()> {
    let mock = MockTransport::new();
    let client = client_with(&mock)?;
    let fallback = FallbackReplies::default();

    let answer = client.ask("你能帮我写一首关于香蕉的长诗吗", None).await;

    assert!(fallback.all().contains(&answer.as_str()));
    assert_eq!(mock.request_count("/api/chat"), 2);
    Ok(())
}

#[tokio::test]
async fn test_fallback_follows_prompt_keywords() -> Result<()> {
    let client = client_with(&MockTransport::new())?;
    let fallback = FallbackReplies::default();

    assert_eq!(client.ask("Hello there, pet", None).await, fallback.greeting);
    assert_eq!(client.ask("明天天气怎么样呢？会下雨吗？", None).await, fallback.weather);
    assert_eq!(client.ask("嗯", None).await, fallback.acknowledge);
    assert_eq!(
        client.ask("please summarize the quarterly report", None).await,
        fallback.confused
    );
    Ok(())
}

#[tokio::test]
async fn test_http_error_becomes_diagnostic() -> Result<()> {
    let body = "x".repeat(500);
    let mock = MockTransport::new()
        .with_response("/api/chat", HttpResponse::new(500, body.clone()));
    let client = client_with(&mock)?;

    let answer = client.ask("在吗", None).await;

    assert!(answer.starts_with("[HTTP 500] "));
    assert_eq!(answer.chars().count(), "[HTTP 500] ".chars().count() + 160);
    assert_eq!(mock.request_count("/api/chat"), 1);
    Ok(())
}

#[tokio::test]
async fn test_model_error_becomes_diagnostic() -> Result<()> {
    let mock = MockTransport::new().with_json(
        "/api/chat",
        &json!({"error": "model 'qwen3:1.7b' not found"}),
    );
    let client = client_with(&mock)?;

    assert_eq!(
        client.ask("在吗", None).await,
        "[model error] model 'qwen3:1.7b' not found"
    );
    Ok(())
}

#[tokio::test]
async fn test_chat_reports_status() -> Result<()> {
    let mock = MockTransport::new()
        .with_response("/api/chat", HttpResponse::new(404, "no such model"));
    let client = client_with(&mock)?;

    let request = pixel_banana::types::chat::ChatRequest::new(
        "qwen3:1.7b",
        vec![pixel_banana::types::chat::ChatMessage::user("hi")],
    );
    match client.chat(request).await {
        Err(pixel_banana::Error::Status { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such model");
        }
        other => panic!("expected a status error, got {:?}", other.map(|r| r.done)),
    }
    Ok(())
}

#[tokio::test]
async fn test_pull_without_response_times_out() -> Result<()> {
    let mock = MockTransport::new().with_hang("/api/pull");
    let client = ModelClient::builder()
        .base_url("http://mock.ollama.local")
        .model("qwen3:1.7b")
        .transport(Arc::new(mock.clone()))
        .policy(AskPolicy {
            pull_idle_timeout: Duration::from_millis(30),
            ..AskPolicy::default()
        })
        .build()?;

    let outcome = tokio::time::timeout(Duration::from_secs(5), client.pull("qwen3:1.7b"))
        .await
        .expect("pull gives up on its own");

    assert!(matches!(outcome, Err(pixel_banana::Error::Timeout(_))));
    Ok(())
}

#[tokio::test]
async fn test_is_available() -> Result<()> {
    let up = MockTransport::new().with_json("/api/tags", &json!({"models": []}));
    assert!(client_with(&up)?.is_available().await);

    let broken = MockTransport::new().with_response("/api/tags", HttpResponse::new(503, ""));
    assert!(!client_with(&broken)?.is_available().await);

    let down = MockTransport::new();
    assert!(!client_with(&down)?.is_available().await);
    Ok(())
}

#[tokio::test]
async fn test_list_models_accepts_both_shapes() -> Result<()> {
    let ollama = MockTransport::new().with_json(
        "/api/tags",
        &json!({"models": [{"name": "qwen3:1.7b", "size": 1}, {"model": "llama3.2:3b"}]}),
    );
    assert_eq!(
        client_with(&ollama)?.list_models().await,
        vec!["qwen3:1.7b".to_string(), "llama3.2:3b".to_string()]
    );

    let openai = MockTransport::new().with_json(
        "/api/tags",
        &json!({"data": [{"model": "qwen3:1.7b"}]}),
    );
    assert_eq!(
        client_with(&openai)?.list_models().await,
        vec!["qwen3:1.7b".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_list_models_is_empty_on_failure() -> Result<()> {
    let garbage = MockTransport::new().with_response("/api/tags", HttpResponse::new(200, "<html>"));
    assert!(client_with(&garbage)?.list_models().await.is_empty());

    let down = MockTransport::new();
    assert!(client_with(&down)?.list_models().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unload_sends_zero_keep_alive() -> Result<()> {
    let mock = MockTransport::new().with_json("/api/generate", &json!({"done": true}));
    let client = client_with(&mock)?;

    assert!(client.unload().await);

    let body = mock.requests()[0].body.clone().unwrap_or_default();
    assert_eq!(
        body,
        json!({"model": "qwen3:1.7b", "prompt": "", "stream": false, "keep_alive": 0})
    );
    Ok(())
}

#[tokio::test]
async fn test_unload_never_fails_loudly() -> Result<()> {
    let down = MockTransport::new();
    assert!(!client_with(&down)?.unload().await);

    let refused = MockTransport::new().with_response("/api/generate", HttpResponse::new(500, ""));
    assert!(!client_with(&refused)?.unload().await);
    Ok(())
}
