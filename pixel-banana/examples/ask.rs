use pixel_banana::config::PetConfig;
use pixel_banana::ModelClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    let config = PetConfig::from_env();
    let client = ModelClient::builder().config(&config).build()?;

    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = if prompt.is_empty() {
        "用一句话介绍一下你自己".to_string()
    } else {
        prompt
    };

    let answer = client
        .ask(&prompt, Some("你是桌面宠物不拿拿，说话简短可爱。"))
        .await;
    println!("{}", answer);

    if config.unload_on_exit {
        client.unload().await;
    }

    Ok(())
}
