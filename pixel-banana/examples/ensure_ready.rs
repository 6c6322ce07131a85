use std::io::Write;

use pixel_banana::bootstrap::Bootstrapper;
use pixel_banana::config::PetConfig;
use pixel_banana::ModelClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    let config = PetConfig::from_env();
    let client = ModelClient::builder().config(&config).build()?;
    let bootstrapper =
        Bootstrapper::new(client).on_state(|state| eprintln!("\n[{:?}]", state));

    let state = bootstrapper
        .bootstrap(|progress| {
            match progress.percent {
                Some(percent) => print!("\r{} {:>3}%", progress.status, percent),
                None => print!("\r{}", progress.status),
            }
            let _ = std::io::stdout().flush();
        })
        .await;

    println!("\nfinal state: {:?}", state);
    Ok(())
}
