//! Basic image generation with the built-in provider order.
//!
//! Run with: `cargo run --example generate_image`
//!
//! Requires at least one of: `CF_ACCOUNT` + `CF_TOKEN`, `DEEPAI_KEY`,
//! or `HF_TOKEN`.

use imagegen_failover::ProviderFailoverClient;

#[tokio::main]
async fn main() -> imagegen_failover::Result<()> {
    let client = ProviderFailoverClient::from_env()?;

    for provider in client.readiness() {
        println!("{:<12} ready={}", provider.name, provider.ready);
    }

    let image = client.generate("A serene mountain lake at dawn").await?;

    let ext = image.format().map(|f| f.extension()).unwrap_or("png");
    let filename = format!("lake.{ext}");
    image.save(&filename)?;
    println!(
        "Saved to {} ({} bytes) via {}",
        filename,
        image.size(),
        image.provider_name
    );

    Ok(())
}
