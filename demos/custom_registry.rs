//! Failover over a registry loaded from JSON, with per-attempt diagnostics.
//!
//! Run with: `cargo run --example custom_registry -- registry.json "a prompt"`

use imagegen_failover::{AttemptLog, ProviderFailoverClient, ProviderRegistry};
use std::time::Duration;

#[tokio::main]
async fn main() -> imagegen_failover::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(path), Some(prompt)) = (args.next(), args.next()) else {
        eprintln!("usage: custom_registry <registry.json> <prompt>");
        std::process::exit(2);
    };

    let log = AttemptLog::new();
    let client = ProviderFailoverClient::builder()
        .registry(ProviderRegistry::from_path(&path)?)
        .timeout(Duration::from_secs(30))
        .observer(log.clone())
        .build()?;

    let result = client.generate(&prompt).await;

    for record in log.records() {
        println!(
            "{:<16} {:<10} {}",
            record.provider,
            record.status,
            record.detail.unwrap_or_default()
        );
    }

    let image = result?;
    image.save("output.img")?;
    println!("Saved output.img via {}", image.provider_name);
    Ok(())
}
