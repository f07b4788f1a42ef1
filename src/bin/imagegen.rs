//! CLI for imagegen-failover.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use imagegen_failover::{
    AttemptLog, AttemptStatus, FailoverError, ImageFormat, ProviderFailoverClient,
    ProviderRegistry,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagegen")]
#[command(about = "Generate images from text, failing over across image providers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON provider registry (defaults to the built-in providers)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate(GenerateArgs),

    /// List configured providers and whether their credentials are set
    Providers,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path (extension added from the image format if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Per-provider timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = load_registry(cli.registry.as_ref())?;

    match cli.command {
        Commands::Generate(args) => generate(args, registry, cli.json).await,
        Commands::Providers => list_providers(registry, cli.json),
    }
}

fn load_registry(path: Option<&PathBuf>) -> anyhow::Result<ProviderRegistry> {
    match path {
        Some(path) => ProviderRegistry::from_path(path)
            .with_context(|| format!("failed to load registry {}", path.display())),
        None => Ok(imagegen_failover::presets::default_registry()?),
    }
}

async fn generate(
    args: GenerateArgs,
    registry: ProviderRegistry,
    json_output: bool,
) -> anyhow::Result<()> {
    if args.timeout == 0 {
        anyhow::bail!("--timeout must be at least 1 second");
    }

    let log = AttemptLog::new();
    let client = ProviderFailoverClient::builder()
        .registry(registry)
        .timeout(Duration::from_secs(args.timeout))
        .observer(log.clone())
        .build()?;

    let image = match client.generate(&args.prompt).await {
        Ok(image) => image,
        Err(FailoverError::InvalidInput(msg)) => anyhow::bail!("{msg}"),
        Err(e @ FailoverError::AllProvidersExhausted { .. }) => {
            if json_output {
                let result = serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "attempts": log.records(),
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            anyhow::bail!("generation failed, try again later ({e})");
        }
        Err(e) => return Err(e.into()),
    };

    let mut output = args.output;
    if output.extension().is_none() {
        if let Some(format) = image.format() {
            output.set_extension(format.extension());
        }
    } else if let (Some(ext), Some(actual)) = (
        output.extension().and_then(|e| e.to_str()).and_then(ImageFormat::from_extension),
        image.format(),
    ) {
        if ext != actual {
            tracing::warn!(
                requested = ext.extension(),
                actual = actual.extension(),
                "output extension does not match image format"
            );
        }
    }

    image.save(&output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format().map(|f| f.extension()),
            "provider": image.provider_name,
            "duration_ms": image.duration.as_millis() as u64,
            "attempts": log.records(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image: {} ({} bytes) via {}",
            output.display(),
            image.size(),
            image.provider_name
        );
        let skipped = log.count(AttemptStatus::Skipped);
        let failed = log.count(AttemptStatus::Failed);
        if skipped + failed > 0 {
            println!("Providers skipped: {skipped}, failed: {failed}");
        }
    }

    Ok(())
}

fn list_providers(registry: ProviderRegistry, json_output: bool) -> anyhow::Result<()> {
    let client = ProviderFailoverClient::builder().registry(registry).build()?;
    let readiness = client.readiness();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&readiness)?);
        return Ok(());
    }

    println!("Providers (failover order):\n");
    for (provider, status) in client.registry().iter().zip(&readiness) {
        let mark = if status.ready { "✓" } else { "✗" };
        println!("  {} {} ({})", mark, provider.name(), provider.endpoint_url());
        if !provider.required_credentials().is_empty() {
            println!("    credentials: {}", provider.required_credentials().join(", "));
        }
        if !status.missing.is_empty() {
            println!("    missing: {}", status.missing.join(", "));
        }
    }

    Ok(())
}
