use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use download_predict::{Config, Pipeline};
use miette::IntoDiagnostic;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to an extra config file, layered over ./config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the prediction batch instead of posting it to the result store
    #[arg(long)]
    dry_run: bool,
    /// Batch event json; read from stdin when omitted
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let args = Cli::parse();
    let config = Config::new(args.config.as_deref()).into_diagnostic()?;
    info!(?config, "config");

    let raw = match &args.event {
        Some(path) => std::fs::read_to_string(path).into_diagnostic()?,
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw).into_diagnostic()?;
            raw
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw).into_diagnostic()?;

    let pipeline = Pipeline::new(&config, reqwest::Client::new());
    if args.dry_run {
        let batch = pipeline.run(&event).await?;
        println!("{}", serde_json::to_string_pretty(&batch).into_diagnostic()?);
    } else {
        pipeline.run_and_save(&event).await?;
    }
    Ok(())
}
