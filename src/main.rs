use std::path::PathBuf;
use std::process::ExitCode;

use cave_vr::config::CaveConfig;
use cave_vr::error::CaveResult;
use clap::Parser;
use log::{error, info};

#[derive(Parser)]
#[command(name = "cave_vr")]
#[command(about = "CAVE projection simulator rendered in a stereo headset view")]
#[command(version)]
struct Cli {
    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the disabled projector roll
    #[arg(long)]
    seed: Option<u64>,

    /// Override the square wall render target resolution
    #[arg(long)]
    wall_resolution: Option<u32>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> ExitCode {
    // RUST_LOG controls the level, e.g. RUST_LOG=cave_vr=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CaveResult<()> {
    let mut config = CaveConfig::load(cli.config.as_deref())?;
    if let Some(resolution) = cli.wall_resolution {
        config.wall_resolution = resolution;
        config.validate()?;
    }

    if cli.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    info!("CAVE simulator starting...");
    cave_vr::app::run(config, cli.seed)
}
