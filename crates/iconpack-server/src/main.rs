use clap::Parser;
use iconpack_core::{Pipeline, PipelineConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "iconpack-server", about = "HTTP trigger for iconpack publish runs")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 1000)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Path to iconpack.toml.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match PipelineConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };
    let pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let addr = format!("{}:{}", cli.host, cli.port);
    info!("starting iconpack-server on {addr}");
    info!("icon service: {}", config.icon_service.url);
    info!("work directory: {}", config.work_dir.display());

    match iconpack_server::run_server(&pipeline, &addr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
