use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dnp3_api::auth::AuthService;
use dnp3_api::{ServerBuilder, ServerConfig};
use dnp3_core::config::{AppConfig, LogFormat, LoggingConfig};
use dnp3_core::{InMemoryDataService, LocalFileService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Host for the DNP3 adversary emulation plugin
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Override bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Override log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", logging.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_config_builder(&args.config)
        .with_context(|| format!("Failed to load config file: {:?}", args.config))?;
    if let Some(format) = args.log_format {
        config.logging.format = format.into();
    }
    if let Some(addr) = args.bind {
        config.server.set_bind_addr(addr);
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging);
    info!("Configuration loaded from {:?}", args.config);

    let bind_addr = config.server.bind_addr()?;

    let catalog = InMemoryDataService::from_dir(&config.data.abilities_dir)
        .context("Failed to load ability catalog")?;
    let files = LocalFileService::new(&config.data.plugins_dir, config.data.payload_dirs.clone());
    let auth = AuthService::from_section(&config.auth)?;

    let server = ServerBuilder::new(ServerConfig { bind_addr })
        .with_data_service(Arc::new(catalog))
        .with_file_service(Arc::new(files))
        .with_auth_service(Arc::new(auth))
        .build()?;

    info!(bind_addr = %bind_addr, "Starting DNP3 plugin host");

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
