//! Zentinel API Versioning - CLI Entry Point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zentinel_api_versioning::config::DEFAULT_CONFIG;
use zentinel_api_versioning::{GatewayRequest, VersionGateway, VersioningConfig};

#[derive(Parser, Debug)]
#[command(
    name = "zentinel-api-versioning",
    about = "Media-type API versioning and deprecation lifecycle for Zentinel",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "api-versioning.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// List registered resource versions and exit
    #[arg(long)]
    list: bool,

    /// Request path to negotiate (e.g. /flip/greeting/hello)
    #[arg(short, long)]
    path: Option<String>,

    /// Accept header value sent with the request
    #[arg(short, long)]
    accept: Option<String>,

    /// Request parameter passed to the representation, as NAME=VALUE
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Print Prometheus metrics after handling the request
    #[arg(long)]
    metrics: bool,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Print default config if requested
    if args.print_config {
        println!("{}", DEFAULT_CONFIG);
        return Ok(());
    }

    // Load configuration
    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        VersioningConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration");
        VersioningConfig::bundled()?
    };

    // Validate and exit if requested
    if args.validate {
        config.validate()?;
        println!("Configuration is valid");
        return Ok(());
    }

    let gateway = VersionGateway::new(config)?;

    if args.list {
        let dispatcher = gateway.dispatcher();
        for descriptor in dispatcher.registry().descriptors() {
            let successor = descriptor
                .successor
                .as_ref()
                .map(|s| format!(" -> {}", s))
                .unwrap_or_default();
            println!(
                "{:<40} {:<10}{}",
                dispatcher.format().for_descriptor(descriptor),
                descriptor.state,
                successor
            );
        }
        return Ok(());
    }

    let Some(path) = args.path else {
        anyhow::bail!("Nothing to do: pass --path, --list, --validate or --print-config");
    };

    let mut request = GatewayRequest::new(path);
    request.accept = args.accept;
    request.params = args.params.into_iter().collect();

    let response = gateway.handle(&request);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if args.metrics {
        print!("{}", gateway.metrics().encode());
    }

    Ok(())
}
