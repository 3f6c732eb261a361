use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sunshine_rotator::config::RotatorConfig;

/// Sunshine rotator runtime: reads JSON commands on stdin, publishes
/// rotator state as JSON lines on stdout.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the rotator controller
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long)]
    baud: Option<u32>,

    /// Timer period between motion steps, in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Run against the simulated device instead of a serial port
    #[arg(long)]
    simulate: bool,
}

impl Args {
    fn into_config(self) -> Result<RotatorConfig, sunshine_rotator::config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => RotatorConfig::from_file(path)?,
            None => RotatorConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(poll_ms) = self.poll_ms {
            config.poll_period_ms = poll_ms;
        }
        config.simulate |= self.simulate;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug); stdout carries published state
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = sunshine_rotator::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
