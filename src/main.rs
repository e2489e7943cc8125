use chrono::Local;
use clap::Parser;
use pricecrawl::{config::Config, info_time, process::process_catalog, Result};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let filter = if config.quiet {
        EnvFilter::new("off")
    } else if config.verbose {
        EnvFilter::new("pricecrawl=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Records go to stdout, logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config);

    let start_time = Local::now();
    process_catalog(&config).await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}
