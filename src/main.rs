use anyhow::{Context, Result};

use mikasa::config::Config;
use mikasa::{input, menu};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("failed to load configuration")?;

    let mut lines = input::LineReader::spawn();
    menu::run(&config, &mut lines).await?;

    Ok(())
}
