use anyhow::Result;
use args::{CliArgs, CliConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod status;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays machine-readable
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy()
        .add_directive("ionflux=info".parse()?)
        .add_directive("ionflux_signers=info".parse()?)
        .add_directive("chain_registry=info".parse()?);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli_args = CliArgs::parse();
    let config = CliConfig::load(&cli_args.global)?;

    commands::run(cli_args.command, &config).await
}
