use anyhow::Context;
use clap::Parser;

mod bootstrap;
mod cli;
mod output;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("lakehouse error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    bootstrap::load_dotenv(std::path::Path::new("."))?;
    let mut cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    // A .env under --root can only feed the env-backed flags after a re-parse.
    if cli.root != std::path::Path::new(".") {
        bootstrap::load_dotenv(&cli.root)?;
        cli = cli::Cli::parse();
    }

    let dispatcher = bootstrap::dispatcher(&cli.root)?;
    let result = dispatcher
        .execute(&cli.script, Some(&cli.entry), cli.parameters())
        .await
        .with_context(|| format!("running {}.{}", cli.script, cli.entry))?;

    output::output(&result, cli.format)
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LAKEHOUSE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
