mod collect;
mod urls;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pautas-cli")]
#[command(about = "Incremental comment extraction for tracked social posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract comments for every configured URL and merge them into the store
    Collect {
        /// Run the extraction and merge but do not write the store
        #[arg(long)]
        dry_run: bool,

        /// Process only the first valid URL
        #[arg(long)]
        only_first: bool,
    },
    /// List configured URLs with their detected platform
    Urls,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = pautas_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Collect {
            dry_run,
            only_first,
        }) => collect::run_collect(&config, dry_run, only_first).await?,
        Some(Commands::Urls) => urls::run_urls(&config)?,
        None => println!("pautas-cli: use `collect` or `urls` (see --help)"),
    }

    Ok(())
}
