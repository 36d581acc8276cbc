use clap::Parser;
use iacs_ingest::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Upload(args) => cli::upload::run(args).await,
        Command::Email(args) => cli::email::run(args).await,
        Command::Inspect(args) => cli::inspect::run(args).await,
    }
}
