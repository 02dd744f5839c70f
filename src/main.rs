use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pane::cli::{Cli, Commands, ContextCommands};
use pane::commands;
use pane::config::Config;
use pane::store::ContextStore;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "pane=debug" } else { "pane=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> pane::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let store = ContextStore::new(ContextStore::default_path());

    match cli.command {
        Commands::Enroll {
            url,
            context,
            seed,
            headed,
        } => {
            commands::enroll::run(
                commands::enroll::EnrollArgs {
                    url,
                    context,
                    seed,
                    headed,
                },
                &config,
                &store,
            )
            .await
        }
        Commands::Scramble { count, export } => commands::scramble::run(count, export),
        Commands::Context { command } => match command {
            ContextCommands::List => commands::context::list(&store),
            ContextCommands::Show { name } => commands::context::show(&store, &name),
            ContextCommands::Burn { name } => commands::context::burn(&store, &config, &name).await,
        },
    }
}
