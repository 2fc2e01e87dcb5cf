//! Confessions CLI - post and like anonymous confessions from the terminal
//!
//! Quick capture works without a subcommand: `confess "my confession"`.

mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::like::run_like;
use crate::commands::list::run_list;
use crate::commands::post::run_post;
use crate::commands::whoami::run_whoami;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        if matches!(&error, CliError::Core(core) if core.is_transient()) {
            eprintln!("Nothing was changed; try again.");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "confessions=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = &cli.session;

    match cli.command {
        Some(Commands::Post { text }) => run_post(&text, session).await?,
        Some(Commands::List { limit, json }) => run_list(limit, json, session).await?,
        Some(Commands::Like { id }) => run_like(&id, session).await?,
        Some(Commands::Whoami { json }) => run_whoami(json, session).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        Some(Commands::Config { command }) => run_config(command, session.profile.as_deref())?,
        None => {
            if cli.confession.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_post(&cli.confession, session).await?;
            }
        }
    }

    Ok(())
}
