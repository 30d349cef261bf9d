//! Voicelink CLI - Database migrations and store maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Apply the bridge's database migrations
//! vl-cli migrate
//!
//! # Delete expired handshakes, linking codes and bearer tokens
//! vl-cli purge
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `purge` - Purge expired records from the `PostgreSQL` store

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vl-cli")]
#[command(author, version, about = "Voicelink bridge operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Delete expired records from the credential store
    Purge,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Purge => commands::purge::run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["vl-cli", "migrate"]).map(|c| c.command),
            Ok(Commands::Migrate)
        ));
        assert!(matches!(
            Cli::try_parse_from(["vl-cli", "purge"]).map(|c| c.command),
            Ok(Commands::Purge)
        ));
        assert!(Cli::try_parse_from(["vl-cli", "seed"]).is_err());
    }
}
