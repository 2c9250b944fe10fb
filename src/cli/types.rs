//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zombie-dispatch")]
#[command(about = "Chat dispatcher for a local Ollama backend", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to config/dispatch.yaml)
    #[arg(short, long, global = true, env = "ZOMBIE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP dispatcher until interrupted
    Serve,

    /// Delete conversations older than the retention horizon
    Cleanup {
        /// Retention horizon in days (defaults to the configured one)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Show recent conversations for an agent
    History {
        /// Agent identifier
        agent: String,

        /// Maximum number of conversations to display
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history_with_limit() {
        let cli =
            Cli::try_parse_from(["zombie-dispatch", "history", "hello_zombie", "--limit", "5"])
                .expect("should parse");
        match cli.command {
            Commands::History { agent, limit } => {
                assert_eq!(agent, "hello_zombie");
                assert_eq!(limit, 5);
            }
            _ => panic!("expected history command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "zombie-dispatch",
            "cleanup",
            "--days",
            "7",
            "--json",
            "-c",
            "x.yaml",
        ])
        .expect("should parse");
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        assert!(matches!(cli.command, Commands::Cleanup { days: Some(7) }));
    }

    #[test]
    fn test_history_requires_agent() {
        assert!(Cli::try_parse_from(["zombie-dispatch", "history"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
