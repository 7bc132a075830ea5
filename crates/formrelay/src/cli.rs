//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formrelay_core::logging::Verbosity;

/// formrelay - serve pages, relay form posts into a JSON log
#[derive(Debug, Parser)]
#[command(name = "formrelay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (default: ./formrelay.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Command to run; serves when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP front and the store writer
    Serve,

    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["formrelay"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["formrelay", "-vv", "--config", "site.toml", "config"]);
        assert!(matches!(cli.command, Some(Command::Config)));
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
        assert_eq!(cli.verbosity(), Verbosity::Trace);

        let cli = Cli::parse_from(["formrelay", "serve", "-q"]);
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
