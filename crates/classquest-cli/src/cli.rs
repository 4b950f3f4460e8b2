//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ClassQuest document tools
#[derive(Debug, Parser)]
#[command(name = "classquest", version)]
#[command(about = "Check, migrate, and inspect ClassQuest classroom documents", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "classquest-config.yaml")]
    pub config: PathBuf,

    /// Emit JSON log lines (overrides logging.json)
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a document and list the repairs loading it would make
    Check {
        /// Document to check
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a document in canonical form at the current version
    Migrate {
        /// Document to migrate
        file: PathBuf,

        /// Write here instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show class progress and student levels
    Progress {
        /// Document to read (defaults to the configured document)
        file: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the configured document with an exported one
    Import {
        /// Exported document
        file: PathBuf,
    },

    /// Export the configured document
    Export {
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_migrate_with_output() {
        let cli =
            Cli::try_parse_from(["classquest", "migrate", "old.json", "-o", "new.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("classquest-config.yaml"));
        let Command::Migrate { file, output } = cli.command else {
            panic!("expected migrate, got {:?}", cli.command);
        };
        assert_eq!(file, PathBuf::from("old.json"));
        assert_eq!(output, Some(PathBuf::from("new.json")));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "classquest",
            "progress",
            "--json",
            "--config",
            "/etc/classquest.yaml",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.config, PathBuf::from("/etc/classquest.yaml"));
        assert!(matches!(cli.command, Command::Progress { file: None, json: true }));
    }

    #[test]
    fn check_requires_a_file() {
        assert!(Cli::try_parse_from(["classquest", "check"]).is_err());
    }
}
