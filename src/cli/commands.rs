//! CLI commands and argument parsing

use crate::fingerprint::FingerprintAlgorithm;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cursor-paginated CRM list service
#[derive(Parser, Debug)]
#[command(name = "crm-cursor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service configuration file (YAML); the built-in configuration is used when absent
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP list service
    Serve {
        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed the database with a SQL script before serving
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Mint a cursor token
    Encode {
        /// Position key of the last row returned
        #[arg(long)]
        key: String,

        /// Tenant the cursor belongs to
        #[arg(long)]
        tenant: String,

        /// Filters as a JSON object
        #[arg(long, default_value = "{}")]
        filters: String,

        /// Page size bound to the cursor
        #[arg(long, default_value = "25")]
        limit: u32,
    },

    /// Decode a cursor token
    Decode {
        /// Encoded token
        token: String,
    },

    /// Compute the fingerprint of a filter set
    Fingerprint {
        /// Filters as a JSON object
        #[arg(long, default_value = "{}")]
        filters: String,

        /// Digest to use (defaults to the configured one)
        #[arg(long)]
        algorithm: Option<FingerprintAlgorithm>,
    },

    /// Page through a remote list endpoint
    Fetch {
        /// Base URL of the list service
        #[arg(long)]
        base_url: String,

        /// Tenant to authenticate as
        #[arg(long)]
        tenant: String,

        /// Resource to list (e.g., leads)
        resource: String,

        /// Filter as name=value (repeatable)
        #[arg(long = "filter", value_name = "NAME=VALUE")]
        filters: Vec<String>,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,

        /// Resume from this cursor
        #[arg(long)]
        cursor: Option<String>,

        /// Follow cursors until the last page
        #[arg(long)]
        all: bool,

        /// Stop after this many pages when following cursors
        #[arg(long)]
        max_pages: Option<usize>,

        /// Bearer token
        #[arg(long, env = "CRM_CURSOR_TOKEN")]
        token: Option<String>,
    },

    /// List configured resources and their filters
    Resources,

    /// Validate the configuration
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_algorithm_from_args() {
        let cli = Cli::try_parse_from(["crm-cursor", "fingerprint", "--algorithm", "rolling"]).unwrap();
        match cli.command {
            Commands::Fingerprint { algorithm, .. } => {
                assert_eq!(algorithm, Some(FingerprintAlgorithm::Rolling));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["crm-cursor", "fingerprint", "--algorithm", "sha256"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Fingerprint {
                algorithm: Some(FingerprintAlgorithm::Sha256),
                ..
            }
        ));

        assert!(Cli::try_parse_from(["crm-cursor", "fingerprint", "--algorithm", "md5"]).is_err());
    }

    #[test]
    fn test_fetch_all_keeps_cursor() {
        let cli = Cli::try_parse_from([
            "crm-cursor",
            "fetch",
            "--base-url",
            "http://localhost:8080",
            "--tenant",
            "t1",
            "leads",
            "--all",
            "--cursor",
            "abc",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch { all, cursor, .. } => {
                assert!(all);
                assert_eq!(cursor.as_deref(), Some("abc"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
