//! Command-line interface definition for the Fact Pod gateway
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to enable a Fact Pod, check a returned state token,
//! and inspect a stored connection.

use clap::{Parser, Subcommand};

/// factpod-gateway - OAuth enablement for Fact Pod sites
///
/// Discovers a site's OAuth configuration, registers a client for the
/// user, and prints the authorization URL to send the user to.
#[derive(Parser, Debug, Clone)]
#[command(name = "factpod-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the database directory
    #[arg(long, env = "GATEWAY_DB_PATH")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available gateway commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Enable a Fact Pod site for a user and print the authorization URL
    Enable {
        /// Identifier of the user enabling the site
        #[arg(short, long)]
        user_id: String,

        /// Fact Pod site (host name, or a full origin such as https://pod.example)
        #[arg(short, long)]
        site: String,
    },

    /// Check a state token returned on the OAuth callback
    VerifyState {
        /// State token from the callback query string
        #[arg(long)]
        state: String,

        /// Delete the state after a successful check
        #[arg(long)]
        consume: bool,
    },

    /// Show the stored connection for a user and site
    ShowConnection {
        /// Identifier of the user
        #[arg(short, long)]
        user_id: String,

        /// Fact Pod site
        #[arg(short, long)]
        site: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            storage_path: None,
            command: Commands::VerifyState {
                state: String::new(),
                consume: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.json_logs);
        assert!(cli.storage_path.is_none());
    }

    #[test]
    fn test_cli_parse_enable() {
        let cli = Cli::try_parse_from([
            "factpod-gateway",
            "enable",
            "--user-id",
            "user-1",
            "--site",
            "pod.example.com",
        ])
        .unwrap();

        if let Commands::Enable { user_id, site } = cli.command {
            assert_eq!(user_id, "user-1");
            assert_eq!(site, "pod.example.com");
        } else {
            panic!("Expected Enable command");
        }
    }

    #[test]
    fn test_cli_parse_enable_short_flags() {
        let cli =
            Cli::try_parse_from(["factpod-gateway", "enable", "-u", "u", "-s", "pod"]).unwrap();
        assert!(matches!(cli.command, Commands::Enable { .. }));
    }

    #[test]
    fn test_cli_parse_enable_requires_site() {
        let cli = Cli::try_parse_from(["factpod-gateway", "enable", "--user-id", "u"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_verify_state_consume() {
        let cli = Cli::try_parse_from([
            "factpod-gateway",
            "verify-state",
            "--state",
            "abc",
            "--consume",
        ])
        .unwrap();

        if let Commands::VerifyState { state, consume } = cli.command {
            assert_eq!(state, "abc");
            assert!(consume);
        } else {
            panic!("Expected VerifyState command");
        }
    }

    #[test]
    fn test_cli_parse_show_connection() {
        let cli = Cli::try_parse_from([
            "factpod-gateway",
            "show-connection",
            "--user-id",
            "u",
            "--site",
            "pod",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::ShowConnection { .. }));
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "factpod-gateway",
            "-v",
            "--json-logs",
            "--config",
            "custom.yaml",
            "--storage-path",
            "/tmp/db",
            "verify-state",
            "--state",
            "s",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
        assert_eq!(cli.storage_path, Some("/tmp/db".to_string()));
    }

    #[test]
    fn test_cli_parse_missing_command() {
        let cli = Cli::try_parse_from(["factpod-gateway"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_invalid_command() {
        let cli = Cli::try_parse_from(["factpod-gateway", "chat"]);
        assert!(cli.is_err());
    }
}
