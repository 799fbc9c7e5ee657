//! CLI definitions for Foldlens.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Foldlens CLI.
#[derive(Parser)]
#[command(name = "foldlens")]
#[command(about = "Mobile fold UX audit service")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/foldlens.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the API server in foreground (default)
    Serve {
        /// Bind host, overriding the config file
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the screenshot job worker
    Worker,

    /// Render one URL and print the audit report as JSON
    Audit {
        /// Page to audit
        #[arg(long)]
        url: String,

        /// Device profile key (defaults to iphone_15)
        #[arg(long)]
        device: Option<String>,

        /// Include the coverage heatmap in the report
        #[arg(long)]
        heatmap: bool,

        /// Audit leniently: overlay penalties only, no hard failures
        #[arg(long)]
        relaxed: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn audit_flags_parse() {
        let cli = Cli::parse_from([
            "foldlens",
            "audit",
            "--url",
            "https://example.com",
            "--device",
            "pixel_8",
            "--heatmap",
        ]);
        match cli.command {
            Some(Commands::Audit {
                url,
                device,
                heatmap,
                relaxed,
            }) => {
                assert_eq!(url, "https://example.com");
                assert_eq!(device.as_deref(), Some("pixel_8"));
                assert!(heatmap);
                assert!(!relaxed);
            }
            _ => panic!("expected audit subcommand"),
        }
    }

    #[test]
    fn serve_accepts_host_and_port_overrides() {
        let cli = Cli::parse_from(["foldlens", "serve", "--port", "9000"]);
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve subcommand"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["foldlens", "worker", "--config", "/tmp/other.toml"]);
        assert_eq!(cli.config, PathBuf::from("/tmp/other.toml"));
        assert!(matches!(cli.command, Some(Commands::Worker)));
    }
}
