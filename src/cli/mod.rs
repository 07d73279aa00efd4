use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcription-api",
    about = "YouTube Transcription API - serve YouTube transcripts over HTTP",
    version,
    long_about = "An HTTP service that fetches YouTube transcripts, optionally through a rotating residential proxy, and returns them segmented, flattened, filtered or translated."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "TRANSCRIPTION_API_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve {
        /// Address to bind (overrides HOST)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,

        /// Development mode: debug logging, restarts left to an external file watcher
        #[arg(long)]
        development: bool,
    },

    /// Inspect the effective configuration
    Config {
        /// Show current configuration with secrets masked
        #[arg(short, long)]
        show: bool,
    },
}

impl Commands {
    /// Command used when none is given on the command line
    pub fn default_serve() -> Self {
        Commands::Serve {
            host: None,
            port: None,
            development: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_accepted() {
        let cli = Cli::try_parse_from(["transcription-api"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "transcription-api",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--development",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                development,
            }) => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
                assert!(development);
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["transcription-api", "serve", "--port", "99999"]).is_err());
    }
}
