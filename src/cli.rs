//! Command-line interface definitions
//!
//! Defines all CLI commands and arguments using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// granary - single-node LSM key-value store
#[derive(Parser, Debug)]
#[command(name = "granary")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the key-value server
    Serve {
        /// Directory for SSTable folders (default: granary_data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Port for client connections (default: 6379)
        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Memtable flush threshold (distinct keys)
        #[arg(long)]
        memtable_max: Option<usize>,

        /// Configuration file (TOML); flags given here win over it
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Client commands (set, get, del)
    Client {
        /// Server address (host:port)
        #[arg(long, short = 'a', default_value = "127.0.0.1:6379")]
        addr: String,

        #[command(subcommand)]
        command: ClientCommand,
    },
}

/// Client subcommands
#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Set a key to a value
    Set {
        /// Key to store
        key: String,

        /// Value to store
        value: String,
    },

    /// Get a value by key
    Get {
        /// Key to retrieve
        key: String,
    },

    /// Delete a key
    Del {
        /// Key to delete
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_command() {
        let cli = Cli::parse_from([
            "granary",
            "serve",
            "--data-dir",
            "/data/granary",
            "--port",
            "7000",
        ]);

        match cli.command {
            Commands::Serve {
                data_dir,
                port,
                memtable_max,
                config,
            } => {
                assert_eq!(data_dir, Some(PathBuf::from("/data/granary")));
                assert_eq!(port, Some(7000));
                assert!(memtable_max.is_none());
                assert!(config.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_parse_client_set() {
        let cli = Cli::parse_from(["granary", "client", "set", "user:1", "alice"]);

        match cli.command {
            Commands::Client { command, .. } => match command {
                ClientCommand::Set { key, value } => {
                    assert_eq!(key, "user:1");
                    assert_eq!(value, "alice");
                }
                _ => panic!("Expected Set command"),
            },
            _ => panic!("Expected Client command"),
        }
    }

    #[test]
    fn test_parse_client_get_with_addr() {
        let cli = Cli::parse_from([
            "granary",
            "client",
            "--addr",
            "192.168.1.1:6379",
            "get",
            "my.key",
        ]);

        match cli.command {
            Commands::Client { addr, command } => {
                assert_eq!(addr, "192.168.1.1:6379");
                match command {
                    ClientCommand::Get { key } => assert_eq!(key, "my.key"),
                    _ => panic!("Expected Get command"),
                }
            }
            _ => panic!("Expected Client command"),
        }
    }

    #[test]
    fn test_serve_flags_default_to_unset() {
        let cli = Cli::parse_from(["granary", "serve"]);

        match cli.command {
            Commands::Serve { data_dir, port, .. } => {
                assert!(data_dir.is_none());
                assert!(port.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }
}
