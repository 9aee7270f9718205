//! Server configuration, parsed from the command line.

use clap::Parser;

/// Host the listener binds to (all interfaces).
pub const BIND_HOST: &str = "0.0.0.0";

/// QuillKV server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "quillkv")]
#[command(about = "In-memory key-value server speaking a subset of RESP")]
#[command(version)]
pub struct Config {
    /// Port to listen on
    #[arg(long, default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", BIND_HOST, self.port)
    }
}
