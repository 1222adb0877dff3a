//! Server configuration
//!
//! Parsed once from the command line and shared read-only afterwards.
//! `dir` and `dbfilename` locate the snapshot loaded at startup and are
//! reported back to clients by `CONFIG GET`.

use std::path::PathBuf;
use thiserror::Error;

/// Immutable server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the snapshot file
    pub dir: String,
    /// Snapshot file name inside `dir`
    pub dbfilename: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            dir: "/tmp/redis-files".to_string(),
            dbfilename: "dump.rdb".to_string(),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Run(Config),
    Help,
    Version,
}

/// Errors in command-line arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

impl Config {
    /// Parses arguments, excluding the program name.
    pub fn parse_args<I>(args: I) -> Result<CliAction, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value_for = |flag: &str| {
                args.next()
                    .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
            };

            match arg.as_str() {
                "--host" | "-h" => config.host = value_for(&arg)?,
                "--port" | "-p" => {
                    let raw = value_for(&arg)?;
                    config.port = raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?;
                }
                "--dir" => config.dir = value_for(&arg)?,
                "--dbfilename" => config.dbfilename = value_for(&arg)?,
                "--help" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(CliAction::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }
}
