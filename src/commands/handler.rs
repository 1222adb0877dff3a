//! Command Handler
//!
//! Maps one decoded request frame to one reply.
//!
//! ## Supported Commands
//!
//! - `PING` - Replies `PONG`, arguments are ignored
//! - `ECHO message` - Replies with `message` as a simple string
//! - `SET key value [PX milliseconds]` - Stores a key, optionally with a TTL
//! - `GET key` - Returns the value, or a null bulk string if absent or expired
//! - `CONFIG GET dir|dbfilename` - Returns `[name, value]` from the server config
//!
//! A request that is a bare string rather than an array is acknowledged
//! with `+OK`.
//!
//! Every error is final for the connection that sent the request: the
//! caller logs it and closes the socket. No error reply is written.

use crate::config::Config;
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while interpreting a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command name is not one this server implements
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The request is not an array of strings
    #[error("invalid command format: {0}")]
    InvalidFormat(&'static str),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// A malformed argument, e.g. a non-numeric TTL
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for command execution.
pub type CommandResult = Result<RespValue, CommandError>;

/// Dispatches requests against the shared store and configuration.
///
/// Cheap to clone: every connection gets its own handle.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    config: Arc<Config>,
}

impl CommandHandler {
    /// Creates a new command handler.
    pub fn new(storage: Arc<StorageEngine>, config: Arc<Config>) -> Self {
        Self { storage, config }
    }

    /// Executes a request frame and returns the reply.
    pub fn execute(&self, frame: RespValue) -> CommandResult {
        let items = match frame {
            RespValue::Array(items) => items,
            RespValue::SimpleString(_) | RespValue::BulkString(_) => return Ok(RespValue::ok()),
            RespValue::Null => return Err(CommandError::InvalidFormat("null request")),
        };

        let mut args = Vec::with_capacity(items.len());
        for item in items {
            match item {
                RespValue::SimpleString(b) | RespValue::BulkString(b) => args.push(b),
                _ => return Err(CommandError::InvalidFormat("expected an array of strings")),
            }
        }

        let (name, args) = match args.split_first() {
            Some((name, rest)) => (String::from_utf8_lossy(name).to_uppercase(), rest),
            None => return Err(CommandError::InvalidFormat("empty command")),
        };

        self.dispatch(&name, args)
    }

    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> CommandResult {
        match cmd {
            "PING" => Ok(RespValue::pong()),
            "ECHO" => self.cmd_echo(args),
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "CONFIG" => self.cmd_config(args),
            _ => Err(CommandError::UnknownCommand(cmd.to_string())),
        }
    }

    /// ECHO message
    ///
    /// The reply is a simple string, so the message must not contain CR or LF.
    fn cmd_echo(&self, args: &[Bytes]) -> CommandResult {
        let message = args.first().ok_or(CommandError::WrongArity("echo"))?;
        if message.iter().any(|&b| b == b'\r' || b == b'\n') {
            return Err(CommandError::InvalidArgument(
                "ECHO message must not contain CR or LF".to_string(),
            ));
        }
        Ok(RespValue::simple_string(message.clone()))
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[Bytes]) -> CommandResult {
        let (key, value) = match args {
            [key, value, ..] => (key.clone(), value.clone()),
            _ => return Err(CommandError::WrongArity("set")),
        };

        let ttl = match &args[2..] {
            [] => None,
            [option, millis] if option.eq_ignore_ascii_case(b"PX") => {
                Some(Duration::from_millis(parse_millis(millis)?))
            }
            _ => return Err(CommandError::InvalidArgument("syntax error".to_string())),
        };

        self.storage.set(key, value, ttl);
        Ok(RespValue::ok())
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> CommandResult {
        let key = args.first().ok_or(CommandError::WrongArity("get"))?;
        Ok(match self.storage.get(key) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        })
    }

    /// CONFIG GET parameter
    fn cmd_config(&self, args: &[Bytes]) -> CommandResult {
        let (subcommand, parameter) = match args {
            [subcommand, parameter, ..] => (subcommand, parameter),
            _ => return Err(CommandError::WrongArity("config")),
        };

        if !subcommand.eq_ignore_ascii_case(b"GET") {
            return Err(CommandError::UnknownCommand(format!(
                "CONFIG {}",
                String::from_utf8_lossy(subcommand)
            )));
        }

        let (name, value) = if parameter.eq_ignore_ascii_case(b"dir") {
            ("dir", &self.config.dir)
        } else if parameter.eq_ignore_ascii_case(b"dbfilename") {
            ("dbfilename", &self.config.dbfilename)
        } else {
            return Ok(RespValue::array(vec![]));
        };

        Ok(RespValue::array(vec![
            RespValue::bulk_string(Bytes::from_static(name.as_bytes())),
            RespValue::bulk_string(Bytes::from(value.clone())),
        ]))
    }
}

fn parse_millis(raw: &[u8]) -> Result<u64, CommandError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "PX expects a non-negative integer, got {:?}",
                String::from_utf8_lossy(raw)
            ))
        })
}
