//! Startup error types with miette diagnostics.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

use sma_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const BIND: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error("Configuration is invalid")]
    #[diagnostic(
        code(sma_bridge::config),
        help(
            "Check {path} and any SMA_BRIDGE_* environment variables.\n\
             Nested keys use a double underscore, e.g. SMA_BRIDGE_BACKEND__HOST."
        )
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(sma_bridge::bind),
        help("Another process may own the port. Pick a different one with --listen.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server stopped unexpectedly")]
    #[diagnostic(code(sma_bridge::serve))]
    Serve(#[source] std::io::Error),
}

impl BridgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => exit_code::CONFIG,
            Self::Bind { .. } => exit_code::BIND,
            Self::Serve(_) => exit_code::GENERAL,
        }
    }
}
