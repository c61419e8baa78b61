//! Command line and environment configuration shared by both subgraph binaries

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::fixtures::Fixtures;
use crate::store::StoreError;

/// Default listen address of the course subgraph
pub const COURSE_LISTEN_ADDRESS: &str = "127.0.0.1:8081";

/// Default listen address of the review subgraph
pub const REVIEW_LISTEN_ADDRESS: &str = "127.0.0.1:8082";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogStyle {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Subgraph server options
#[derive(Debug, Clone, Parser)]
#[command(version)]
pub struct Args {
    /// Address the GraphQL endpoint listens on
    #[arg(short, long, env = "SUBGRAPH_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// JSON fixture file replacing the built-in data set
    #[arg(long, env = "SUBGRAPH_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Log filter directives, e.g. `info` or `course_federation=debug`
    #[arg(long = "log", env = "SUBGRAPH_LOG", default_value = "info")]
    pub log_filter: String,

    /// Style of log output
    #[arg(long, env = "SUBGRAPH_LOG_STYLE", value_enum, default_value_t = LogStyle::Text)]
    pub log_style: LogStyle,

    /// Print the subgraph's federation SDL and exit
    #[arg(long)]
    pub print_sdl: bool,
}

impl Args {
    /// Listen address, falling back to the binary's default
    pub fn listen_address_or(&self, default: SocketAddr) -> SocketAddr {
        self.listen_address.unwrap_or(default)
    }

    /// Fixture file if one was given, otherwise the built-in set
    pub fn load_fixtures(&self) -> Result<Fixtures, StoreError> {
        match &self.fixtures {
            Some(path) => Fixtures::from_path(path),
            None => Ok(Fixtures::builtin()),
        }
    }
}
