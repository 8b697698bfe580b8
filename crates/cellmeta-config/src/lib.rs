//! Configuration for the cellmeta attribute store and its hosts.
//!
//! Settings persist to disk as RON, missing fields fall back to defaults,
//! and the demo host can override them from the command line via clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, DemoConfig, RelocationConfig, WritePlacement, default_config_dir,
};
pub use error::ConfigError;
