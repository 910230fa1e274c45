//! Client home/work analytics CLI library.
//!
//! This crate provides the `hw` command-line interface over the inference
//! core and the local event store.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, HeatmapArgs, ImportKind, WindowArgs};
pub use config::Config;
