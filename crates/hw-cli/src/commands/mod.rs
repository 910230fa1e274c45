//! CLI subcommand implementations.

pub mod heatmap;
pub mod homework;
pub mod import;
pub mod plan;
pub mod status;
mod util;
