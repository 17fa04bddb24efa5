//! CLI command modules.

pub mod config;
pub mod generate;
pub mod plan;
