//! Subcommand implementations

pub mod model;
pub mod score;
pub mod train;
