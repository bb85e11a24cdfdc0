//! Command-line interface module.

mod args;
pub mod backup;
pub mod serve;
pub mod update;

pub use args::{Cli, Commands};
