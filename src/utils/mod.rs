//! Shared helpers.

pub mod date;
pub mod exec;
pub mod mime;
pub mod path;
pub mod plural;
