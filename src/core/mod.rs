//! Core types shared across the components.

mod shutdown;

pub use shutdown::Shutdown;
