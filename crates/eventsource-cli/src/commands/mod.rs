//! Command implementations for eventsource-cli

pub mod config;
pub mod listen;

pub use listen::listen;
