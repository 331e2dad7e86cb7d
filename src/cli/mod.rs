//! Command-line interface for prospekt.

mod commands;
pub mod progress;

pub use commands::{is_verbose, run, Cli};
