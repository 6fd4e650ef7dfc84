//! CLI module - argument parsing, prompts and command dispatch

pub mod args;
pub mod commands;
pub mod helpers;
pub mod prompt;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};
