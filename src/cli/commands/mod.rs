//! Command implementations

pub mod check;
pub mod completions;
pub mod config;
pub mod draft;
pub mod new;
pub mod steps;
pub mod submit;
