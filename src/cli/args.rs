//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    check::CheckArgs, completions::CompletionsArgs, config::ConfigCommands, draft::DraftCommands,
    new::NewArgs, steps::StepsArgs, submit::SubmitArgs,
};

#[derive(Parser)]
#[command(name = "intake")]
#[command(author, version, about = "Medical transport intake wizards")]
#[command(long_about = "Step-by-step data entry for patients, institutions, trips and employees, with resumable drafts and validated submissions.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill in a wizard interactively
    New(NewArgs),

    /// Show the steps and fields of a wizard
    Steps(StepsArgs),

    /// Validate a values file without submitting it
    Check(CheckArgs),

    /// Validate a values file and submit it to the outbox
    Submit(SubmitArgs),

    /// Draft management
    #[command(subcommand)]
    Draft(DraftCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and messages
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// YAML format
    Yaml,
}
