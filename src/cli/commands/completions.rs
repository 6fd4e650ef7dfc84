//! `intake completions` command - shell completion scripts
//!
//! Completes subcommands, wizard names and flags for any shell clap_complete
//! supports. Typical setup is one line in the shell's startup file:
//!
//! ```bash
//! source <(intake completions bash)     # ~/.bashrc
//! source <(intake completions zsh)      # ~/.zshrc
//! intake completions fish > ~/.config/fish/completions/intake.fish
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::Result;
use std::io::{self, Write};

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to write the completion script for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    write_script(args.shell, &mut io::stdout());
    Ok(())
}

fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin, out);
}
