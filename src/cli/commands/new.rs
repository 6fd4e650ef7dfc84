//! `intake new` command - fill in a wizard interactively

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::submit::{finalize, runtime};
use crate::cli::helpers::print_errors;
use crate::cli::prompt::Prompter;
use crate::cli::GlobalOpts;
use crate::core::wizard::{Navigation, SubmissionError, Wizard};
use crate::core::Config;
use crate::forms::{DefinitionVisitor, WizardKind};
use crate::schema::{FieldId, WizardDefinition};

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Wizard to run
    #[arg(value_enum)]
    pub wizard: WizardKind,

    /// Continue from the saved draft
    #[arg(long)]
    pub resume: bool,
}

pub fn run(args: NewArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    args.wizard.with_definition(Interactive {
        resume: args.resume,
        global,
        config,
    })?
}

struct Interactive<'a> {
    resume: bool,
    global: &'a GlobalOpts,
    config: &'a Config,
}

impl DefinitionVisitor for Interactive<'_> {
    type Output = Result<()>;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Result<()> {
        let store = self.config.open_store()?;
        let wizard = if self.resume {
            Wizard::resume(definition, store)
        } else {
            Wizard::new(definition, store)
        };

        Session {
            wizard,
            prompter: Prompter::new(),
            theme: ColorfulTheme::default(),
            global: self.global,
            config: self.config,
        }
        .run()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Next,
    Submit,
    Back,
    Edit,
    SaveDraft,
    Cancel,
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::Next => "Next",
            Action::Submit => "Submit",
            Action::Back => "Back",
            Action::Edit => "Edit this step",
            Action::SaveDraft => "Save draft",
            Action::Cancel => "Cancel",
        }
    }
}

struct Session<'a, F: FieldId> {
    wizard: Wizard<F>,
    prompter: Prompter,
    theme: ColorfulTheme,
    global: &'a GlobalOpts,
    config: &'a Config,
}

impl<F: FieldId> Session<'_, F> {
    fn run(mut self) -> Result<()> {
        println!();
        println!(
            "{} {}",
            style("◆").cyan(),
            style(self.wizard.definition().title).bold()
        );
        if let Some(report) = self.wizard.restored() {
            println!(
                "{} Resumed draft ({} field(s))",
                style("✓").green(),
                report.restored
            );
            for key in &report.rejected {
                println!(
                    "{} Draft value for '{}' no longer fits and was dropped",
                    style("!").yellow(),
                    key
                );
            }
        }

        loop {
            self.render_step()?;
            if self.choose_action()? {
                return Ok(());
            }
        }
    }

    fn render_step(&mut self) -> Result<()> {
        let (ordinal, title, review, fields) = {
            let step = self.wizard.current_step();
            (step.ordinal, step.title, step.review, step.fields.clone())
        };
        let (position, total) = self.wizard.progress();

        println!();
        println!(
            "{} Step {}/{}: {}",
            style("◆").cyan(),
            position,
            total,
            style(title).bold()
        );
        println!("{}", style("─".repeat(50)).dim());

        if review {
            self.print_review();
            return Ok(());
        }

        for field in fields {
            self.fill_field(field)?;
            if self.wizard.current_ordinal() != ordinal {
                break;
            }
        }
        Ok(())
    }

    fn fill_field(&mut self, field: F) -> Result<()> {
        let Some(view) = self.wizard.field_view(field) else {
            return Ok(());
        };
        let value = self.prompter.prompt_field(&view)?;
        self.wizard.set_value(field, value)?;
        if let Some(message) = self.wizard.revalidate_field(field) {
            println!("  {} {}", style("!").yellow(), style(message).yellow());
        }
        Ok(())
    }

    fn print_review(&self) {
        let definition = self.wizard.definition();
        for ordinal in self.wizard.active_sequence() {
            let Some(step) = definition.step(ordinal) else {
                continue;
            };
            if step.fields.is_empty() {
                continue;
            }
            println!("{}", style(step.title).underlined());
            for &field in &step.fields {
                let Some(view) = self.wizard.field_view(field) else {
                    continue;
                };
                let shown = view.value.display();
                if shown.is_empty() {
                    println!("  {}: {}", view.label, style("-").dim());
                } else {
                    println!("  {}: {}", view.label, shown);
                }
            }
        }
    }

    fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.wizard.is_last() {
            actions.push(Action::Submit);
        } else {
            actions.push(Action::Next);
        }
        if !self.wizard.is_first() {
            actions.push(Action::Back);
        }
        if !self.wizard.current_step().review {
            actions.push(Action::Edit);
        }
        actions.push(Action::SaveDraft);
        actions.push(Action::Cancel);
        actions
    }

    /// Returns true once the session is over
    fn choose_action(&mut self) -> Result<bool> {
        loop {
            let actions = self.actions();
            let labels: Vec<&str> = actions.iter().map(Action::label).collect();
            let selection = Select::with_theme(&self.theme)
                .with_prompt("What next?")
                .items(&labels)
                .default(0)
                .interact()
                .into_diagnostic()?;

            match actions[selection] {
                Action::Next => match self.wizard.next()? {
                    Navigation::Moved { .. } => return Ok(false),
                    Navigation::Blocked { errors, .. } => {
                        println!(
                            "{} {} field(s) need attention",
                            style("✗").red(),
                            errors.len()
                        );
                        let fields = self.wizard.current_step().fields.clone();
                        for field in fields.into_iter().filter(|f| errors.contains(*f)) {
                            self.fill_field(field)?;
                        }
                    }
                },
                Action::Back => {
                    self.wizard.back()?;
                    return Ok(false);
                }
                Action::Edit => return Ok(false),
                Action::SaveDraft => {
                    self.wizard.save_draft()?;
                    println!(
                        "{} Draft saved as {}",
                        style("✓").green(),
                        style(self.wizard.draft_key()).cyan()
                    );
                }
                Action::Submit => return self.submit(),
                Action::Cancel => {
                    let confirmed = Confirm::with_theme(&self.theme)
                        .with_prompt("Discard this entry? A saved draft is kept")
                        .default(false)
                        .interact()
                        .into_diagnostic()?;
                    if confirmed {
                        self.wizard.cancel()?;
                        println!("{} Cancelled", style("•").dim());
                        return Ok(true);
                    }
                }
            }
        }
    }

    fn submit(&mut self) -> Result<bool> {
        let runtime = runtime()?;
        match finalize(&mut self.wizard, self.config, &runtime) {
            Ok(submission) => {
                println!(
                    "{} Submitted {} ({})",
                    style("✓").green(),
                    style(submission.wizard).cyan(),
                    style(submission.id).dim()
                );
                if !self.global.quiet {
                    println!("  Written to {}", self.config.outbox_dir().display());
                }
                Ok(true)
            }
            Err(SubmissionError::Incomplete { .. }) => {
                println!("{} Some fields need attention", style("✗").red());
                print_errors(self.wizard.definition(), self.wizard.errors());
                Ok(false)
            }
            Err(e) => {
                println!("{} {}", style("✗").red(), e);
                println!("  Your entries are kept; submit again to retry.");
                Ok(false)
            }
        }
    }
}
