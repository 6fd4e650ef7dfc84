//! `intake submit` command - validate a values file and submit it

use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::cli::helpers::{print_errors, print_structured, read_values_file, warn_unknown_keys};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::wizard::{
    Finalize, FinalizeError, OutboxFinalizer, Submission, SubmissionError, Wizard,
};
use crate::core::Config;
use crate::forms::{DefinitionVisitor, WizardKind};
use crate::schema::{FieldId, WizardDefinition};

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Wizard the values belong to
    #[arg(value_enum)]
    pub wizard: WizardKind,

    /// YAML or JSON file of field values keyed by field name
    pub file: PathBuf,

    /// Keep the values as a draft when the submission fails
    #[arg(long)]
    pub keep_draft: bool,
}

pub fn run(args: SubmitArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let wizard = args.wizard;
    wizard.with_definition(SubmitFile {
        args,
        global,
        config,
    })?
}

/// Runtime for the finalizer; the CLI is otherwise synchronous
pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()
}

/// Submit the wizard's values to the outbox, bounded by the configured timeout
pub fn finalize<F: FieldId>(
    wizard: &mut Wizard<F>,
    config: &Config,
    runtime: &Runtime,
) -> std::result::Result<Submission<F>, SubmissionError> {
    let submission = wizard.begin_submit()?;
    let finalizer = OutboxFinalizer::new(config.outbox_dir());
    let timeout = config.submit_timeout();

    let outcome = runtime.block_on(async {
        match tokio::time::timeout(timeout, finalizer.finalize(&submission)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FinalizeError::TimedOut(timeout)),
        }
    });
    wizard.complete_submit(outcome)?;
    Ok(submission)
}

struct SubmitFile<'a> {
    args: SubmitArgs,
    global: &'a GlobalOpts,
    config: &'a Config,
}

impl DefinitionVisitor for SubmitFile<'_> {
    type Output = Result<()>;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Result<()> {
        let SubmitFile {
            args,
            global,
            config,
        } = self;
        let file = read_values_file::<F>(&args.file)?;
        warn_unknown_keys(&file.unknown, global.quiet);

        let runtime = runtime()?;
        let mut wizard = Wizard::new(definition, config.open_store()?);
        for (field, value) in file.values {
            wizard.set_value(field, value)?;
        }

        let submission = match finalize(&mut wizard, config, &runtime) {
            Ok(submission) => submission,
            Err(SubmissionError::Incomplete { step, errors }) => {
                eprintln!(
                    "{} {} field(s) need attention{}",
                    style("✗").red(),
                    errors.len(),
                    step.map(|s| format!(" (first in step '{}')", s))
                        .unwrap_or_default()
                );
                print_errors(wizard.definition(), wizard.errors());
                return Err(SubmissionError::Incomplete { step, errors }.into());
            }
            Err(e) => {
                if args.keep_draft {
                    wizard.save_draft()?;
                    eprintln!(
                        "{} Values kept as draft {}; resume with 'intake new {} --resume'",
                        style("!").yellow(),
                        style(wizard.draft_key()).cyan(),
                        args.wizard
                    );
                }
                return Err(e.into());
            }
        };

        let path = config.outbox_dir().join(submission.file_name());
        match global.format {
            OutputFormat::Auto => {
                if global.quiet {
                    println!("{}", path.display());
                } else {
                    println!(
                        "{} Submitted {} {}",
                        style("✓").green(),
                        style(submission.wizard).cyan(),
                        style(submission.id).dim()
                    );
                    println!("  {}", path.display());
                }
            }
            format => {
                let mut value = submission.to_json();
                value["path"] = json!(path.display().to_string());
                print_structured(&value, format)?;
            }
        }
        Ok(())
    }
}
