//! `intake check` command - validate a values file without submitting it

use chrono::NaiveDate;
use console::style;
use miette::Result;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::helpers::{print_errors, print_structured, read_values_file, warn_unknown_keys};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::forms::{DefinitionVisitor, WizardKind};
use crate::schema::{FieldId, WizardDefinition};

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Wizard the values belong to
    #[arg(value_enum)]
    pub wizard: WizardKind,

    /// YAML or JSON file of field values keyed by field name
    pub file: PathBuf,

    /// Only validate this step (by step id)
    #[arg(long, short = 's')]
    pub step: Option<String>,

    /// Date that ages and expiry dates are measured against (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let wizard = args.wizard;
    wizard.with_definition(Check { args, global })?
}

struct Check<'a> {
    args: CheckArgs,
    global: &'a GlobalOpts,
}

impl DefinitionVisitor for Check<'_> {
    type Output = Result<()>;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Result<()> {
        let Check { args, global } = self;
        let file = read_values_file::<F>(&args.file)?;
        warn_unknown_keys(&file.unknown, global.quiet);

        let mut values = definition.defaults();
        for (field, value) in file.values {
            values.set(field, value);
        }

        let steps = definition.steps();
        let active = steps.active(&values);
        let fields = match &args.step {
            Some(id) => {
                let step = steps.by_id(id).ok_or_else(|| {
                    let known: Vec<&str> = steps.iter().map(|s| s.id).collect();
                    miette::miette!(
                        help = format!("Steps of {}: {}", definition.id, known.join(", ")),
                        "Unknown step '{}'",
                        id
                    )
                })?;
                if !active.contains(&step.ordinal) {
                    return Err(miette::miette!(
                        "Step '{}' is not part of this {} with these values",
                        id,
                        definition.title
                    ));
                }
                step.fields.clone()
            }
            None => steps.fields_of(&active),
        };

        let mut validator = definition.validator();
        if let Some(date) = args.as_of {
            validator = validator.with_reference_date(date);
        }
        let result = validator.validate(&fields, &values);
        tracing::debug!(
            wizard = definition.id,
            fields = fields.len(),
            errors = result.len(),
            "checked values file"
        );

        match global.format {
            OutputFormat::Auto => {
                if result.is_valid() {
                    if !global.quiet {
                        println!(
                            "{} {} is valid for {}",
                            style("✓").green(),
                            style(args.file.display()).cyan(),
                            definition.title
                        );
                    }
                } else {
                    eprintln!(
                        "{} {} field(s) need attention",
                        style("✗").red(),
                        result.len()
                    );
                    print_errors(&definition, &result);
                }
            }
            format => {
                let active_ids: Vec<&str> = active
                    .iter()
                    .filter_map(|o| definition.step(*o))
                    .map(|s| s.id)
                    .collect();
                print_structured(
                    &json!({
                        "valid": result.is_valid(),
                        "errors": result.to_string_map(),
                        "activeSteps": active_ids,
                    }),
                    format,
                )?;
            }
        }

        if result.is_valid() {
            Ok(())
        } else {
            Err(miette::miette!(
                "Validation failed: {} error(s)",
                result.len()
            ))
        }
    }
}
