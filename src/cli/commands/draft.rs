//! `intake draft` command - inspect and seed saved drafts

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{print_structured, read_values_file, truncate_str, warn_unknown_keys};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::draft::{DraftKey, DraftStore};
use crate::core::values::FieldValue;
use crate::core::wizard::Wizard;
use crate::core::Config;
use crate::forms::{DefinitionVisitor, WizardKind};
use crate::schema::{FieldId, WizardDefinition};

#[derive(Subcommand, Debug)]
pub enum DraftCommands {
    /// Save a values file as the draft of a wizard
    Save(SaveArgs),

    /// Show the saved draft of a wizard
    Show(ShowArgs),

    /// List saved drafts
    List,
}

#[derive(clap::Args, Debug)]
pub struct SaveArgs {
    /// Wizard the values belong to
    #[arg(value_enum)]
    pub wizard: WizardKind,

    /// YAML or JSON file of field values keyed by field name
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Wizard whose draft to show
    #[arg(value_enum)]
    pub wizard: WizardKind,
}

pub fn run(cmd: DraftCommands, global: &GlobalOpts, config: &Config) -> Result<()> {
    match cmd {
        DraftCommands::Save(args) => {
            let wizard = args.wizard;
            wizard.with_definition(SaveDraft {
                file: args.file,
                global,
                config,
            })?
        }
        DraftCommands::Show(args) => args.wizard.with_definition(ShowDraft { global, config })?,
        DraftCommands::List => run_list(global, config),
    }
}

struct SaveDraft<'a> {
    file: PathBuf,
    global: &'a GlobalOpts,
    config: &'a Config,
}

impl DefinitionVisitor for SaveDraft<'_> {
    type Output = Result<()>;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Result<()> {
        let file = read_values_file::<F>(&self.file)?;
        warn_unknown_keys(&file.unknown, self.global.quiet);

        let count = file.values.len();
        let mut wizard = Wizard::new(definition, self.config.open_store()?);
        for (field, value) in file.values {
            wizard.set_value(field, value)?;
        }
        wizard.save_draft()?;

        if !self.global.quiet {
            println!(
                "{} Saved {} field(s) as {}",
                style("✓").green(),
                count,
                style(wizard.draft_key()).cyan()
            );
        }
        Ok(())
    }
}

struct ShowDraft<'a> {
    global: &'a GlobalOpts,
    config: &'a Config,
}

impl DefinitionVisitor for ShowDraft<'_> {
    type Output = Result<()>;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Result<()> {
        let store = self.config.open_store()?;
        let key = DraftKey::for_wizard(definition.id);
        let Some(draft) = store.load(&key)? else {
            return Err(miette::miette!(
                help = format!("Start one with 'intake new {}'", definition.id),
                "No draft saved for {}",
                definition.id
            ));
        };
        let (values, report) = draft.restore(definition.schema());

        if self.global.format != OutputFormat::Auto {
            let value = json!({
                "key": key.as_str(),
                "fingerprint": draft.fingerprint(),
                "values": serde_json::to_value(&draft).into_diagnostic()?,
                "unknown": report.unknown,
                "rejected": report.rejected,
            });
            return print_structured(&value, self.global.format);
        }

        println!(
            "{} {} ({} field(s))",
            style("◆").cyan(),
            style(&key).bold(),
            draft.len()
        );
        println!();

        let mut builder = Builder::default();
        builder.push_record(["Step", "Field", "Value"]);
        for step in definition.steps().iter() {
            for &field in &step.fields {
                let value = values.get(field);
                if draft.get(field.key()).is_none() || *value == FieldValue::Empty {
                    continue;
                }
                builder.push_record([
                    step.id.to_string(),
                    field.key().to_string(),
                    truncate_str(&value.display(), 48),
                ]);
            }
        }
        println!("{}", builder.build().with(Style::sharp()));

        for key in report.unknown.iter().chain(&report.rejected) {
            println!(
                "{} '{}' is no longer used by this wizard and will be dropped on resume",
                style("!").yellow(),
                key
            );
        }
        Ok(())
    }
}

fn run_list(global: &GlobalOpts, config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let drafts = store.list()?;

    if global.format != OutputFormat::Auto {
        let entries: Vec<_> = drafts
            .iter()
            .map(|d| {
                json!({
                    "key": d.key.as_str(),
                    "wizard": d.key.wizard_id(),
                    "fields": d.fields,
                    "fingerprint": d.fingerprint,
                    "updatedAt": d.updated_at.map(|t| t.to_rfc3339()),
                })
            })
            .collect();
        return print_structured(&json!(entries), global.format);
    }

    if drafts.is_empty() {
        if !global.quiet {
            println!("{}", style("No drafts saved").dim());
        }
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["Wizard", "Fields", "Updated", "Fingerprint"]);
    for draft in &drafts {
        let wizard = WizardKind::from_id(draft.key.wizard_id())
            .map(|k| k.to_string())
            .unwrap_or_else(|| draft.key.wizard_id().to_string());
        builder.push_record([
            wizard,
            draft.fields.to_string(),
            draft
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            draft.fingerprint.chars().take(12).collect(),
        ]);
    }
    println!("{}", builder.build().with(Style::sharp()));
    Ok(())
}
