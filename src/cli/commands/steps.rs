//! `intake steps` command - describe a wizard's steps and fields

use console::style;
use miette::Result;
use serde_json::{json, Value};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{print_structured, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::forms::{DefinitionVisitor, WizardKind};
use crate::schema::{FieldId, StepDefinition, WizardDefinition};

#[derive(clap::Args, Debug)]
pub struct StepsArgs {
    /// Wizard to describe
    #[arg(value_enum)]
    pub wizard: WizardKind,

    /// Also list the cross-field rules
    #[arg(long, short = 'r')]
    pub rules: bool,
}

pub fn run(args: StepsArgs, global: &GlobalOpts) -> Result<()> {
    args.wizard.with_definition(Describe {
        rules: args.rules,
        format: global.format,
    })?
}

struct Describe {
    rules: bool,
    format: OutputFormat,
}

impl DefinitionVisitor for Describe {
    type Output = Result<()>;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Result<()> {
        match self.format {
            OutputFormat::Auto => {
                print_table(&definition, self.rules);
                Ok(())
            }
            format => print_structured(&describe(&definition), format),
        }
    }
}

fn condition<F: FieldId>(step: &StepDefinition<F>) -> String {
    if !step.is_conditional() {
        return String::new();
    }
    let keys: Vec<&str> = step.depends_on.iter().map(|f| f.key()).collect();
    format!("depends on {}", keys.join(", "))
}

fn print_table<F: FieldId>(definition: &WizardDefinition<F>, rules: bool) {
    println!(
        "{} {} ({})",
        style("◆").cyan(),
        style(definition.title).bold(),
        style(definition.id).dim()
    );
    println!();

    let mut builder = Builder::default();
    builder.push_record(["#", "Step", "Field", "Label", "Type", "Req", "Condition"]);

    for step in definition.steps().iter() {
        let number = (step.ordinal + 1).to_string();
        let condition = condition(step);
        if step.fields.is_empty() {
            builder.push_record([
                number.as_str(),
                step.id,
                "-",
                step.title,
                "review",
                "",
                condition.as_str(),
            ]);
            continue;
        }
        for (i, &field) in step.fields.iter().enumerate() {
            let Some(spec) = definition.schema().get(field) else {
                continue;
            };
            let (number, step_id, condition) = if i == 0 {
                (number.as_str(), step.id, condition.as_str())
            } else {
                ("", "", "")
            };
            let label = truncate_str(spec.label, 36);
            builder.push_record([
                number,
                step_id,
                field.key(),
                label.as_str(),
                spec.kind.type_name(),
                if spec.required { "yes" } else { "" },
                condition,
            ]);
        }
    }
    println!("{}", builder.build().with(Style::sharp()));

    if rules && !definition.rules().is_empty() {
        println!();
        println!("{}", style("Cross-field rules").bold());
        let mut builder = Builder::default();
        builder.push_record(["Rule", "Reads", "Reports on", "Message"]);
        for rule in definition.rules() {
            let reads: Vec<&str> = rule.triggers.iter().map(|f| f.key()).collect();
            builder.push_record([
                rule.name.to_string(),
                reads.join(", "),
                rule.attach_to.key().to_string(),
                truncate_str(&rule.message, 48),
            ]);
        }
        println!("{}", builder.build().with(Style::sharp()));
    }
}

/// Structured description used by `--format json|yaml`
pub fn describe<F: FieldId>(definition: &WizardDefinition<F>) -> Value {
    let steps: Vec<Value> = definition
        .steps()
        .iter()
        .map(|step| {
            let fields: Vec<Value> = step
                .fields
                .iter()
                .filter_map(|&field| {
                    let spec = definition.schema().get(field)?;
                    Some(json!({
                        "key": field.key(),
                        "label": spec.label,
                        "type": spec.kind.type_name(),
                        "required": spec.required,
                        "options": spec.kind.options(),
                        "default": spec.default.to_json(),
                        "help": spec.help,
                    }))
                })
                .collect();
            let depends_on: Vec<&str> = step.depends_on.iter().map(|f| f.key()).collect();
            json!({
                "id": step.id,
                "title": step.title,
                "ordinal": step.ordinal,
                "conditional": step.is_conditional(),
                "dependsOn": depends_on,
                "review": step.review,
                "fields": fields,
            })
        })
        .collect();

    let rules: Vec<Value> = definition
        .rules()
        .iter()
        .map(|rule| {
            let triggers: Vec<&str> = rule.triggers.iter().map(|f| f.key()).collect();
            json!({
                "name": rule.name,
                "triggers": triggers,
                "attachTo": rule.attach_to.key(),
                "message": rule.message,
            })
        })
        .collect();

    json!({
        "id": definition.id,
        "title": definition.title,
        "steps": steps,
        "rules": rules,
    })
}
