//! Wizard definition - field schema, step table and refinements bundled
//! together and checked once at construction

use miette::Diagnostic;
use std::collections::HashSet;
use thiserror::Error;

use crate::core::values::FormValues;
use crate::schema::field::FieldSchema;
use crate::schema::rule::CrossFieldRule;
use crate::schema::step::{StepDefinition, StepTable};
use crate::schema::validator::Validator;
use crate::schema::FieldId;

/// Inconsistencies found while assembling a wizard definition
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Wizard '{wizard}' has no steps")]
    #[diagnostic(code(intake::definition::no_steps))]
    NoSteps { wizard: &'static str },

    #[error("Wizard '{wizard}': step ordinals must be contiguous from 0 (expected {expected}, found {found})")]
    #[diagnostic(code(intake::definition::ordinals))]
    NonContiguousOrdinals {
        wizard: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Wizard '{wizard}': duplicate step id '{step}'")]
    #[diagnostic(code(intake::definition::duplicate_step))]
    DuplicateStepId { wizard: &'static str, step: &'static str },

    #[error("Wizard '{wizard}': step '{step}' owns '{field}', which has no schema entry")]
    #[diagnostic(
        code(intake::definition::unknown_field),
        help("Declare the field in the wizard's FieldSchema")
    )]
    UnknownField {
        wizard: &'static str,
        step: &'static str,
        field: &'static str,
    },

    #[error("Wizard '{wizard}': field '{field}' is owned by both '{first}' and '{second}'")]
    #[diagnostic(code(intake::definition::field_owned_twice))]
    FieldOwnedTwice {
        wizard: &'static str,
        field: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("Wizard '{wizard}': the first step '{step}' cannot be conditional")]
    #[diagnostic(code(intake::definition::conditional_first_step))]
    ConditionalFirstStep { wizard: &'static str, step: &'static str },

    #[error("Wizard '{wizard}': rule '{rule}' refers to '{field}', which has no schema entry")]
    #[diagnostic(code(intake::definition::unknown_rule_field))]
    UnknownRuleField {
        wizard: &'static str,
        rule: &'static str,
        field: &'static str,
    },
}

/// Everything that describes one wizard type
#[derive(Debug, Clone)]
pub struct WizardDefinition<F: FieldId> {
    pub id: &'static str,
    pub title: &'static str,
    schema: FieldSchema<F>,
    steps: StepTable<F>,
    rules: Vec<CrossFieldRule<F>>,
}

impl<F: FieldId> WizardDefinition<F> {
    /// Assemble a definition, checking the step table against the schema
    pub fn new(
        id: &'static str,
        title: &'static str,
        schema: FieldSchema<F>,
        steps: StepTable<F>,
        rules: Vec<CrossFieldRule<F>>,
    ) -> Result<Self, DefinitionError> {
        let definition = Self {
            id,
            title,
            schema,
            steps,
            rules,
        };
        definition.check()?;

        let orphans = definition.orphaned_fields();
        if !orphans.is_empty() {
            tracing::debug!(
                wizard = id,
                orphans = ?orphans.iter().map(|f| f.key()).collect::<Vec<_>>(),
                "schema fields not owned by any step"
            );
        }

        Ok(definition)
    }

    fn check(&self) -> Result<(), DefinitionError> {
        let wizard = self.id;

        let Some(first) = self.steps.iter().next() else {
            return Err(DefinitionError::NoSteps { wizard });
        };
        if first.is_conditional() {
            return Err(DefinitionError::ConditionalFirstStep {
                wizard,
                step: first.id,
            });
        }

        let mut step_ids = HashSet::new();
        let mut owners: Vec<(F, &'static str)> = Vec::new();

        for (expected, step) in self.steps.iter().enumerate() {
            if step.ordinal != expected {
                return Err(DefinitionError::NonContiguousOrdinals {
                    wizard,
                    expected,
                    found: step.ordinal,
                });
            }
            if !step_ids.insert(step.id) {
                return Err(DefinitionError::DuplicateStepId {
                    wizard,
                    step: step.id,
                });
            }
            for &field in &step.fields {
                if !self.schema.contains(field) {
                    return Err(DefinitionError::UnknownField {
                        wizard,
                        step: step.id,
                        field: field.key(),
                    });
                }
                if let Some((_, owner)) = owners.iter().find(|(f, _)| *f == field) {
                    return Err(DefinitionError::FieldOwnedTwice {
                        wizard,
                        field: field.key(),
                        first: *owner,
                        second: step.id,
                    });
                }
                owners.push((field, step.id));
            }
        }

        for rule in &self.rules {
            let referenced = rule.triggers.iter().chain(std::iter::once(&rule.attach_to));
            for &field in referenced {
                if !self.schema.contains(field) {
                    return Err(DefinitionError::UnknownRuleField {
                        wizard,
                        rule: rule.name,
                        field: field.key(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn schema(&self) -> &FieldSchema<F> {
        &self.schema
    }

    pub fn steps(&self) -> &StepTable<F> {
        &self.steps
    }

    pub fn rules(&self) -> &[CrossFieldRule<F>] {
        &self.rules
    }

    pub fn step(&self, ordinal: usize) -> Option<&StepDefinition<F>> {
        self.steps.get(ordinal)
    }

    pub fn validator(&self) -> Validator<'_, F> {
        Validator::new(&self.schema, &self.rules)
    }

    pub fn defaults(&self) -> FormValues<F> {
        self.schema.defaults()
    }

    /// Schema fields no step owns
    pub fn orphaned_fields(&self) -> Vec<F> {
        self.schema
            .iter()
            .map(|(f, _)| f)
            .filter(|f| self.steps.owner_of(*f).is_none())
            .collect()
    }

    /// Owned fields of every currently active step
    pub fn active_fields(&self, values: &FormValues<F>) -> Vec<F> {
        self.steps.fields_of(&self.steps.active(values))
    }
}
