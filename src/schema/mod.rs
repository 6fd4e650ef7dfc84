//! Schema system - field registry, steps, refinements and validation

pub mod definition;
pub mod field;
pub mod rule;
pub mod step;
pub mod validator;

pub use definition::{DefinitionError, WizardDefinition};
pub use field::{FieldId, FieldKind, FieldRule, FieldSchema, FieldSpec, Format};
pub use rule::{CrossFieldRule, Predicate};
pub use step::{StepDefinition, StepTable};
pub use validator::{ValidationResult, Validator};
