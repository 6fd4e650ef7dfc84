//! The concrete intake wizards

pub mod employee;
pub mod institution;
pub mod patient;
pub mod trip;

use clap::ValueEnum;
use std::fmt;

use crate::schema::{DefinitionError, FieldId, WizardDefinition};

pub use employee::EmployeeField;
pub use institution::InstitutionField;
pub use patient::PatientField;
pub use trip::TripField;

/// Wizard types available from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WizardKind {
    Patient,
    Institution,
    Trip,
    Employee,
}

/// Operation run against a wizard definition whatever its field type
pub trait DefinitionVisitor {
    type Output;

    fn visit<F: FieldId>(self, definition: WizardDefinition<F>) -> Self::Output;
}

impl WizardKind {
    pub const ALL: [WizardKind; 4] = [
        WizardKind::Patient,
        WizardKind::Institution,
        WizardKind::Trip,
        WizardKind::Employee,
    ];

    /// Stable wizard id, also the draft slot name
    pub fn id(&self) -> &'static str {
        match self {
            WizardKind::Patient => patient::ID,
            WizardKind::Institution => institution::ID,
            WizardKind::Trip => trip::ID,
            WizardKind::Employee => employee::ID,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Build this kind's definition and hand it to `visitor`
    pub fn with_definition<V: DefinitionVisitor>(
        self,
        visitor: V,
    ) -> Result<V::Output, DefinitionError> {
        Ok(match self {
            WizardKind::Patient => visitor.visit(patient::definition()?),
            WizardKind::Institution => visitor.visit(institution::definition()?),
            WizardKind::Trip => visitor.visit(trip::definition()?),
            WizardKind::Employee => visitor.visit(employee::definition()?),
        })
    }
}

impl fmt::Display for WizardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
