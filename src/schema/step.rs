//! Step definition table
//!
//! Steps are ordered by ordinal. A step may carry an `include_if` predicate
//! over the values entered so far; the active sequence is the list of steps
//! whose predicate currently holds.

use std::fmt;
use std::sync::Arc;

use crate::core::values::FormValues;
use crate::schema::rule::Predicate;
use crate::schema::FieldId;

/// One step of a wizard
#[derive(Clone)]
pub struct StepDefinition<F: FieldId> {
    pub id: &'static str,
    pub title: &'static str,
    pub ordinal: usize,
    pub fields: Vec<F>,
    /// Fields read by `include_if`; edits to them recompute the active sequence
    pub depends_on: Vec<F>,
    /// Pure review step with no fields of its own
    pub review: bool,
    include_if: Option<Predicate<F>>,
}

impl<F: FieldId> fmt::Debug for StepDefinition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("ordinal", &self.ordinal)
            .field("fields", &self.fields)
            .field("conditional", &self.include_if.is_some())
            .finish()
    }
}

impl<F: FieldId> StepDefinition<F> {
    /// A step owning the given fields; the ordinal is assigned by [`StepTable::new`]
    pub fn new(id: &'static str, title: &'static str, fields: Vec<F>) -> Self {
        Self {
            id,
            title,
            ordinal: 0,
            fields,
            depends_on: Vec::new(),
            review: false,
            include_if: None,
        }
    }

    /// A review step: shows everything, owns nothing
    pub fn review(id: &'static str, title: &'static str) -> Self {
        Self {
            review: true,
            ..Self::new(id, title, Vec::new())
        }
    }

    /// Include this step only while `predicate` holds
    pub fn include_if(
        mut self,
        depends_on: Vec<F>,
        predicate: impl Fn(&FormValues<F>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.depends_on = depends_on;
        self.include_if = Some(Arc::new(predicate));
        self
    }

    pub fn is_conditional(&self) -> bool {
        self.include_if.is_some()
    }

    pub fn is_included(&self, values: &FormValues<F>) -> bool {
        self.include_if.as_ref().map_or(true, |p| p(values))
    }

    pub fn owns(&self, field: F) -> bool {
        self.fields.contains(&field)
    }
}

/// Ordered list of steps
#[derive(Debug, Clone)]
pub struct StepTable<F: FieldId> {
    steps: Vec<StepDefinition<F>>,
}

impl<F: FieldId> StepTable<F> {
    /// Build a table in declaration order, numbering ordinals from 0
    pub fn new(steps: Vec<StepDefinition<F>>) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(ordinal, step)| StepDefinition { ordinal, ..step })
            .collect();
        Self { steps }
    }

    /// Build a table keeping the ordinals already set on each step
    pub fn with_ordinals(mut steps: Vec<StepDefinition<F>>) -> Self {
        steps.sort_by_key(|s| s.ordinal);
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition<F>> {
        self.steps.iter()
    }

    pub fn get(&self, ordinal: usize) -> Option<&StepDefinition<F>> {
        self.steps.get(ordinal).filter(|s| s.ordinal == ordinal)
    }

    pub fn by_id(&self, id: &str) -> Option<&StepDefinition<F>> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Ordinals of the steps included for these values
    pub fn active(&self, values: &FormValues<F>) -> Vec<usize> {
        self.steps
            .iter()
            .filter(|s| s.is_included(values))
            .map(|s| s.ordinal)
            .collect()
    }

    /// The step that owns a field, if any
    pub fn owner_of(&self, field: F) -> Option<&StepDefinition<F>> {
        self.steps.iter().find(|s| s.owns(field))
    }

    /// Every field read by an `include_if` predicate
    pub fn dependencies(&self) -> Vec<F> {
        let mut deps: Vec<F> = self
            .steps
            .iter()
            .flat_map(|s| s.depends_on.iter().copied())
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Owned fields of the given steps, in step then declaration order
    pub fn fields_of(&self, ordinals: &[usize]) -> Vec<F> {
        ordinals
            .iter()
            .filter_map(|o| self.get(*o))
            .flat_map(|s| s.fields.iter().copied())
            .collect()
    }
}
