//! Wizard controller - step navigation over a wizard definition
//!
//! The controller owns the current step, the form values and the submission
//! status of one wizard run. It validates only the current step before moving
//! forward, never validates when moving back, and recomputes which steps are
//! active whenever a value read by an `include_if` predicate changes.
//!
//! Validation failures are returned as data ([`Navigation::Blocked`]); only
//! misuse (navigating while busy, past the last step, ...) is an error.

pub mod submission;

use chrono::NaiveDate;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::core::draft::{Draft, DraftError, DraftKey, DraftStore, RestoreReport};
use crate::core::values::{FieldValue, FormValues};
use crate::schema::{
    FieldId, FieldKind, StepDefinition, ValidationResult, Validator, WizardDefinition,
};

pub use submission::{Finalize, FinalizeError, OutboxFinalizer, Submission, SubmissionError};

/// Lifecycle of the final submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Idle => write!(f, "idle"),
            SubmissionStatus::Submitting => write!(f, "submitting"),
            SubmissionStatus::Succeeded => write!(f, "succeeded"),
            SubmissionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Direction of the last navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Outcome of a navigation request
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation<F: FieldId> {
    Moved { from: usize, to: usize },
    /// Validation failed on `step`; nothing moved
    Blocked {
        step: usize,
        errors: ValidationResult<F>,
        focus: Option<F>,
    },
}

impl<F: FieldId> Navigation<F> {
    pub fn moved(&self) -> bool {
        matches!(self, Navigation::Moved { .. })
    }
}

/// Misuse of the controller
#[derive(Debug, Error, Diagnostic)]
pub enum WizardError {
    #[error("A submission is in progress")]
    #[diagnostic(
        code(intake::wizard::busy),
        help("Wait for the current submission to finish")
    )]
    Busy,

    #[error("This wizard has already been submitted")]
    #[diagnostic(
        code(intake::wizard::completed),
        help("Use 'start another' to begin a new entry")
    )]
    Completed,

    #[error("'{step}' is the last step")]
    #[diagnostic(code(intake::wizard::no_next_step), help("Submit the wizard instead"))]
    NoNextStep { step: &'static str },

    #[error("'{step}' is the first step")]
    #[diagnostic(code(intake::wizard::no_previous_step))]
    NoPreviousStep { step: &'static str },

    #[error("Unknown step: {0}")]
    #[diagnostic(code(intake::wizard::unknown_step))]
    UnknownStep(String),

    #[error("Step '{0}' is not part of the active sequence")]
    #[diagnostic(code(intake::wizard::inactive_step))]
    InactiveStep(&'static str),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Draft(#[from] DraftError),
}

/// Mutable state of one wizard run
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState<F: FieldId> {
    pub current: usize,
    pub values: FormValues<F>,
    pub status: SubmissionStatus,
    pub last_errors: ValidationResult<F>,
    pub submission_error: Option<String>,
}

impl<F: FieldId> WizardState<F> {
    fn fresh(values: FormValues<F>) -> Self {
        Self {
            current: 0,
            values,
            status: SubmissionStatus::Idle,
            last_errors: ValidationResult::success(),
            submission_error: None,
        }
    }
}

/// Everything a view needs to render one field
#[derive(Debug, Clone)]
pub struct FieldView<'w, F: FieldId> {
    pub field: F,
    pub label: &'static str,
    pub kind: &'w FieldKind,
    pub required: bool,
    pub help: Option<&'static str>,
    pub value: &'w FieldValue,
    pub error: Option<&'w str>,
}

/// A running wizard
pub struct Wizard<F: FieldId> {
    definition: WizardDefinition<F>,
    store: Box<dyn DraftStore>,
    draft_key: DraftKey,
    state: WizardState<F>,
    heading: Option<Direction>,
    focus: Option<F>,
    reference_date: Option<NaiveDate>,
    restored: Option<RestoreReport>,
}

impl<F: FieldId> Wizard<F> {
    /// Start a fresh run from schema defaults
    pub fn new(definition: WizardDefinition<F>, store: impl DraftStore + 'static) -> Self {
        let draft_key = DraftKey::for_wizard(definition.id);
        let state = WizardState::fresh(definition.defaults());
        Self {
            definition,
            store: Box::new(store),
            draft_key,
            state,
            heading: None,
            focus: None,
            reference_date: None,
            restored: None,
        }
    }

    /// Start a run from the stored draft for this wizard type, if any
    ///
    /// A missing or unreadable draft never blocks the wizard: it starts from
    /// defaults instead.
    pub fn resume(definition: WizardDefinition<F>, store: impl DraftStore + 'static) -> Self {
        let mut wizard = Self::new(definition, store);

        match wizard.store.load(&wizard.draft_key) {
            Ok(Some(draft)) => {
                let (values, report) = draft.restore(wizard.definition.schema());
                tracing::info!(
                    wizard = wizard.definition.id,
                    restored = report.restored,
                    unknown = report.unknown.len(),
                    rejected = report.rejected.len(),
                    "resumed draft"
                );
                wizard.state.values = values;
                wizard.restored = Some(report);
            }
            Ok(None) => {
                tracing::debug!(wizard = wizard.definition.id, "no draft to resume");
            }
            Err(e) => {
                tracing::warn!(
                    wizard = wizard.definition.id,
                    error = %e,
                    "draft could not be loaded, starting from defaults"
                );
            }
        }

        wizard
    }

    /// Pin the date used by age and expiry rules
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn definition(&self) -> &WizardDefinition<F> {
        &self.definition
    }

    pub fn state(&self) -> &WizardState<F> {
        &self.state
    }

    pub fn values(&self) -> &FormValues<F> {
        &self.state.values
    }

    pub fn status(&self) -> SubmissionStatus {
        self.state.status
    }

    pub fn is_busy(&self) -> bool {
        self.state.status == SubmissionStatus::Submitting
    }

    pub fn errors(&self) -> &ValidationResult<F> {
        &self.state.last_errors
    }

    pub fn error_for(&self, field: F) -> Option<&str> {
        self.state.last_errors.get(field)
    }

    /// Field the view should bring into focus after a failed validation
    pub fn focus(&self) -> Option<F> {
        self.focus
    }

    pub fn submission_error(&self) -> Option<&str> {
        self.state.submission_error.as_deref()
    }

    pub fn draft_key(&self) -> &DraftKey {
        &self.draft_key
    }

    /// Report of the draft restored at construction, if one was
    pub fn restored(&self) -> Option<&RestoreReport> {
        self.restored.as_ref()
    }

    pub fn current_ordinal(&self) -> usize {
        self.state.current
    }

    pub fn current_step(&self) -> &StepDefinition<F> {
        // current always indexes a step of the definition
        self.definition
            .step(self.state.current)
            .unwrap_or_else(|| unreachable!("current step out of range"))
    }

    /// Active steps; the displayed step stays listed until the user leaves it
    pub fn active_sequence(&self) -> Vec<usize> {
        let mut active = self.definition.steps().active(&self.state.values);
        if !active.contains(&self.state.current) {
            active.push(self.state.current);
            active.sort_unstable();
        }
        active
    }

    /// 1-based position of the current step and the number of active steps
    pub fn progress(&self) -> (usize, usize) {
        let active = self.active_sequence();
        let position = active
            .iter()
            .position(|o| *o == self.state.current)
            .unwrap_or(0);
        (position + 1, active.len())
    }

    pub fn is_first(&self) -> bool {
        self.previous_active().is_none()
    }

    pub fn is_last(&self) -> bool {
        self.next_active().is_none()
    }

    pub fn field_view(&self, field: F) -> Option<FieldView<'_, F>> {
        let spec = self.definition.schema().get(field)?;
        Some(FieldView {
            field,
            label: spec.label,
            kind: &spec.kind,
            required: spec.required,
            help: spec.help,
            value: self.state.values.get(field),
            error: self.state.last_errors.get(field),
        })
    }

    fn validator(&self) -> Validator<'_, F> {
        let validator = self.definition.validator();
        match self.reference_date {
            Some(date) => validator.with_reference_date(date),
            None => validator,
        }
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        match self.state.status {
            SubmissionStatus::Submitting => Err(WizardError::Busy),
            SubmissionStatus::Succeeded => Err(WizardError::Completed),
            SubmissionStatus::Idle | SubmissionStatus::Failed => Ok(()),
        }
    }

    fn next_active(&self) -> Option<usize> {
        let current = self.state.current;
        self.definition
            .steps()
            .active(&self.state.values)
            .into_iter()
            .find(|o| *o > current)
    }

    fn previous_active(&self) -> Option<usize> {
        let current = self.state.current;
        self.definition
            .steps()
            .active(&self.state.values)
            .into_iter()
            .rev()
            .find(|o| *o < current)
    }

    fn move_to(&mut self, to: usize, direction: Direction) -> Navigation<F> {
        let from = self.state.current;
        self.state.current = to;
        self.state.last_errors = ValidationResult::success();
        self.focus = None;
        self.heading = Some(direction);
        tracing::debug!(
            wizard = self.definition.id,
            from = self.definition.step(from).map(|s| s.id),
            to = self.definition.step(to).map(|s| s.id),
            ?direction,
            "step changed"
        );
        Navigation::Moved { from, to }
    }

    /// Set a field value
    ///
    /// Editing a field read by an `include_if` predicate recomputes the active
    /// sequence. If that edit deactivates the displayed step and the user has
    /// been navigating, the wizard moves to the nearest active step in the
    /// direction of travel; otherwise the step stays displayed until the next
    /// `next()` or `back()`.
    pub fn set_value(&mut self, field: F, value: impl Into<FieldValue>) -> Result<(), WizardError> {
        self.ensure_idle()?;

        let affects_steps = self.definition.steps().dependencies().contains(&field);
        let was_active = self
            .definition
            .steps()
            .active(&self.state.values)
            .contains(&self.state.current);

        self.state.values.set(field, value);

        if !affects_steps {
            return Ok(());
        }

        let active = self.definition.steps().active(&self.state.values);
        if was_active && !active.contains(&self.state.current) {
            if let Some(direction) = self.heading {
                self.relocate(&active, direction);
            } else {
                tracing::debug!(
                    wizard = self.definition.id,
                    step = self.current_step().id,
                    "displayed step became inactive; keeping it until the next navigation"
                );
            }
        }
        Ok(())
    }

    pub fn clear_value(&mut self, field: F) -> Result<(), WizardError> {
        self.set_value(field, FieldValue::Empty)
    }

    fn relocate(&mut self, active: &[usize], direction: Direction) {
        let current = self.state.current;
        let forward = active.iter().copied().find(|o| *o > current);
        let backward = active.iter().rev().copied().find(|o| *o < current);

        let forward = forward.map(|o| (o, Direction::Forward));
        let backward = backward.map(|o| (o, Direction::Backward));
        let target = match direction {
            Direction::Forward => forward.or(backward),
            Direction::Backward => backward.or(forward),
        };

        if let Some((to, direction)) = target {
            self.move_to(to, direction);
        }
    }

    /// Validate the fields owned by the current step
    ///
    /// On failure the errors are kept for display and the first errored field
    /// (in step declaration order) becomes the focus.
    pub fn validate_current_step(&mut self) -> bool {
        let fields = self.current_step().fields.clone();
        let result = self.validator().validate(&fields, &self.state.values);
        self.focus = result.first_in(&fields);
        let valid = result.is_valid();
        self.state.last_errors = result;
        valid
    }

    /// Re-check a single field, e.g. when it loses focus
    pub fn revalidate_field(&mut self, field: F) -> Option<String> {
        let message = self.validator().validate_field(field, &self.state.values);
        match &message {
            Some(m) => self.state.last_errors.insert(field, m.clone()),
            None => {
                self.state.last_errors.remove(field);
            }
        }
        message
    }

    /// Validate the current step and advance to the next active step
    pub fn next(&mut self) -> Result<Navigation<F>, WizardError> {
        self.ensure_idle()?;

        let current = self.state.current;
        let displayed_active = self
            .definition
            .steps()
            .active(&self.state.values)
            .contains(&current);

        // A step that dropped out of the sequence no longer gates progress
        if displayed_active && !self.validate_current_step() {
            tracing::debug!(
                wizard = self.definition.id,
                step = self.current_step().id,
                errors = self.state.last_errors.len(),
                "step validation failed"
            );
            return Ok(Navigation::Blocked {
                step: current,
                errors: self.state.last_errors.clone(),
                focus: self.focus,
            });
        }

        match self.next_active() {
            Some(to) => Ok(self.move_to(to, Direction::Forward)),
            None => Err(WizardError::NoNextStep {
                step: self.current_step().id,
            }),
        }
    }

    /// Return to the previous active step without validating
    pub fn back(&mut self) -> Result<Navigation<F>, WizardError> {
        self.ensure_idle()?;

        match self.previous_active() {
            Some(to) => Ok(self.move_to(to, Direction::Backward)),
            None => Err(WizardError::NoPreviousStep {
                step: self.current_step().id,
            }),
        }
    }

    /// Jump to a step by id
    ///
    /// Moving forward validates the current step and every active step before
    /// the target; if any fails, nothing changes and the failure is returned.
    /// Moving backward never validates.
    pub fn jump_to(&mut self, step_id: &str) -> Result<Navigation<F>, WizardError> {
        self.ensure_idle()?;

        let target = self
            .definition
            .steps()
            .by_id(step_id)
            .ok_or_else(|| WizardError::UnknownStep(step_id.to_string()))?;
        let (to, target_id) = (target.ordinal, target.id);

        let active = self.definition.steps().active(&self.state.values);
        if !active.contains(&to) {
            return Err(WizardError::InactiveStep(target_id));
        }

        let current = self.state.current;
        if to == current {
            return Ok(Navigation::Moved { from: current, to });
        }
        if to < current {
            return Ok(self.move_to(to, Direction::Backward));
        }

        let validator = self.validator();
        for ordinal in active.iter().copied().filter(|o| *o >= current && *o < to) {
            let Some(step) = self.definition.step(ordinal) else {
                continue;
            };
            let errors = validator.validate(&step.fields, &self.state.values);
            if !errors.is_valid() {
                let focus = errors.first_in(&step.fields);
                return Ok(Navigation::Blocked {
                    step: ordinal,
                    errors,
                    focus,
                });
            }
        }

        Ok(self.move_to(to, Direction::Forward))
    }

    /// Move to the earliest active step holding one of the errors, show the
    /// errors there and focus the first errored field of that step
    ///
    /// Returns the ordinal navigated to, or `None` if no active step owns any
    /// errored field.
    pub fn navigate_to_first_error(&mut self, errors: ValidationResult<F>) -> Option<usize> {
        let target = self.active_sequence().into_iter().find(|o| {
            self.definition
                .step(*o)
                .is_some_and(|s| s.fields.iter().any(|f| errors.contains(*f)))
        });

        if let Some(to) = target {
            if to != self.state.current {
                let direction = if to < self.state.current {
                    Direction::Backward
                } else {
                    Direction::Forward
                };
                self.move_to(to, direction);
            }
            self.focus = self
                .definition
                .step(to)
                .and_then(|s| errors.first_in(&s.fields));
        }

        self.state.last_errors = errors;
        target
    }

    /// Persist the current values as this wizard type's draft
    pub fn save_draft(&self) -> Result<(), WizardError> {
        if self.state.status == SubmissionStatus::Succeeded {
            return Err(WizardError::Completed);
        }
        let draft = Draft::from_values(&self.state.values);
        self.store.save(&self.draft_key, &draft)?;
        tracing::info!(
            wizard = self.definition.id,
            key = %self.draft_key,
            fields = draft.len(),
            "draft saved"
        );
        Ok(())
    }

    /// Abandon this run: back to defaults on the first step
    ///
    /// The stored draft is left alone; it is only removed by a successful
    /// submission.
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        if self.is_busy() {
            return Err(WizardError::Busy);
        }
        tracing::debug!(wizard = self.definition.id, "wizard cancelled");
        self.reset();
        Ok(())
    }

    /// Begin a new entry after a successful submission
    pub fn start_another(&mut self) -> Result<(), WizardError> {
        if self.is_busy() {
            return Err(WizardError::Busy);
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.state = WizardState::fresh(self.definition.defaults());
        self.heading = None;
        self.focus = None;
        self.restored = None;
    }
}
