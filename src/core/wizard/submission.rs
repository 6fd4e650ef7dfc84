//! Submission coordinator - whole-form validation, the busy guard and the
//! hand-off to a finalizer

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use ulid::Ulid;

use super::{SubmissionStatus, Wizard};
use crate::core::values::FormValues;
use crate::schema::FieldId;

/// Validated values of one finished wizard run
#[derive(Debug, Clone)]
pub struct Submission<F: FieldId> {
    pub id: Ulid,
    pub wizard: &'static str,
    pub submitted_at: DateTime<Utc>,
    /// Values of fields owned by active steps only
    pub values: FormValues<F>,
    groups: Vec<(&'static str, Vec<F>)>,
}

impl<F: FieldId> Submission<F> {
    /// Payload grouped by step id, skipping steps without fields
    pub fn to_json(&self) -> Value {
        let mut data = Map::new();
        for (step, fields) in &self.groups {
            if fields.is_empty() {
                continue;
            }
            let group: Map<String, Value> = fields
                .iter()
                .map(|f| (f.key().to_string(), self.values.get(*f).to_json()))
                .collect();
            data.insert(step.to_string(), Value::Object(group));
        }

        json!({
            "id": self.id.to_string(),
            "wizard": self.wizard,
            "submittedAt": self.submitted_at.to_rfc3339(),
            "data": data,
        })
    }

    /// Outbox file name, unique per submission
    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.wizard, self.id)
    }
}

/// Failure reported by a finalizer
#[derive(Debug, Error, Diagnostic)]
pub enum FinalizeError {
    #[error("{0}")]
    #[diagnostic(code(intake::finalize::rejected))]
    Rejected(String),

    #[error("Finalizer did not answer within {0:?}")]
    #[diagnostic(
        code(intake::finalize::timeout),
        help("Raise submit_timeout_secs in the config or try again")
    )]
    TimedOut(Duration),

    #[error("Could not write submission: {0}")]
    #[diagnostic(code(intake::finalize::io))]
    Io(#[from] std::io::Error),

    #[error("Could not encode submission: {0}")]
    #[diagnostic(code(intake::finalize::encode))]
    Encode(#[from] serde_json::Error),
}

/// Receives validated submissions (persistence, API call, ...)
#[async_trait]
pub trait Finalize<F: FieldId>: Send + Sync {
    async fn finalize(&self, submission: &Submission<F>) -> Result<(), FinalizeError>;
}

/// Writes each submission as a JSON file under an outbox directory
#[derive(Debug, Clone)]
pub struct OutboxFinalizer {
    dir: PathBuf,
}

impl OutboxFinalizer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl<F: FieldId> Finalize<F> for OutboxFinalizer {
    async fn finalize(&self, submission: &Submission<F>) -> Result<(), FinalizeError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(submission.file_name());
        let body = serde_json::to_string_pretty(&submission.to_json())?;
        tokio::fs::write(&path, body).await?;
        tracing::info!(path = %path.display(), "submission written to outbox");
        Ok(())
    }
}

/// Why a submission did not go through
#[derive(Debug, Error, Diagnostic)]
pub enum SubmissionError {
    #[error("A submission is already in progress")]
    #[diagnostic(code(intake::submit::busy))]
    Busy,

    #[error("This wizard has already been submitted")]
    #[diagnostic(code(intake::submit::already_submitted))]
    AlreadySubmitted,

    #[error("{} field(s) need attention before submitting", .errors.len())]
    #[diagnostic(
        code(intake::submit::incomplete),
        help("Fix the highlighted fields and submit again")
    )]
    Incomplete {
        /// Step the wizard moved to, if an active step owns an errored field
        step: Option<&'static str>,
        errors: BTreeMap<&'static str, String>,
    },

    #[error("No submission is in progress")]
    #[diagnostic(code(intake::submit::not_submitting))]
    NotSubmitting,

    #[error("Submission failed: {0}")]
    #[diagnostic(code(intake::submit::rejected))]
    Rejected(#[source] FinalizeError),
}

impl<F: FieldId> Wizard<F> {
    /// Validate every active step and enter the submitting state
    ///
    /// On validation failure the wizard moves to the first step holding an
    /// error and the status is left unchanged.
    pub fn begin_submit(&mut self) -> Result<Submission<F>, SubmissionError> {
        match self.state.status {
            SubmissionStatus::Submitting => return Err(SubmissionError::Busy),
            SubmissionStatus::Succeeded => return Err(SubmissionError::AlreadySubmitted),
            SubmissionStatus::Idle | SubmissionStatus::Failed => {}
        }

        let steps = self.definition.steps();
        let active = steps.active(&self.state.values);
        let fields = steps.fields_of(&active);
        let result = self.validator().validate(&fields, &self.state.values);

        if !result.is_valid() {
            let errors = result.to_string_map();
            let step = self
                .navigate_to_first_error(result)
                .and_then(|o| self.definition.step(o))
                .map(|s| s.id);
            tracing::info!(
                wizard = self.definition.id,
                step,
                errors = errors.len(),
                "submission blocked by validation"
            );
            return Err(SubmissionError::Incomplete { step, errors });
        }

        let groups = active
            .iter()
            .filter_map(|o| self.definition.step(*o))
            .map(|s| (s.id, s.fields.clone()))
            .collect();
        let submission = Submission {
            id: Ulid::new(),
            wizard: self.definition.id,
            submitted_at: Utc::now(),
            values: self.state.values.restricted_to(&fields),
            groups,
        };

        self.state.status = SubmissionStatus::Submitting;
        self.state.submission_error = None;
        tracing::info!(
            wizard = self.definition.id,
            id = %submission.id,
            "submission started"
        );
        Ok(submission)
    }

    /// Record the finalizer's outcome
    ///
    /// Success clears the stored draft; a failure keeps the values and the
    /// draft so the user can retry.
    pub fn complete_submit(
        &mut self,
        outcome: Result<(), FinalizeError>,
    ) -> Result<(), SubmissionError> {
        if self.state.status != SubmissionStatus::Submitting {
            return Err(SubmissionError::NotSubmitting);
        }

        match outcome {
            Ok(()) => {
                self.state.status = SubmissionStatus::Succeeded;
                if let Err(e) = self.store.clear(&self.draft_key) {
                    tracing::warn!(key = %self.draft_key, error = %e, "draft not cleared after submit");
                }
                tracing::info!(wizard = self.definition.id, "submission succeeded");
                Ok(())
            }
            Err(e) => {
                self.state.status = SubmissionStatus::Failed;
                self.state.submission_error = Some(e.to_string());
                tracing::warn!(wizard = self.definition.id, error = %e, "submission failed");
                Err(SubmissionError::Rejected(e))
            }
        }
    }

    /// Validate, finalize and record the outcome
    pub async fn submit(&mut self, finalizer: &dyn Finalize<F>) -> Result<(), SubmissionError> {
        let submission = self.begin_submit()?;
        let outcome = finalizer.finalize(&submission).await;
        self.complete_submit(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::draft::{DraftStore, MemoryDraftStore};
    use crate::core::wizard::WizardError;
    use crate::schema::{FieldSchema, FieldSpec, StepDefinition, StepTable, WizardDefinition};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    crate::field_registry! {
        enum Inst {
            Name => "institutionName",
            Kind => "institutionType",
            Phone => "phone",
            Beds => "bedCount",
        }
    }

    fn definition() -> WizardDefinition<Inst> {
        let schema = FieldSchema::new()
            .field(Inst::Name, FieldSpec::text("Institution Name").required())
            .field(
                Inst::Kind,
                FieldSpec::choice("Institution Type", &["hospital", "clinic"]).required(),
            )
            .field(Inst::Phone, FieldSpec::text("Phone").required())
            .field(Inst::Beds, FieldSpec::number("Bed Count"));
        let steps = StepTable::new(vec![
            StepDefinition::new("basic", "Basic", vec![Inst::Name, Inst::Kind]),
            StepDefinition::new("contact", "Contact", vec![Inst::Phone]),
            StepDefinition::new("capacity", "Capacity", vec![Inst::Beds])
                .include_if(vec![Inst::Kind], |v| v.equals(Inst::Kind, "hospital")),
            StepDefinition::review("review", "Review"),
        ]);
        WizardDefinition::new("institution-test", "Institution", schema, steps, vec![]).unwrap()
    }

    #[derive(Default)]
    struct Recording {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Finalize<Inst> for Recording {
        async fn finalize(&self, _submission: &Submission<Inst>) -> Result<(), FinalizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FinalizeError::Rejected("server unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn complete(w: &mut Wizard<Inst>) {
        w.set_value(Inst::Name, "Mercy General").unwrap();
        w.set_value(Inst::Kind, "clinic").unwrap();
        w.set_value(Inst::Phone, "(555) 123-4567").unwrap();
    }

    #[tokio::test]
    async fn test_submit_success_clears_draft() {
        let store = MemoryDraftStore::new();
        let mut w = Wizard::new(definition(), store.clone());
        complete(&mut w);
        w.save_draft().unwrap();

        let finalizer = Recording::default();
        w.submit(&finalizer).await.unwrap();

        assert_eq!(finalizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(w.status(), SubmissionStatus::Succeeded);
        assert!(store.load(w.draft_key()).unwrap().is_none());
        assert!(matches!(w.next(), Err(WizardError::Completed)));

        w.start_another().unwrap();
        assert_eq!(w.status(), SubmissionStatus::Idle);
        assert!(w.values().is_blank(Inst::Name));
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_values_and_draft() {
        let store = MemoryDraftStore::new();
        let mut w = Wizard::new(definition(), store.clone());
        complete(&mut w);
        w.save_draft().unwrap();

        let finalizer = Recording {
            fail: true,
            ..Default::default()
        };
        let err = w.submit(&finalizer).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected(_)));
        assert_eq!(w.status(), SubmissionStatus::Failed);
        assert_eq!(w.submission_error(), Some("server unavailable"));
        assert!(w.values().equals(Inst::Name, "Mercy General"));
        assert!(store.load(w.draft_key()).unwrap().is_some());

        // Retry is allowed after a failure
        w.submit(&Recording::default()).await.unwrap();
        assert_eq!(w.status(), SubmissionStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_incomplete_navigates_to_first_error() {
        let mut w = Wizard::new(definition(), MemoryDraftStore::new());
        w.set_value(Inst::Name, "Mercy General").unwrap();
        w.set_value(Inst::Kind, "clinic").unwrap();
        w.next().unwrap();

        let finalizer = Recording::default();
        let err = w.submit(&finalizer).await.unwrap_err();
        match err {
            SubmissionError::Incomplete { step, errors } => {
                assert_eq!(step, Some("contact"));
                assert!(errors.contains_key("phone"));
            }
            other => panic!("expected incomplete, got {:?}", other),
        }
        assert_eq!(finalizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(w.current_step().id, "contact");
        assert_eq!(w.focus(), Some(Inst::Phone));
        assert_eq!(w.status(), SubmissionStatus::Idle);
    }

    #[test]
    fn test_busy_guard() {
        let mut w = Wizard::new(definition(), MemoryDraftStore::new());
        complete(&mut w);

        let submission = w.begin_submit().unwrap();
        assert!(w.is_busy());
        assert!(matches!(w.begin_submit(), Err(SubmissionError::Busy)));
        assert!(matches!(w.set_value(Inst::Name, "x"), Err(WizardError::Busy)));
        assert!(matches!(w.back(), Err(WizardError::Busy)));
        assert!(matches!(w.cancel(), Err(WizardError::Busy)));
        assert_eq!(submission.wizard, "institution-test");

        w.complete_submit(Ok(())).unwrap();
        assert!(matches!(
            w.complete_submit(Ok(())),
            Err(SubmissionError::NotSubmitting)
        ));
    }

    #[test]
    fn test_submission_excludes_inactive_steps() {
        let mut w = Wizard::new(definition(), MemoryDraftStore::new());
        w.set_value(Inst::Kind, "hospital").unwrap();
        w.set_value(Inst::Beds, 120.0).unwrap();
        complete(&mut w);

        let submission = w.begin_submit().unwrap();
        assert!(!submission.values.contains(Inst::Beds));

        let payload = submission.to_json();
        assert_eq!(payload["wizard"], "institution-test");
        assert_eq!(payload["data"]["basic"]["institutionName"], "Mercy General");
        assert_eq!(payload["data"]["contact"]["phone"], "(555) 123-4567");
        assert!(payload["data"].get("capacity").is_none());
        assert!(payload["data"].get("review").is_none());
    }

    #[tokio::test]
    async fn test_outbox_finalizer_writes_file() {
        let tmp = tempdir().unwrap();
        let outbox = OutboxFinalizer::new(tmp.path().join("outbox"));
        let mut w = Wizard::new(definition(), MemoryDraftStore::new());
        complete(&mut w);

        let submission = w.begin_submit().unwrap();
        let outcome = outbox.finalize(&submission).await;
        w.complete_submit(outcome).unwrap();

        let path = outbox.dir().join(submission.file_name());
        let text = std::fs::read_to_string(path).unwrap();
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["id"], submission.id.to_string());
        assert_eq!(written["data"]["basic"]["institutionType"], "clinic");
    }
}
