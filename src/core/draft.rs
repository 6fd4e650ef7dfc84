//! Draft persistence - resumable snapshots of in-progress form values
//!
//! One draft slot exists per wizard type. Drafts are written only on explicit
//! user request and cleared only after a successful submission.
//!
//! The serialized form is a string-keyed JSON object with sorted keys, so the
//! same values always produce byte-identical drafts.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::core::values::{FieldValue, FormValues};
use crate::schema::{FieldId, FieldSchema};

/// Current schema version of the SQLite draft table
const SCHEMA_VERSION: i32 = 1;

/// Errors raised by draft stores
#[derive(Debug, Error, Diagnostic)]
pub enum DraftError {
    #[error("Draft IO error: {0}")]
    #[diagnostic(code(intake::draft::io))]
    Io(#[from] std::io::Error),

    #[error("Draft database error: {0}")]
    #[diagnostic(code(intake::draft::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("Draft '{key}' could not be read: {message}")]
    #[diagnostic(
        code(intake::draft::corrupt),
        help("The wizard will start from defaults; save a new draft to replace it")
    )]
    Corrupt { key: String, message: String },

    #[error("Failed to serialize draft: {0}")]
    #[diagnostic(code(intake::draft::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("Draft store is unavailable (a previous writer panicked)")]
    #[diagnostic(code(intake::draft::poisoned))]
    Poisoned,
}

/// Storage key of a draft slot; one per wizard type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DraftKey(String);

impl DraftKey {
    pub fn for_wizard(wizard_id: &str) -> Self {
        Self(format!("draft:{}", wizard_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wizard id the key belongs to
    pub fn wizard_id(&self) -> &str {
        self.0.strip_prefix("draft:").unwrap_or(&self.0)
    }

    /// File-system safe name
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0.replace(':', "-"))
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let wizard = stem.strip_prefix("draft-")?;
        Some(Self::for_wizard(wizard))
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A serialized snapshot of form values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    values: BTreeMap<String, serde_json::Value>,
}

/// What happened to each entry of a draft while restoring it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    /// Keys the schema does not know; dropped
    pub unknown: Vec<String>,
    /// Keys whose value does not fit the field; the field keeps its default
    pub rejected: Vec<String>,
}

impl Draft {
    pub fn from_values<F: FieldId>(values: &FormValues<F>) -> Self {
        Self {
            values: values.to_json_map(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Canonical JSON text
    pub fn to_json(&self) -> Result<String, DraftError> {
        Ok(serde_json::to_string(&self.values)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DraftError> {
        Ok(serde_json::to_string_pretty(&self.values)?)
    }

    pub fn from_json(key: &DraftKey, text: &str) -> Result<Self, DraftError> {
        serde_json::from_str(text).map_err(|e| DraftError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// SHA-256 of the canonical JSON text
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(&self.values).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Rebuild form values: schema defaults first, then every draft entry
    /// that names a known field and fits its kind
    ///
    /// The result is built completely before it is handed back, so a caller
    /// never observes a half-restored set of values.
    pub fn restore<F: FieldId>(&self, schema: &FieldSchema<F>) -> (FormValues<F>, RestoreReport) {
        let mut values = schema.defaults();
        let mut report = RestoreReport::default();

        for (key, raw) in &self.values {
            let Some((field, spec)) = F::from_key(key).and_then(|f| schema.get(f).map(|s| (f, s)))
            else {
                tracing::debug!(key = %key, "ignoring unknown draft key");
                report.unknown.push(key.clone());
                continue;
            };

            match FieldValue::from_json(raw.clone()) {
                Ok(value) if value.is_blank() || spec.kind.accepts(&value) => {
                    values.set(field, value);
                    report.restored += 1;
                }
                Ok(_) | Err(_) => {
                    tracing::warn!(key = %key, "draft value does not fit field, keeping default");
                    report.rejected.push(key.clone());
                }
            }
        }

        (values, report)
    }
}

/// Listing entry for a stored draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSummary {
    pub key: DraftKey,
    pub fields: usize,
    pub fingerprint: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DraftSummary {
    /// Summarize stored draft text; unreadable drafts are logged and skipped
    /// so one bad slot never hides the others
    fn read(key: DraftKey, text: &str, updated_at: Option<DateTime<Utc>>) -> Option<Self> {
        match Draft::from_json(&key, text) {
            Ok(draft) => Some(Self {
                fields: draft.len(),
                fingerprint: draft.fingerprint(),
                key,
                updated_at,
            }),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping unreadable draft");
                None
            }
        }
    }
}

/// Key-value store for drafts, injected into each wizard
///
/// Concurrent writers to the same key follow last-write-wins.
pub trait DraftStore: Send {
    fn save(&self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError>;

    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError>;

    /// Remove a draft; removing a missing draft is not an error
    fn clear(&self, key: &DraftKey) -> Result<(), DraftError>;

    fn list(&self) -> Result<Vec<DraftSummary>, DraftError>;
}

impl<S: DraftStore + ?Sized> DraftStore for Box<S> {
    fn save(&self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError> {
        (**self).save(key, draft)
    }

    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError> {
        (**self).load(key)
    }

    fn clear(&self, key: &DraftKey) -> Result<(), DraftError> {
        (**self).clear(key)
    }

    fn list(&self) -> Result<Vec<DraftSummary>, DraftError> {
        (**self).list()
    }
}

/// In-process store; clones share the same slots
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    slots: Arc<Mutex<HashMap<DraftKey, (String, DateTime<Utc>)>>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored text, for inspecting what a save produced
    pub fn raw(&self, key: &DraftKey) -> Option<String> {
        self.slots
            .lock()
            .ok()
            .and_then(|slots| slots.get(key).map(|(text, _)| text.clone()))
    }

    /// Store arbitrary text under a key, e.g. to simulate a corrupt draft
    pub fn put_raw(&self, key: &DraftKey, text: impl Into<String>) -> Result<(), DraftError> {
        let mut slots = self.slots.lock().map_err(|_| DraftError::Poisoned)?;
        slots.insert(key.clone(), (text.into(), Utc::now()));
        Ok(())
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError> {
        self.put_raw(key, draft.to_json()?)
    }

    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError> {
        let slots = self.slots.lock().map_err(|_| DraftError::Poisoned)?;
        slots
            .get(key)
            .map(|(text, _)| Draft::from_json(key, text))
            .transpose()
    }

    fn clear(&self, key: &DraftKey) -> Result<(), DraftError> {
        let mut slots = self.slots.lock().map_err(|_| DraftError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }

    fn list(&self) -> Result<Vec<DraftSummary>, DraftError> {
        let slots = self.slots.lock().map_err(|_| DraftError::Poisoned)?;
        let mut summaries: Vec<_> = slots
            .iter()
            .filter_map(|(key, (text, updated))| {
                DraftSummary::read(key.clone(), text, Some(*updated))
            })
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }
}

/// One JSON file per draft slot in a directory
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &DraftKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), draft.to_json_pretty()?)?;
        Ok(())
    }

    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Draft::from_json(key, &text).map(Some)
    }

    fn clear(&self, key: &DraftKey) -> Result<(), DraftError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<DraftSummary>, DraftError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(key) = DraftKey::from_file_name(&name) else {
                continue;
            };
            let text = fs::read_to_string(entry.path())?;
            let updated_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            summaries.extend(DraftSummary::read(key, &text, updated_at));
        }
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }
}

/// SQLite-backed store, one row per draft slot
pub struct SqliteDraftStore {
    conn: Connection,
}

impl SqliteDraftStore {
    /// Open (or create) the draft database at `path`
    pub fn open(path: &Path) -> Result<Self, DraftError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DraftError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DraftError> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), DraftError> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS drafts (
                    key TEXT PRIMARY KEY,
                    body TEXT NOT NULL,
                    fingerprint TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                "#,
            )?;
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }
}

impl DraftStore for SqliteDraftStore {
    fn save(&self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError> {
        self.conn.execute(
            r#"
            INSERT INTO drafts (key, body, fingerprint, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                fingerprint = excluded.fingerprint,
                updated_at = excluded.updated_at
            "#,
            params![
                key.as_str(),
                draft.to_json()?,
                draft.fingerprint(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM drafts WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|text| Draft::from_json(key, &text)).transpose()
    }

    fn clear(&self, key: &DraftKey) -> Result<(), DraftError> {
        self.conn
            .execute("DELETE FROM drafts WHERE key = ?1", params![key.as_str()])?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<DraftSummary>, DraftError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, body, updated_at FROM drafts ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (key, body, updated) = row?;
            let updated_at = DateTime::parse_from_rfc3339(&updated)
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
            summaries.extend(DraftSummary::read(DraftKey(key), &body, updated_at));
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::values::AttachmentRef;
    use crate::schema::FieldSpec;
    use tempfile::tempdir;

    crate::field_registry! {
        enum Pt {
            FirstName => "firstName",
            Oxygen => "oxygenRequired",
            Weight => "weight",
            Documents => "documents",
        }
    }

    fn schema() -> FieldSchema<Pt> {
        FieldSchema::new()
            .field(Pt::FirstName, FieldSpec::text("First Name").required())
            .field(Pt::Oxygen, FieldSpec::boolean("Oxygen Required"))
            .field(Pt::Weight, FieldSpec::number("Weight"))
            .field(Pt::Documents, FieldSpec::attachments("Documents"))
    }

    fn sample() -> FormValues<Pt> {
        FormValues::new()
            .with(Pt::FirstName, "Jane")
            .with(Pt::Oxygen, true)
            .with(Pt::Weight, 140.5)
            .with(
                Pt::Documents,
                FieldValue::List(vec![AttachmentRef::new("insurance-card.pdf", 20480).into()]),
            )
    }

    fn key() -> DraftKey {
        DraftKey::for_wizard("patient-intake")
    }

    fn round_trip(store: &dyn DraftStore) {
        let values = sample();
        store.save(&key(), &Draft::from_values(&values)).unwrap();

        let loaded = store.load(&key()).unwrap().expect("draft present");
        let (restored, report) = loaded.restore(&schema());
        assert_eq!(restored, values);
        assert_eq!(report.restored, 4);
        assert!(report.unknown.is_empty());

        store.clear(&key()).unwrap();
        assert!(store.load(&key()).unwrap().is_none());
        // Clearing again is a no-op
        store.clear(&key()).unwrap();
    }

    #[test]
    fn test_memory_round_trip() {
        round_trip(&MemoryDraftStore::new());
    }

    #[test]
    fn test_file_round_trip() {
        let tmp = tempdir().unwrap();
        round_trip(&FileDraftStore::new(tmp.path().join("drafts")));
    }

    #[test]
    fn test_sqlite_round_trip() {
        round_trip(&SqliteDraftStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let a = Draft::from_values(&sample());
        let b = Draft::from_values(&sample());
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_restore_ignores_unknown_and_bad_values() {
        let text = r#"{"firstName": "Jane", "favouriteColour": "blue", "weight": [1, 2]}"#;
        let draft = Draft::from_json(&key(), text).unwrap();
        let (values, report) = draft.restore(&schema());

        assert_eq!(values.text(Pt::FirstName), Some("Jane"));
        assert_eq!(values.get(Pt::Weight), &FieldValue::Empty);
        assert_eq!(values.get(Pt::Oxygen), &FieldValue::Bool(false));
        assert_eq!(report.unknown, vec!["favouriteColour".to_string()]);
        assert_eq!(report.rejected, vec!["weight".to_string()]);
    }

    #[test]
    fn test_corrupt_text_is_reported() {
        let store = MemoryDraftStore::new();
        store.put_raw(&key(), "{not json").unwrap();
        assert!(matches!(store.load(&key()), Err(DraftError::Corrupt { .. })));
    }

    #[test]
    fn test_list_skips_corrupt_drafts() {
        let trip = DraftKey::for_wizard("trip-intake");

        let memory = MemoryDraftStore::new();
        memory.put_raw(&key(), "{not json").unwrap();
        memory.save(&trip, &Draft::from_values(&sample())).unwrap();
        let listed = memory.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, trip);

        let tmp = tempdir().unwrap();
        let files = FileDraftStore::new(tmp.path());
        files.save(&trip, &Draft::from_values(&sample())).unwrap();
        fs::write(files.path_for(&key()), "{not json").unwrap();
        let listed = files.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, trip);

        let sqlite = SqliteDraftStore::open_in_memory().unwrap();
        sqlite.save(&trip, &Draft::from_values(&sample())).unwrap();
        sqlite
            .conn
            .execute(
                "INSERT INTO drafts (key, body, fingerprint, updated_at) VALUES (?1, ?2, '', '')",
                params![key().as_str(), "{not json"],
            )
            .unwrap();
        let listed = sqlite.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, trip);
    }

    #[test]
    fn test_memory_clones_share_slots() {
        let tab_a = MemoryDraftStore::new();
        let tab_b = tab_a.clone();

        tab_a
            .save(&key(), &Draft::from_values(&FormValues::new().with(Pt::FirstName, "A")))
            .unwrap();
        tab_b
            .save(&key(), &Draft::from_values(&FormValues::new().with(Pt::FirstName, "B")))
            .unwrap();

        let (values, _) = tab_a.load(&key()).unwrap().unwrap().restore(&schema());
        assert_eq!(values.text(Pt::FirstName), Some("B"));
    }

    #[test]
    fn test_list_drafts() {
        let tmp = tempdir().unwrap();
        let store = SqliteDraftStore::open(&tmp.path().join("drafts.db")).unwrap();
        store
            .save(&DraftKey::for_wizard("trip-intake"), &Draft::from_values(&sample()))
            .unwrap();
        store.save(&key(), &Draft::from_values(&sample())).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key.wizard_id(), "patient-intake");
        assert_eq!(listed[1].fields, 4);
        assert!(listed[1].updated_at.is_some());
    }

    #[test]
    fn test_file_store_paths() {
        let store = FileDraftStore::new("/tmp/drafts");
        assert!(store
            .path_for(&key())
            .ends_with("draft-patient-intake.json"));
        assert_eq!(
            DraftKey::from_file_name("draft-patient-intake.json"),
            Some(key())
        );
        assert_eq!(DraftKey::from_file_name("notes.txt"), None);
    }
}
