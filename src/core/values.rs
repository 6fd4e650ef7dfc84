//! Form values - the in-progress answers of a wizard run
//!
//! Values are stored per typed field identifier. The string keys only appear
//! at the edges (draft files, values files, submission payloads).

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::FieldId;

/// Date format used by every date field
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format used by every time field
pub const TIME_FORMAT: &str = "%H:%M";

static EMPTY: FieldValue = FieldValue::Empty;

/// A single field value
///
/// The JSON form is untagged, so a draft reads naturally:
/// `{"firstName": "Jane", "oxygenRequired": true, "documents": [{"filename": "card.pdf", "size": 1024}]}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
    Attachment(AttachmentRef),
    Object(BTreeMap<String, FieldValue>),
}

/// Reference to an uploaded file
///
/// Only metadata is kept; raw contents never enter the form values or drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentRef {
    pub filename: String,
    pub size: u64,
    #[serde(default, rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl AttachmentRef {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
            content_type: None,
        }
    }
}

impl FieldValue {
    /// Build a list of text values
    pub fn texts<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(|s| FieldValue::Text(s.into())).collect())
    }

    /// Build an object value from key/value pairs
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        FieldValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// True for empty values, whitespace-only text and empty collections
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Object(map) => map.is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) | FieldValue::Attachment(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value; numeric text is accepted as entered by text inputs
    /// Finite numeric value; `NaN` and infinities are not numbers here
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Parse a `YYYY-MM-DD` text value
    pub fn as_date(&self) -> Option<NaiveDate> {
        self.as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
    }

    /// Parse a `HH:MM` text value
    pub fn as_time(&self) -> Option<NaiveTime> {
        self.as_str()
            .and_then(|s| NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).ok())
    }

    /// Yes/no answers come either from checkboxes or "Yes"/"No" selects
    pub fn is_yes(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => matches!(s.trim().to_lowercase().as_str(), "yes" | "true"),
            _ => false,
        }
    }

    /// Human-readable rendering used by prompts and tables
    pub fn display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Bool(true) => "Yes".to_string(),
            FieldValue::Bool(false) => "No".to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items
                .iter()
                .map(FieldValue::display)
                .collect::<Vec<_>>()
                .join(", "),
            FieldValue::Attachment(a) => format!("{} ({} bytes)", a.filename, a.size),
            FieldValue::Object(map) => map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.display()))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<AttachmentRef> for FieldValue {
    fn from(a: AttachmentRef) -> Self {
        FieldValue::Attachment(a)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::List(items)
    }
}

/// Current values of one wizard run, keyed by typed field identifier
#[derive(Debug, Clone, PartialEq)]
pub struct FormValues<F: FieldId> {
    values: BTreeMap<F, FieldValue>,
}

impl<F: FieldId> Default for FormValues<F> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<F: FieldId> FormValues<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures
    pub fn with(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Current value; absent fields read as `Empty`
    pub fn get(&self, field: F) -> &FieldValue {
        self.values.get(&field).unwrap_or(&EMPTY)
    }

    /// Set a value, returning the previous one
    pub fn set(&mut self, field: F, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.values.insert(field, value.into())
    }

    pub fn remove(&mut self, field: F) -> Option<FieldValue> {
        self.values.remove(&field)
    }

    pub fn contains(&self, field: F) -> bool {
        self.values.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &FieldValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_blank(&self, field: F) -> bool {
        self.get(field).is_blank()
    }

    /// Trimmed, non-empty text value
    pub fn text(&self, field: F) -> Option<&str> {
        self.get(field)
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// True when the field holds exactly this text (case-insensitive)
    pub fn equals(&self, field: F, expected: &str) -> bool {
        self.text(field)
            .is_some_and(|s| s.eq_ignore_ascii_case(expected))
    }

    pub fn is_yes(&self, field: F) -> bool {
        self.get(field).is_yes()
    }

    pub fn date(&self, field: F) -> Option<NaiveDate> {
        self.get(field).as_date()
    }

    pub fn time(&self, field: F) -> Option<NaiveTime> {
        self.get(field).as_time()
    }

    pub fn number(&self, field: F) -> Option<f64> {
        self.get(field).as_number()
    }

    /// Text entries of a list value (selected options of a multi-select)
    pub fn selections(&self, field: F) -> Vec<&str> {
        self.get(field)
            .as_list()
            .map(|items| items.iter().filter_map(FieldValue::as_str).collect())
            .unwrap_or_default()
    }

    /// Keep only the given fields
    pub fn restricted_to(&self, fields: &[F]) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(f, _)| fields.contains(f))
                .map(|(f, v)| (*f, v.clone()))
                .collect(),
        }
    }

    /// String-keyed JSON map, sorted by key
    pub fn to_json_map(&self) -> BTreeMap<String, serde_json::Value> {
        self.values
            .iter()
            .map(|(f, v)| (f.key().to_string(), v.to_json()))
            .collect()
    }
}

impl<F: FieldId> FromIterator<(F, FieldValue)> for FormValues<F> {
    fn from_iter<I: IntoIterator<Item = (F, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_values() {
        assert!(FieldValue::Empty.is_blank());
        assert!(FieldValue::from("   ").is_blank());
        assert!(FieldValue::List(vec![]).is_blank());
        assert!(!FieldValue::from(false).is_blank());
        assert!(!FieldValue::from(0.0).is_blank());
        assert!(!FieldValue::from("x").is_blank());
    }

    #[test]
    fn test_numbers_must_be_finite() {
        assert_eq!(FieldValue::from(" 42.5 ").as_number(), Some(42.5));
        assert_eq!(FieldValue::from("NaN").as_number(), None);
        assert_eq!(FieldValue::from("-inf").as_number(), None);
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn test_untagged_json_shape() {
        let value = FieldValue::List(vec![
            FieldValue::from("a"),
            AttachmentRef::new("card.pdf", 1024).into(),
        ]);
        assert_eq!(
            value.to_json(),
            json!(["a", {"filename": "card.pdf", "size": 1024}])
        );
    }

    #[test]
    fn test_attachment_and_object_parse() {
        let att = FieldValue::from_json(json!({"filename": "a.pdf", "size": 10})).unwrap();
        assert!(matches!(att, FieldValue::Attachment(_)));

        let obj = FieldValue::from_json(json!({"filename": "a.pdf", "pages": 3})).unwrap();
        assert!(matches!(obj, FieldValue::Object(_)));

        let null = FieldValue::from_json(json!(null)).unwrap();
        assert_eq!(null, FieldValue::Empty);

        let n = FieldValue::from_json(json!(42)).unwrap();
        assert_eq!(n, FieldValue::Number(42.0));
    }

    #[test]
    fn test_yes_answers() {
        assert!(FieldValue::from("Yes").is_yes());
        assert!(FieldValue::from(true).is_yes());
        assert!(!FieldValue::from("No").is_yes());
        assert!(!FieldValue::Empty.is_yes());
    }

    #[test]
    fn test_dates_and_times() {
        assert_eq!(
            FieldValue::from("2024-02-29").as_date(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(FieldValue::from("2023-02-29").as_date().is_none());
        assert!(FieldValue::from("09:30").as_time().is_some());
        assert!(FieldValue::from("9.30am").as_time().is_none());
    }
}
