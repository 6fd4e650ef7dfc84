//! Field registry and field schema
//!
//! Each wizard declares its fields as an enum through [`field_registry!`],
//! then describes every field with a [`FieldSpec`]. Steps and rules refer to
//! the enum, never to raw strings.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::core::values::{FieldValue, FormValues};

/// A typed field identifier with a stable string key
pub trait FieldId: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable key shared by drafts, values files and submissions
    fn key(&self) -> &'static str;

    /// Every field, in declaration order
    fn all() -> &'static [Self];

    fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.key() == key)
    }
}

/// Declare a field enum together with its [`FieldId`] implementation
///
/// ```
/// intake::field_registry! {
///     pub enum DemoField {
///         FirstName => "firstName",
///         LastName => "lastName",
///     }
/// }
/// use intake::schema::FieldId;
/// assert_eq!(DemoField::from_key("lastName"), Some(DemoField::LastName));
/// ```
#[macro_export]
macro_rules! field_registry {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $key:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::schema::FieldId for $name {
            fn key(&self) -> &'static str {
                match self {
                    $( Self::$variant => $key ),+
                }
            }

            fn all() -> &'static [Self] {
                &[ $( Self::$variant ),+ ]
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::schema::FieldId::key(self))
            }
        }
    };
}

/// Data type of a field; drives the type check and the prompt used to edit it
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    LongText,
    Number,
    Boolean,
    Choice(&'static [&'static str]),
    MultiChoice(&'static [&'static str]),
    Date,
    Time,
    /// Map pick: an object with `lat` and `lng`
    Location,
    Attachment,
    AttachmentList,
    Object,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::LongText => "long text",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Choice(_) => "choice",
            FieldKind::MultiChoice(_) => "multi-choice",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Location => "location",
            FieldKind::Attachment => "attachment",
            FieldKind::AttachmentList => "attachments",
            FieldKind::Object => "object",
        }
    }

    /// Allowed options for choice kinds
    pub fn options(&self) -> Option<&'static [&'static str]> {
        match self {
            FieldKind::Choice(options) | FieldKind::MultiChoice(options) => Some(*options),
            _ => None,
        }
    }

    /// Structural type check of a non-blank value
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            FieldKind::Text | FieldKind::LongText | FieldKind::Choice(_) => {
                value.as_str().is_some()
            }
            FieldKind::Number => value.as_number().is_some(),
            FieldKind::Boolean => value.as_bool().is_some(),
            FieldKind::Date => value.as_date().is_some(),
            FieldKind::Time => value.as_time().is_some(),
            FieldKind::MultiChoice(_) => value
                .as_list()
                .is_some_and(|items| items.iter().all(|i| i.as_str().is_some())),
            FieldKind::Location => value.as_object().is_some_and(|map| {
                ["lat", "lng"]
                    .iter()
                    .all(|k| map.get(*k).and_then(FieldValue::as_number).is_some())
            }),
            FieldKind::Attachment => matches!(value, FieldValue::Attachment(_)),
            FieldKind::AttachmentList => value.as_list().is_some_and(|items| {
                items.iter().all(|i| matches!(i, FieldValue::Attachment(_)))
            }),
            FieldKind::Object => value.as_object().is_some(),
        }
    }

    fn type_message(&self, label: &str) -> String {
        match self {
            FieldKind::Number => format!("{} must be a number", label),
            FieldKind::Date => format!("{} must be a valid date (YYYY-MM-DD)", label),
            FieldKind::Time => format!("{} must be a valid time (HH:MM)", label),
            FieldKind::Location => format!("{} must be a map location", label),
            FieldKind::Attachment | FieldKind::AttachmentList => {
                format!("{} must be an uploaded file", label)
            }
            other => format!("{} must be a {} value", label, other.type_name()),
        }
    }
}

/// Named text formats checked with regular expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// North American phone number, with or without separators
    Phone,
    /// Letters, spaces, apostrophes and hyphens
    AlphaName,
    Email,
    /// 5-digit ZIP or ZIP+4
    ZipCode,
    /// Medical record number, `MRN-` followed by six digits
    RecordNumber,
    /// Federal tax id, `NN-NNNNNNN`
    TaxId,
    /// Two-letter state code
    StateCode,
    /// Alphanumeric license / certificate number
    LicenseNumber,
}

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?1?[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}$").unwrap());
static ALPHA_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z '\-]*$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").unwrap());
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
static RECORD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^MRN-\d{6}$").unwrap());
static TAX_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}-\d{7}$").unwrap());
static STATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());
static LICENSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{3,19}$").unwrap());

impl Format {
    fn regex(&self) -> &'static Regex {
        match self {
            Format::Phone => &*PHONE_RE,
            Format::AlphaName => &*ALPHA_NAME_RE,
            Format::Email => &*EMAIL_RE,
            Format::ZipCode => &*ZIP_RE,
            Format::RecordNumber => &*RECORD_NUMBER_RE,
            Format::TaxId => &*TAX_ID_RE,
            Format::StateCode => &*STATE_RE,
            Format::LicenseNumber => &*LICENSE_RE,
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex().is_match(text.trim())
    }

    fn message(&self, label: &str) -> String {
        match self {
            Format::Phone => format!("{} must be a valid phone number", label),
            Format::AlphaName => format!("{} may only contain letters", label),
            Format::Email => format!("{} must be a valid email address", label),
            Format::ZipCode => format!("{} must be a 5-digit ZIP code", label),
            Format::RecordNumber => format!("{} must look like MRN-123456", label),
            Format::TaxId => format!("{} must look like 12-3456789", label),
            Format::StateCode => format!("{} must be a two-letter state code", label),
            Format::LicenseNumber => format!("{} must be 4-20 letters or digits", label),
        }
    }
}

/// Custom single-value check
pub type ValueCheck = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// A per-field rule, evaluated only on non-blank values
#[derive(Clone)]
pub enum FieldRule {
    MinLength(usize),
    MaxLength(usize),
    Range { min: f64, max: f64 },
    Format(Format),
    /// Birth-date plausibility: age in whole years within the bounds
    AgeBetween { min: u32, max: u32 },
    MinItems(usize),
    /// Date on or after the reference date
    NotPast,
    /// Date on or before the reference date
    NotFuture,
    Custom { check: ValueCheck, message: String },
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::MinLength(n) => write!(f, "MinLength({})", n),
            FieldRule::MaxLength(n) => write!(f, "MaxLength({})", n),
            FieldRule::Range { min, max } => write!(f, "Range({}..={})", min, max),
            FieldRule::Format(format) => write!(f, "Format({:?})", format),
            FieldRule::AgeBetween { min, max } => write!(f, "AgeBetween({}..={})", min, max),
            FieldRule::MinItems(n) => write!(f, "MinItems({})", n),
            FieldRule::NotPast => write!(f, "NotPast"),
            FieldRule::NotFuture => write!(f, "NotFuture"),
            FieldRule::Custom { message, .. } => write!(f, "Custom({:?})", message),
        }
    }
}

impl FieldRule {
    /// Check a non-blank value; returns the error message on failure
    pub fn check(&self, label: &str, value: &FieldValue, today: NaiveDate) -> Option<String> {
        match self {
            FieldRule::MinLength(min) => {
                let len = value.as_str().map(|s| s.trim().chars().count())?;
                (len < *min).then(|| format!("{} must be at least {} characters", label, min))
            }
            FieldRule::MaxLength(max) => {
                let len = value.as_str().map(|s| s.trim().chars().count())?;
                (len > *max).then(|| format!("{} must be at most {} characters", label, max))
            }
            FieldRule::Range { min, max } => {
                let n = value.as_number()?;
                (n < *min || n > *max)
                    .then(|| format!("{} must be between {} and {}", label, min, max))
            }
            FieldRule::Format(format) => {
                let text = value.as_str()?;
                (!format.is_match(text)).then(|| format.message(label))
            }
            FieldRule::AgeBetween { min, max } => {
                let born = value.as_date()?;
                let age = age_on(born, today);
                let plausible = age >= *min as i32 && age <= *max as i32;
                (!plausible).then(|| {
                    format!("{} must give an age between {} and {}", label, min, max)
                })
            }
            FieldRule::MinItems(min) => {
                let count = value.as_list().map(<[FieldValue]>::len).unwrap_or(0);
                (count < *min).then(|| {
                    if *min == 1 {
                        format!("Select at least one {}", label.to_lowercase())
                    } else {
                        format!("Select at least {} {}", min, label.to_lowercase())
                    }
                })
            }
            FieldRule::NotPast => {
                let date = value.as_date()?;
                (date < today).then(|| format!("{} cannot be in the past", label))
            }
            FieldRule::NotFuture => {
                let date = value.as_date()?;
                (date > today).then(|| format!("{} cannot be in the future", label))
            }
            FieldRule::Custom { check, message } => (!check(value)).then(|| message.clone()),
        }
    }
}

/// Age in whole years on `today`; negative when born in the future
pub fn age_on(born: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

/// Declaration of one field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: FieldValue,
    pub rules: Vec<FieldRule>,
    pub help: Option<&'static str>,
}

impl FieldSpec {
    pub fn new(label: &'static str, kind: FieldKind) -> Self {
        Self {
            label,
            kind,
            required: false,
            default: FieldValue::Empty,
            rules: Vec::new(),
            help: None,
        }
    }

    pub fn text(label: &'static str) -> Self {
        Self::new(label, FieldKind::Text)
    }

    pub fn long_text(label: &'static str) -> Self {
        Self::new(label, FieldKind::LongText)
    }

    pub fn number(label: &'static str) -> Self {
        Self::new(label, FieldKind::Number)
    }

    /// Checkbox; defaults to unchecked
    pub fn boolean(label: &'static str) -> Self {
        Self::new(label, FieldKind::Boolean).default_value(false)
    }

    pub fn choice(label: &'static str, options: &'static [&'static str]) -> Self {
        Self::new(label, FieldKind::Choice(options))
    }

    pub fn multi_choice(label: &'static str, options: &'static [&'static str]) -> Self {
        Self::new(label, FieldKind::MultiChoice(options))
    }

    pub fn date(label: &'static str) -> Self {
        Self::new(label, FieldKind::Date)
    }

    pub fn time(label: &'static str) -> Self {
        Self::new(label, FieldKind::Time)
    }

    pub fn location(label: &'static str) -> Self {
        Self::new(label, FieldKind::Location)
    }

    pub fn attachment(label: &'static str) -> Self {
        Self::new(label, FieldKind::Attachment)
    }

    pub fn attachments(label: &'static str) -> Self {
        Self::new(label, FieldKind::AttachmentList)
    }

    pub fn object(label: &'static str) -> Self {
        Self::new(label, FieldKind::Object)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = value.into();
        self
    }

    pub fn help(mut self, text: &'static str) -> Self {
        self.help = Some(text);
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn min_len(self, min: usize) -> Self {
        self.rule(FieldRule::MinLength(min))
    }

    pub fn max_len(self, max: usize) -> Self {
        self.rule(FieldRule::MaxLength(max))
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.rule(FieldRule::Range { min, max })
    }

    pub fn format(self, format: Format) -> Self {
        self.rule(FieldRule::Format(format))
    }

    pub fn age_between(self, min: u32, max: u32) -> Self {
        self.rule(FieldRule::AgeBetween { min, max })
    }

    pub fn min_items(self, min: usize) -> Self {
        self.rule(FieldRule::MinItems(min))
    }

    pub fn not_past(self) -> Self {
        self.rule(FieldRule::NotPast)
    }

    pub fn not_future(self) -> Self {
        self.rule(FieldRule::NotFuture)
    }

    pub fn custom(
        self,
        message: impl Into<String>,
        check: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rule(FieldRule::Custom {
            check: Arc::new(check),
            message: message.into(),
        })
    }

    /// Evaluate required-ness, type, choice membership and declared rules.
    /// The first failure wins.
    pub fn check(&self, value: &FieldValue, today: NaiveDate) -> Option<String> {
        if value.is_blank() {
            return self
                .required
                .then(|| format!("{} is required", self.label));
        }

        if !self.kind.accepts(value) {
            return Some(self.kind.type_message(self.label));
        }

        match &self.kind {
            FieldKind::Choice(options) => {
                let text = value.as_str().map(str::trim).unwrap_or_default();
                if !options.contains(&text) {
                    return Some(format!(
                        "{} must be one of: {}",
                        self.label,
                        options.join(", ")
                    ));
                }
            }
            FieldKind::MultiChoice(options) => {
                let unknown = value
                    .as_list()
                    .into_iter()
                    .flatten()
                    .filter_map(FieldValue::as_str)
                    .find(|s| !options.contains(s));
                if let Some(bad) = unknown {
                    return Some(format!("{}: '{}' is not a valid option", self.label, bad));
                }
            }
            _ => {}
        }

        self.rules
            .iter()
            .find_map(|rule| rule.check(self.label, value, today))
    }
}

/// All field declarations of one wizard
#[derive(Debug, Clone)]
pub struct FieldSchema<F: FieldId> {
    specs: BTreeMap<F, FieldSpec>,
}

impl<F: FieldId> Default for FieldSchema<F> {
    fn default() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }
}

impl<F: FieldId> FieldSchema<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: F, spec: FieldSpec) -> Self {
        self.specs.insert(field, spec);
        self
    }

    pub fn get(&self, field: F) -> Option<&FieldSpec> {
        self.specs.get(&field)
    }

    pub fn contains(&self, field: F) -> bool {
        self.specs.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &FieldSpec)> {
        self.specs.iter().map(|(f, s)| (*f, s))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Schema defaults for every declared field
    pub fn defaults(&self) -> FormValues<F> {
        self.specs
            .iter()
            .map(|(f, s)| (*f, s.default.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_required_blank() {
        let spec = FieldSpec::text("First Name").required();
        assert_eq!(
            spec.check(&FieldValue::from("  "), today()),
            Some("First Name is required".to_string())
        );
        assert!(FieldSpec::text("Middle Name").check(&FieldValue::Empty, today()).is_none());
    }

    #[test]
    fn test_rules_skip_blank_optional() {
        let spec = FieldSpec::text("Email").format(Format::Email);
        assert!(spec.check(&FieldValue::Empty, today()).is_none());
        assert!(spec.check(&FieldValue::from("nope"), today()).is_some());
        assert!(spec.check(&FieldValue::from("a@b.org"), today()).is_none());
    }

    #[test]
    fn test_first_failure_wins() {
        let spec = FieldSpec::text("Name")
            .min_len(2)
            .format(Format::AlphaName);
        assert_eq!(
            spec.check(&FieldValue::from("1"), today()),
            Some("Name must be at least 2 characters".to_string())
        );
    }

    #[test]
    fn test_choice_membership() {
        let spec = FieldSpec::choice("Gender", &["Male", "Female"]);
        assert!(spec.check(&FieldValue::from("Female"), today()).is_none());
        assert!(spec.check(&FieldValue::from("Robot"), today()).is_some());

        let multi = FieldSpec::multi_choice("Services", &["BLS", "ALS"]);
        assert!(multi.check(&FieldValue::texts(["BLS"]), today()).is_none());
        assert!(multi.check(&FieldValue::texts(["BLS", "CCT"]), today()).is_some());
    }

    #[test]
    fn test_age_plausibility() {
        let spec = FieldSpec::date("Date of Birth").age_between(0, 120);
        assert!(spec.check(&FieldValue::from("1950-01-01"), today()).is_none());
        assert!(spec.check(&FieldValue::from("1850-01-01"), today()).is_some());
        assert!(spec.check(&FieldValue::from("2030-01-01"), today()).is_some());
        assert!(spec.check(&FieldValue::from("not a date"), today()).is_some());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let born = NaiveDate::from_ymd_opt(2000, 6, 16).unwrap();
        assert_eq!(age_on(born, today()), 24);
        let born = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(born, today()), 25);
    }

    #[test]
    fn test_number_range_accepts_numeric_text() {
        let spec = FieldSpec::number("Weight").range(1.0, 1000.0);
        assert!(spec.check(&FieldValue::from("180"), today()).is_none());
        assert!(spec.check(&FieldValue::from(0.0), today()).is_some());
        assert_eq!(
            spec.check(&FieldValue::from("heavy"), today()),
            Some("Weight must be a number".to_string())
        );
    }

    #[test]
    fn test_number_rejects_non_finite() {
        let spec = FieldSpec::number("Base Rate")
            .required()
            .range(0.0, 10_000.0);
        for value in [
            FieldValue::from("NaN"),
            FieldValue::from("inf"),
            FieldValue::Number(f64::NAN),
            FieldValue::Number(f64::INFINITY),
        ] {
            assert_eq!(
                spec.check(&value, today()),
                Some("Base Rate must be a number".to_string())
            );
        }
    }

    #[test]
    fn test_formats() {
        assert!(Format::Phone.is_match("(555) 123-4567"));
        assert!(Format::Phone.is_match("555.123.4567"));
        assert!(!Format::Phone.is_match("12345"));
        assert!(Format::RecordNumber.is_match("MRN-123456"));
        assert!(!Format::RecordNumber.is_match("MRN-12345"));
        assert!(Format::ZipCode.is_match("02139-1234"));
        assert!(Format::AlphaName.is_match("O'Neil-Smith"));
        assert!(!Format::AlphaName.is_match("R2D2"));
    }

    #[test]
    fn test_location_kind() {
        let spec = FieldSpec::location("Pickup");
        let good = FieldValue::object([("lat", FieldValue::from(42.1)), ("lng", FieldValue::from(-71.0))]);
        let bad = FieldValue::object([("lat", FieldValue::from(42.1))]);
        assert!(spec.check(&good, today()).is_none());
        assert!(spec.check(&bad, today()).is_some());
    }

    #[test]
    fn test_schema_defaults() {
        crate::field_registry! {
            enum Demo {
                Flag => "flag",
                Name => "name",
            }
        }
        let schema = FieldSchema::new()
            .field(Demo::Flag, FieldSpec::boolean("Flag"))
            .field(Demo::Name, FieldSpec::text("Name"));
        let defaults = schema.defaults();
        assert_eq!(defaults.get(Demo::Flag), &FieldValue::Bool(false));
        assert_eq!(defaults.get(Demo::Name), &FieldValue::Empty);
    }
}
