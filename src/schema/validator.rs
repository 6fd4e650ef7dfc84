//! Step-scoped validation with field-level error reporting
//!
//! Validation is a pure function of (schema, rules, reference date, checked
//! fields, values). Calling it again with the same input yields the same
//! result, so views may re-validate on every change or blur.

use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::core::values::FormValues;
use crate::schema::field::FieldSchema;
use crate::schema::rule::CrossFieldRule;
use crate::schema::FieldId;

/// Field -> error message; empty means the checked fields are valid
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult<F: FieldId> {
    errors: BTreeMap<F, String>,
}

impl<F: FieldId> Default for ValidationResult<F> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<F: FieldId> ValidationResult<F> {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: F) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: F) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn fields(&self) -> Vec<F> {
        self.errors.keys().copied().collect()
    }

    /// First errored field following the given declaration order
    pub fn first_in(&self, order: &[F]) -> Option<F> {
        order.iter().copied().find(|f| self.errors.contains_key(f))
    }

    pub(crate) fn insert(&mut self, field: F, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub(crate) fn remove(&mut self, field: F) -> Option<String> {
        self.errors.remove(&field)
    }

    /// Add errors from `other`; existing messages are kept
    pub fn merge(&mut self, other: ValidationResult<F>) {
        for (field, message) in other.errors {
            self.errors.entry(field).or_insert(message);
        }
    }

    /// String-keyed view for display and serialization
    pub fn to_string_map(&self) -> BTreeMap<&'static str, String> {
        self.errors
            .iter()
            .map(|(f, m)| (f.key(), m.clone()))
            .collect()
    }
}

/// Validator over one wizard's schema and cross-field rules
pub struct Validator<'d, F: FieldId> {
    schema: &'d FieldSchema<F>,
    rules: &'d [CrossFieldRule<F>],
    reference_date: NaiveDate,
}

impl<'d, F: FieldId> Validator<'d, F> {
    /// Create a validator using today's date for date plausibility rules
    pub fn new(schema: &'d FieldSchema<F>, rules: &'d [CrossFieldRule<F>]) -> Self {
        Self {
            schema,
            rules,
            reference_date: Utc::now().date_naive(),
        }
    }

    /// Pin the date that age and expiry rules are measured against
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Validate `fields` against `values`
    ///
    /// Per-field rules run for every field in the set. A cross-field rule runs
    /// when one of its triggers or its target is in the set, but its error is
    /// only reported when the target field is in the set; a rule never surfaces
    /// an error on a field the user has not reached. A per-field error on the
    /// target takes precedence over the refinement message.
    pub fn validate(&self, fields: &[F], values: &FormValues<F>) -> ValidationResult<F> {
        let mut result = ValidationResult::success();

        for &field in fields {
            let Some(spec) = self.schema.get(field) else {
                continue;
            };
            if let Some(message) = spec.check(values.get(field), self.reference_date) {
                result.insert(field, message);
            }
        }

        for rule in self.rules.iter().filter(|r| r.participates(fields)) {
            if rule.holds(values) {
                continue;
            }
            if !fields.contains(&rule.attach_to) {
                tracing::trace!(
                    rule = rule.name,
                    target = rule.attach_to.key(),
                    "refinement failed on a field outside the checked set"
                );
                continue;
            }
            if !result.contains(rule.attach_to) {
                result.insert(rule.attach_to, rule.message.clone());
            }
        }

        result
    }

    /// Validate a single field, including refinements that target it
    pub fn validate_field(&self, field: F, values: &FormValues<F>) -> Option<String> {
        self.validate(&[field], values).get(field).map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::{FieldSpec, Format};

    crate::field_registry! {
        enum Ins {
            Provider => "provider",
            Prior => "priorAuthorization",
            Number => "authorizationNumber",
            Start => "authorizationStartDate",
            End => "authorizationEndDate",
            Phone => "phone",
        }
    }

    fn schema() -> FieldSchema<Ins> {
        FieldSchema::new()
            .field(Ins::Provider, FieldSpec::text("Insurance Provider").required())
            .field(Ins::Prior, FieldSpec::choice("Prior Authorization", &["Yes", "No"]).required())
            .field(Ins::Number, FieldSpec::text("Authorization Number"))
            .field(Ins::Start, FieldSpec::date("Authorization Start Date"))
            .field(Ins::End, FieldSpec::date("Authorization End Date"))
            .field(Ins::Phone, FieldSpec::text("Phone").format(Format::Phone))
    }

    fn rules() -> Vec<CrossFieldRule<Ins>> {
        vec![
            CrossFieldRule::required_when(
                "auth-number",
                vec![Ins::Prior],
                Ins::Number,
                "Authorization number is required when prior authorization is Yes",
                |v| v.is_yes(Ins::Prior),
            ),
            CrossFieldRule::date_order(
                "auth-dates",
                Ins::Start,
                Ins::End,
                "Authorization end date must be on or after the start date",
            ),
        ]
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_empty_field_set_is_valid() {
        let schema = schema();
        let rules = rules();
        let validator = Validator::new(&schema, &rules).with_reference_date(reference());
        assert!(validator.validate(&[], &FormValues::new()).is_valid());
    }

    #[test]
    fn test_only_checked_fields_reported() {
        let schema = schema();
        let rules = rules();
        let validator = Validator::new(&schema, &rules).with_reference_date(reference());
        let result = validator.validate(&[Ins::Phone], &FormValues::new());
        assert!(result.is_valid(), "provider is outside the checked set");
    }

    #[test]
    fn test_refinement_attached_to_target() {
        let schema = schema();
        let rules = rules();
        let validator = Validator::new(&schema, &rules).with_reference_date(reference());
        let values = FormValues::new()
            .with(Ins::Provider, "Acme Health")
            .with(Ins::Prior, "Yes");

        let all = [Ins::Provider, Ins::Prior, Ins::Number, Ins::Start, Ins::End];
        let result = validator.validate(&all, &values);
        assert_eq!(result.len(), 1);
        assert!(result.get(Ins::Number).unwrap().contains("Authorization number"));
    }

    #[test]
    fn test_refinement_suppressed_outside_set() {
        let schema = schema();
        let rules = rules();
        let validator = Validator::new(&schema, &rules).with_reference_date(reference());
        let values = FormValues::new()
            .with(Ins::Provider, "Acme Health")
            .with(Ins::Prior, "Yes");

        // Trigger visible, target not: the rule is evaluated but not reported
        let result = validator.validate(&[Ins::Provider, Ins::Prior], &values);
        assert!(result.is_valid());
    }

    #[test]
    fn test_field_error_takes_precedence() {
        let schema = schema();
        let rules = rules();
        let validator = Validator::new(&schema, &rules).with_reference_date(reference());
        let values = FormValues::new()
            .with(Ins::Start, "2025-02-01")
            .with(Ins::End, "31/01/2025");

        let result = validator.validate(&[Ins::Start, Ins::End], &values);
        assert_eq!(
            result.get(Ins::End),
            Some("Authorization End Date must be a valid date (YYYY-MM-DD)")
        );
    }

    #[test]
    fn test_validate_is_deterministic() {
        let schema = schema();
        let rules = rules();
        let validator = Validator::new(&schema, &rules).with_reference_date(reference());
        let values = FormValues::new()
            .with(Ins::Prior, "Yes")
            .with(Ins::Start, "2025-03-01")
            .with(Ins::End, "2025-02-01")
            .with(Ins::Phone, "12");
        let fields = Ins::all();

        let first = validator.validate(fields, &values);
        let second = validator.validate(fields, &values);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_first_in_declaration_order() {
        let mut result = ValidationResult::success();
        result.insert(Ins::Phone, "bad phone");
        result.insert(Ins::Number, "missing");
        assert_eq!(result.first_in(&[Ins::Phone, Ins::Number]), Some(Ins::Phone));
        assert_eq!(result.first_in(&[Ins::Provider]), None);
    }
}
