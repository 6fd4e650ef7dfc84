//! Cross-field refinements
//!
//! A refinement is a rule whose truth depends on several fields at once,
//! e.g. "prior authorization = Yes requires an authorization number".
//! Rules are plain data: the controller never knows what they check.

use std::fmt;
use std::sync::Arc;

use crate::core::values::FormValues;
use crate::schema::FieldId;

/// Predicate over the whole set of values
pub type Predicate<F> = Arc<dyn Fn(&FormValues<F>) -> bool + Send + Sync>;

/// A declarative cross-field rule
///
/// `assert` must hold for the values to be valid. When it does not, `message`
/// is reported against `attach_to`.
#[derive(Clone)]
pub struct CrossFieldRule<F: FieldId> {
    pub name: &'static str,
    pub triggers: Vec<F>,
    pub assert: Predicate<F>,
    pub message: String,
    pub attach_to: F,
}

impl<F: FieldId> fmt::Debug for CrossFieldRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossFieldRule")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .field("attach_to", &self.attach_to)
            .field("message", &self.message)
            .finish()
    }
}

impl<F: FieldId> CrossFieldRule<F> {
    pub fn new(
        name: &'static str,
        triggers: Vec<F>,
        message: impl Into<String>,
        attach_to: F,
        assert: impl Fn(&FormValues<F>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            triggers,
            assert: Arc::new(assert),
            message: message.into(),
            attach_to,
        }
    }

    /// `field` must be non-blank whenever `condition` holds
    pub fn required_when(
        name: &'static str,
        triggers: Vec<F>,
        field: F,
        message: impl Into<String>,
        condition: impl Fn(&FormValues<F>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, triggers, message, field, move |values| {
            !condition(values) || !values.is_blank(field)
        })
    }

    /// `end` must not fall before `start`; only checked once both parse as dates
    pub fn date_order(name: &'static str, start: F, end: F, message: impl Into<String>) -> Self {
        Self::new(name, vec![start, end], message, end, move |values| {
            match (values.date(start), values.date(end)) {
                (Some(s), Some(e)) => e >= s,
                _ => true,
            }
        })
    }

    /// `end` must be strictly after `start`; only checked once both parse as times
    pub fn time_order(name: &'static str, start: F, end: F, message: impl Into<String>) -> Self {
        Self::new(name, vec![start, end], message, end, move |values| {
            match (values.time(start), values.time(end)) {
                (Some(s), Some(e)) => e > s,
                _ => true,
            }
        })
    }

    /// The rule participates in a check of `fields` when one of its triggers
    /// or its target is part of that set
    pub fn participates(&self, fields: &[F]) -> bool {
        fields.contains(&self.attach_to) || self.triggers.iter().any(|t| fields.contains(t))
    }

    pub fn holds(&self, values: &FormValues<F>) -> bool {
        (self.assert)(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::field_registry! {
        enum Auth {
            Prior => "prior",
            Number => "number",
            Start => "start",
            End => "end",
        }
    }

    #[test]
    fn test_required_when() {
        let rule = CrossFieldRule::required_when(
            "auth-number",
            vec![Auth::Prior],
            Auth::Number,
            "Authorization number is required",
            |v| v.is_yes(Auth::Prior),
        );

        let values = FormValues::new().with(Auth::Prior, "No");
        assert!(rule.holds(&values));

        let values = FormValues::new().with(Auth::Prior, "Yes");
        assert!(!rule.holds(&values));

        let values = values.with(Auth::Number, "A-1");
        assert!(rule.holds(&values));
    }

    #[test]
    fn test_date_order_ignores_incomplete() {
        let rule = CrossFieldRule::date_order("auth-dates", Auth::Start, Auth::End, "End before start");
        assert_eq!(rule.attach_to, Auth::End);

        let values = FormValues::new().with(Auth::Start, "2025-01-10");
        assert!(rule.holds(&values));

        let values = values.with(Auth::End, "2025-01-09");
        assert!(!rule.holds(&values));

        let values = FormValues::new()
            .with(Auth::Start, "2025-01-10")
            .with(Auth::End, "2025-01-10");
        assert!(rule.holds(&values));
    }

    #[test]
    fn test_participation() {
        let rule = CrossFieldRule::date_order("auth-dates", Auth::Start, Auth::End, "x");
        assert!(rule.participates(&[Auth::Start]));
        assert!(rule.participates(&[Auth::End]));
        assert!(!rule.participates(&[Auth::Number]));
    }
}
