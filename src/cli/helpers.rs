//! Shared helper functions for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::core::values::FieldValue;
use crate::schema::{FieldId, ValidationResult, WizardDefinition};

/// Values read from a YAML or JSON file, split into known fields and
/// keys the wizard does not define
pub struct ValuesFile<F: FieldId> {
    pub values: Vec<(F, FieldValue)>,
    pub unknown: Vec<String>,
}

/// Read a values file; YAML is a superset of JSON so one parser covers both
pub fn read_values_file<F: FieldId>(path: &Path) -> Result<ValuesFile<F>> {
    let text = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    parse_values::<F>(&text).wrap_err_with(|| format!("Invalid values file {}", path.display()))
}

pub fn parse_values<F: FieldId>(text: &str) -> Result<ValuesFile<F>> {
    let raw: BTreeMap<String, serde_json::Value> = if text.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_yml::from_str(text).into_diagnostic()?
    };

    let mut file = ValuesFile {
        values: Vec::new(),
        unknown: Vec::new(),
    };
    for (key, raw) in raw {
        match F::from_key(&key) {
            Some(field) => {
                let value = FieldValue::from_json(raw)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Unsupported value for '{}'", key))?;
                file.values.push((field, value));
            }
            None => file.unknown.push(key),
        }
    }
    Ok(file)
}

/// Warn about keys that no field of the wizard owns
pub fn warn_unknown_keys(unknown: &[String], quiet: bool) {
    if quiet {
        return;
    }
    for key in unknown {
        eprintln!(
            "{} Ignoring unknown field '{}'",
            style("!").yellow(),
            style(key).yellow()
        );
    }
}

/// Print validation errors grouped by the step that owns each field
pub fn print_errors<F: FieldId>(definition: &WizardDefinition<F>, errors: &ValidationResult<F>) {
    for (field, message) in errors.iter() {
        let step = definition
            .steps()
            .owner_of(field)
            .map(|s| s.id)
            .unwrap_or("-");
        eprintln!(
            "  {} {}/{}: {}",
            style("✗").red(),
            style(step).dim(),
            style(field.key()).cyan(),
            message
        );
    }
}

/// Write a JSON value in the requested structured format
pub fn print_structured(value: &serde_json::Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Json | OutputFormat::Auto => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::field_registry! {
        enum Demo {
            Name => "name",
            Pickup => "pickupTime",
            Needs => "specialNeeds",
        }
    }

    #[test]
    fn test_parse_yaml_values() {
        let file = parse_values::<Demo>(
            "name: Maria Garcia\npickupTime: \"08:30\"\nspecialNeeds: [oxygen, escort]\nfax: 555\n",
        )
        .unwrap();
        assert_eq!(file.unknown, vec!["fax".to_string()]);
        assert_eq!(file.values.len(), 3);
        assert!(file
            .values
            .contains(&(Demo::Needs, FieldValue::texts(["oxygen", "escort"]))));
    }

    #[test]
    fn test_parse_json_values() {
        let file = parse_values::<Demo>(r#"{"name": "Maria", "pickupTime": null}"#).unwrap();
        assert!(file.values.contains(&(Demo::Pickup, FieldValue::Empty)));
        assert!(file.unknown.is_empty());
    }

    #[test]
    fn test_parse_empty_file() {
        let file = parse_values::<Demo>("  \n").unwrap();
        assert!(file.values.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        assert!(parse_values::<Demo>("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }
}
