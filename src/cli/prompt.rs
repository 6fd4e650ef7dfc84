//! Terminal rendering of wizard fields
//!
//! Each field kind maps to a dialoguer prompt. The prompt shows the current
//! value as its default and the field's last validation error above it.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::values::{AttachmentRef, FieldValue};
use crate::core::wizard::FieldView;
use crate::schema::{FieldId, FieldKind};

const SKIP: &str = "(leave empty)";

pub struct Prompter {
    theme: ColorfulTheme,
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Ask for a new value of one field
    pub fn prompt_field<F: FieldId>(&self, view: &FieldView<'_, F>) -> Result<FieldValue> {
        if let Some(error) = view.error {
            println!("  {} {}", style("✗").red(), style(error).red());
        }
        if let Some(help) = view.help {
            println!("  {}", style(help).dim());
        }

        let prompt = format_prompt(view);
        match view.kind {
            FieldKind::Choice(options) => self.select(&prompt, options, view),
            FieldKind::MultiChoice(options) => self.multi_select(&prompt, options, view),
            FieldKind::Boolean => {
                let items = &["Yes", "No"];
                let default_idx = if view.value.is_yes() { 0 } else { 1 };
                let selection = Select::with_theme(&self.theme)
                    .with_prompt(&prompt)
                    .items(items)
                    .default(default_idx)
                    .interact()
                    .into_diagnostic()?;
                Ok(FieldValue::Bool(selection == 0))
            }
            FieldKind::Number => {
                let text = self.text(&prompt, view, |s| match s.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(()),
                    _ => Err("Enter a number"),
                })?;
                Ok(text
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|n| n.is_finite())
                    .map(FieldValue::Number)
                    .unwrap_or_default())
            }
            FieldKind::Date => self.text_value(&format!("{} (YYYY-MM-DD)", prompt), view),
            FieldKind::Time => self.text_value(&format!("{} (HH:MM)", prompt), view),
            FieldKind::Text | FieldKind::LongText => self.text_value(&prompt, view),
            FieldKind::Location => {
                let text = self.text(&format!("{} (lat,lng)", prompt), view, |s| {
                    parse_location(s).map(|_| ()).ok_or("Enter latitude,longitude")
                })?;
                Ok(text.and_then(|s| parse_location(&s)).unwrap_or_default())
            }
            FieldKind::Attachment => {
                let text = self.text(&format!("{} (file path)", prompt), view, |s| {
                    attachment_from_path(Path::new(s)).map(|_| ())
                })?;
                match text {
                    Some(path) => attachment_from_path(Path::new(&path))
                        .map(FieldValue::Attachment)
                        .map_err(|e| miette::miette!("{}", e)),
                    None => Ok(FieldValue::Empty),
                }
            }
            FieldKind::AttachmentList => {
                let text = self.text(&format!("{} (comma-separated paths)", prompt), view, |s| {
                    split_list(s)
                        .try_for_each(|p| attachment_from_path(Path::new(p)).map(|_| ()))
                })?;
                let Some(text) = text else {
                    return Ok(FieldValue::Empty);
                };
                let files = split_list(&text)
                    .map(|p| attachment_from_path(Path::new(p)).map(FieldValue::Attachment))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| miette::miette!("{}", e))?;
                Ok(FieldValue::List(files))
            }
            FieldKind::Object => {
                let text = self.text(&format!("{} (JSON)", prompt), view, |s| {
                    serde_json::from_str::<serde_json::Value>(s)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })?;
                match text {
                    Some(s) => {
                        let json: serde_json::Value = serde_json::from_str(&s).into_diagnostic()?;
                        FieldValue::from_json(json).into_diagnostic()
                    }
                    None => Ok(FieldValue::Empty),
                }
            }
        }
    }

    fn select<F: FieldId>(
        &self,
        prompt: &str,
        options: &[&str],
        view: &FieldView<'_, F>,
    ) -> Result<FieldValue> {
        let mut items: Vec<&str> = options.to_vec();
        if !view.required {
            items.push(SKIP);
        }
        let default_idx = view
            .value
            .as_str()
            .and_then(|current| items.iter().position(|o| *o == current))
            .unwrap_or(0);

        let selection = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&items)
            .default(default_idx)
            .interact()
            .into_diagnostic()?;

        if items[selection] == SKIP {
            Ok(FieldValue::Empty)
        } else {
            Ok(FieldValue::from(items[selection]))
        }
    }

    fn multi_select<F: FieldId>(
        &self,
        prompt: &str,
        options: &[&str],
        view: &FieldView<'_, F>,
    ) -> Result<FieldValue> {
        let current: Vec<&str> = view
            .value
            .as_list()
            .map(|items| items.iter().filter_map(FieldValue::as_str).collect())
            .unwrap_or_default();
        let defaults: Vec<bool> = options.iter().map(|o| current.contains(o)).collect();

        let chosen = MultiSelect::with_theme(&self.theme)
            .with_prompt(format!("{} (space to toggle)", prompt))
            .items(options)
            .defaults(&defaults)
            .interact()
            .into_diagnostic()?;

        if chosen.is_empty() {
            return Ok(FieldValue::Empty);
        }
        Ok(FieldValue::texts(chosen.into_iter().map(|i| options[i])))
    }

    fn text_value<F: FieldId>(&self, prompt: &str, view: &FieldView<'_, F>) -> Result<FieldValue> {
        let text = self.text(prompt, view, |_| Ok::<(), String>(()))?;
        Ok(text.map(FieldValue::Text).unwrap_or_default())
    }

    /// Free-text input; `None` when left empty
    fn text<F, V, E>(&self, prompt: &str, view: &FieldView<'_, F>, check: V) -> Result<Option<String>>
    where
        F: FieldId,
        V: Fn(&str) -> std::result::Result<(), E>,
        E: ToString,
    {
        let current = view.value.display();
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|s: &String| -> std::result::Result<(), String> {
                if s.trim().is_empty() {
                    return Ok(());
                }
                check(s.trim()).map_err(|e| e.to_string())
            });
        if !current.is_empty() {
            input = input.default(current);
        }

        let value = input.interact_text().into_diagnostic()?;
        let value = value.trim().to_string();
        Ok((!value.is_empty()).then_some(value))
    }
}

/// Format the prompt for a field
fn format_prompt<F: FieldId>(view: &FieldView<'_, F>) -> String {
    if view.required {
        format!("{} *", view.label)
    } else {
        view.label.to_string()
    }
}

fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// `"41.88,-87.63"` into a location object
pub fn parse_location(text: &str) -> Option<FieldValue> {
    let (lat, lng) = text.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(FieldValue::object([
        ("lat", FieldValue::Number(lat)),
        ("lng", FieldValue::Number(lng)),
    ]))
}

/// Attachment metadata for a local file; the file itself is not copied
pub fn attachment_from_path(path: &Path) -> std::result::Result<AttachmentRef, String> {
    let metadata = std::fs::metadata(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    if !metadata.is_file() {
        return Err(format!("{} is not a file", path.display()));
    }
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| format!("{} has no file name", path.display()))?;
    Ok(AttachmentRef::new(filename, metadata.len()))
}
