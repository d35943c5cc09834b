//! Template options and the user's selected value sets.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::InvalidSelection;

/// One declared option of a template: its name and acceptable values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub name: String,
    /// Declared values; the first one is the template default.
    pub choices: Vec<String>,
}

/// The choice-based options a template declares, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSchema {
    entries: Vec<SchemaEntry>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`OptionSchema::push`].
    pub fn with_option<I, S>(mut self, name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(name, choices);
        self
    }

    /// Append an option declaration.
    pub fn push<I, S>(&mut self, name: impl Into<String>, choices: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(SchemaEntry {
            name: name.into(),
            choices: choices.into_iter().map(Into::into).collect(),
        });
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Values the user wants varied, keyed by option name.
///
/// Options absent from the selection (or mapped to an empty list) stay fixed
/// at their default.
pub type Selection = BTreeMap<String, Vec<String>>;

/// A template option together with the values chosen for expansion.
///
/// Invariant: `selected_values` is a non-empty, duplicate-free subset of
/// `available_choices`, kept in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTemplateOption")]
pub struct TemplateOption {
    name: String,
    available_choices: Vec<String>,
    selected_values: Vec<String>,
}

/// Unvalidated wire form; deserialization goes through [`TemplateOption::new`].
#[derive(Deserialize)]
struct RawTemplateOption {
    name: String,
    available_choices: Vec<String>,
    #[serde(default)]
    selected_values: Vec<String>,
}

impl TryFrom<RawTemplateOption> for TemplateOption {
    type Error = InvalidSelection;

    fn try_from(raw: RawTemplateOption) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.available_choices, &raw.selected_values)
    }
}

impl TemplateOption {
    /// An option fixed at its default (first declared) value.
    pub fn fixed(name: impl Into<String>, choices: Vec<String>) -> Result<Self, InvalidSelection> {
        let name = name.into();
        let default = choices
            .first()
            .cloned()
            .ok_or_else(|| InvalidSelection::NoChoices {
                option: name.clone(),
            })?;
        Ok(Self {
            name,
            available_choices: choices,
            selected_values: vec![default],
        })
    }

    /// An option varied over `selected`.
    ///
    /// Every selected value must be among `choices`. Duplicates collapse and
    /// the result follows declaration order. An empty `selected` falls back to
    /// the default.
    pub fn new(
        name: impl Into<String>,
        choices: Vec<String>,
        selected: &[String],
    ) -> Result<Self, InvalidSelection> {
        let name = name.into();
        if choices.is_empty() {
            return Err(InvalidSelection::NoChoices { option: name });
        }
        if selected.is_empty() {
            return Self::fixed(name, choices);
        }

        if let Some(bad) = selected.iter().find(|v| !choices.contains(v)) {
            return Err(InvalidSelection::InvalidValue {
                option: name,
                value: bad.clone(),
                choices,
            });
        }

        let mut seen = HashSet::new();
        let selected_values = choices
            .iter()
            .filter(|c| selected.contains(c) && seen.insert(c.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            name,
            available_choices: choices,
            selected_values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_choices(&self) -> &[String] {
        &self.available_choices
    }

    pub fn selected_values(&self) -> &[String] {
        &self.selected_values
    }

    /// The template default, i.e. the first declared choice.
    pub fn default_value(&self) -> &str {
        &self.available_choices[0]
    }

    /// Whether this option multiplies the combination count.
    pub fn is_varied(&self) -> bool {
        self.selected_values.len() > 1
    }
}

/// Validate `selection` against `schema` and produce one [`TemplateOption`]
/// per schema entry, in schema order.
pub fn build_options(
    schema: &OptionSchema,
    selection: &Selection,
) -> Result<Vec<TemplateOption>, InvalidSelection> {
    if let Some(unknown) = selection.keys().find(|name| schema.get(name).is_none()) {
        return Err(InvalidSelection::UnknownOption {
            option: unknown.clone(),
        });
    }

    let mut names = HashSet::new();
    let mut options = Vec::with_capacity(schema.len());
    for entry in schema.entries() {
        if !names.insert(entry.name.as_str()) {
            return Err(InvalidSelection::DuplicateOption {
                option: entry.name.clone(),
            });
        }
        let option = match selection.get(&entry.name) {
            Some(values) if !values.is_empty() => {
                TemplateOption::new(entry.name.clone(), entry.choices.clone(), values)?
            }
            _ => TemplateOption::fixed(entry.name.clone(), entry.choices.clone())?,
        };
        options.push(option);
    }

    Ok(options)
}

/// A selection that varies every option over all of its declared choices.
pub fn select_all(schema: &OptionSchema) -> Selection {
    schema
        .entries()
        .iter()
        .map(|e| (e.name.clone(), e.choices.clone()))
        .collect()
}
