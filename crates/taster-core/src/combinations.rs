//! Combinatorial expansion of selected option values.
//!
//! Ordering convention: the leftmost option varies slowest (odometer order),
//! and each option's values appear in `selected_values` order. With options
//! `[color: red, blue] [size: S, M]` the output is
//! `red/S, red/M, blue/S, blue/M`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::TemplateOption;

/// One fully-resolved assignment of a value to every template option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(BTreeMap<String, String>);

impl Combination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, option: impl Into<String>, value: impl Into<String>) {
        self.0.insert(option.into(), value.into());
    }

    /// Value chosen for `option`, if the option exists.
    pub fn get(&self, option: &str) -> Option<&str> {
        self.0.get(option).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Combination {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Number of combinations [`generate`] will produce, without building them.
///
/// Saturates at `usize::MAX`.
pub fn combination_count(options: &[TemplateOption]) -> usize {
    options
        .iter()
        .map(|o| o.selected_values().len().max(1))
        .fold(1usize, |acc, n| acc.saturating_mul(n))
}

/// Upper bound on up-front allocation; larger products grow on demand.
const MAX_PREALLOCATED: usize = 1 << 16;

fn initial_capacity(options: &[TemplateOption]) -> usize {
    combination_count(options).min(MAX_PREALLOCATED)
}

/// Cartesian product of every option's selected values.
///
/// Always returns at least one combination: when no option is varied the
/// single result holds every option's fixed value.
pub fn generate(options: &[TemplateOption]) -> Vec<Combination> {
    let radices: Vec<usize> = options.iter().map(|o| o.selected_values().len()).collect();
    if radices.iter().any(|&r| r == 0) {
        return Vec::new();
    }

    let mut combinations: Vec<Combination> = Vec::with_capacity(initial_capacity(options));
    let mut digits = vec![0usize; options.len()];

    loop {
        combinations.push(
            options
                .iter()
                .zip(&digits)
                .map(|(option, &d)| (option.name(), option.selected_values()[d].as_str()))
                .collect(),
        );

        // Advance the rightmost digit, carrying leftwards.
        let mut pos = digits.len();
        loop {
            if pos == 0 {
                return combinations;
            }
            pos -= 1;
            digits[pos] += 1;
            if digits[pos] < radices[pos] {
                break;
            }
            digits[pos] = 0;
        }
    }
}
