use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Units offered when nothing has been saved yet: carton, mid-pack.
pub const DEFAULT_UNITS: [&str; 2] = ["카톤", "중포"];

/// Ordered, de-duplicated set of packaging unit labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackagingUnits(Vec<String>);

impl Default for PackagingUnits {
    fn default() -> Self {
        Self(DEFAULT_UNITS.iter().map(|u| u.to_string()).collect())
    }
}

impl PackagingUnits {
    /// Builds a set from labels, trimming them and dropping empties and duplicates.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut units = Self(Vec::new());
        for label in labels {
            let _ = units.add(label.as_ref());
        }
        units
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|u| u == label.trim())
    }

    /// Appends a label. Returns `Ok(false)` when it was already present.
    pub fn add(&mut self, label: &str) -> Result<bool, InputError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(InputError::EmptyUnit);
        }
        if self.contains(label) {
            return Ok(false);
        }
        self.0.push(label.to_string());
        Ok(true)
    }

    /// Removes a label. Returns false when it was not present.
    pub fn remove(&mut self, label: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|u| u != label.trim());
        self.0.len() != before
    }

    /// Removes the label at `index`, returning it.
    pub fn remove_at(&mut self, index: usize) -> Option<String> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    /// Replaces every label at once, as the unit editor does on save.
    ///
    /// Empty input falls back to the defaults so the form always has a unit.
    pub fn replace_all<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let replaced = Self::from_labels(labels);
        *self = if replaced.is_empty() {
            Self::default()
        } else {
            replaced
        };
    }
}
