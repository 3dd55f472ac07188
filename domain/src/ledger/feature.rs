//! Feature ledger entries and their mutation rules

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the ledger's append-and-flip-only contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger entries cannot be removed (had {had}, update has {got})")]
    EntryRemoved { had: usize, got: usize },

    #[error("Ledger entry {index} changed field '{field}'; only 'passes' may change")]
    FrozenFieldChanged { index: usize, field: &'static str },

    #[error("No ledger entry at index {0}")]
    UnknownEntry(usize),
}

/// One feature tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub passes: bool,
}

impl FeatureEntry {
    pub fn new(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            steps: Vec::new(),
            passes: false,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    fn frozen_difference(&self, other: &FeatureEntry) -> Option<&'static str> {
        if self.category != other.category {
            Some("category")
        } else if self.description != other.description {
            Some("description")
        } else if self.steps != other.steps {
            Some("steps")
        } else {
            None
        }
    }
}

/// Ordered feature list. Entries can be appended; existing entries can only
/// have `passes` flipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureLedger {
    entries: Vec<FeatureEntry>,
}

impl FeatureLedger {
    pub fn new(entries: Vec<FeatureEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passing(&self) -> usize {
        self.entries.iter().filter(|e| e.passes).count()
    }

    pub fn append(&mut self, entry: FeatureEntry) {
        self.entries.push(entry);
    }

    pub fn set_passes(&mut self, index: usize, passes: bool) -> Result<(), LedgerError> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(LedgerError::UnknownEntry(index))?;
        entry.passes = passes;
        Ok(())
    }

    /// Position of the first entry with this exact description.
    pub fn find(&self, description: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.description == description)
    }

    /// Accept a rewritten ledger only if it keeps every existing entry in
    /// place with unchanged frozen fields. New entries may follow.
    pub fn check_update(&self, proposed: &FeatureLedger) -> Result<(), LedgerError> {
        if proposed.entries.len() < self.entries.len() {
            return Err(LedgerError::EntryRemoved {
                had: self.entries.len(),
                got: proposed.entries.len(),
            });
        }
        for (index, (old, new)) in self.entries.iter().zip(&proposed.entries).enumerate() {
            if let Some(field) = old.frozen_difference(new) {
                return Err(LedgerError::FrozenFieldChanged { index, field });
            }
        }
        Ok(())
    }
}
