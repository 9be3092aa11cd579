//! Static region table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intake::sanitize::REGION_MAX;

/// A region as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionEntry {
    /// Human-readable label submitted by the form.
    pub label: String,
    /// Ascii identifier used as the storage partition.
    pub key: String,
    /// Character prepended to the sequence number.
    pub prefix: char,
}

/// A resolved region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub label: String,
    pub key: String,
    pub prefix: char,
}

impl Region {
    /// Compose the display ID for a sequence number in this region.
    pub fn id_for(&self, sequence: u64) -> String {
        format!("{}{}", self.prefix, sequence)
    }
}

/// Errors detected while building a region table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionTableError {
    #[error("region table is empty")]
    Empty,

    #[error("duplicate region label: {0}")]
    DuplicateLabel(String),

    #[error("duplicate region key: {0}")]
    DuplicateKey(String),

    /// Keys become directory names and table rows, so they stay ascii.
    #[error("region key {0:?} must be non-empty ascii alphanumerics, '-' or '_'")]
    InvalidKey(String),

    #[error("region label must not be empty (key {0})")]
    EmptyLabel(String),

    /// Submitted labels are trimmed and cut to `REGION_MAX` characters, so
    /// this label could never match one.
    #[error("region label {0:?} has surrounding whitespace or exceeds the region field limit")]
    UnreachableLabel(String),
}

/// The built-in Saudi administrative regions.
const BUILTIN_REGIONS: &[(&str, &str, char)] = &[
    ("منطقة الرياض", "riyadh", 'ر'),
    ("منطقة مكة المكرمة", "makkah", 'م'),
    ("منطقة المدينة المنورة", "madinah", 'م'),
    ("منطقة القصيم", "qassim", 'ق'),
    ("المنطقة الشرقية", "eastern", 'ش'),
    ("منطقة عسير", "asir", 'ع'),
    ("منطقة تبوك", "tabuk", 'ت'),
    ("منطقة حائل", "hail", 'ح'),
    ("منطقة الحدود الشمالية", "northern", 'ح'),
    ("منطقة جازان", "jazan", 'ج'),
    ("منطقة نجران", "najran", 'ن'),
    ("منطقة الباحة", "bahah", 'ب'),
    ("منطقة الجوف", "jouf", 'ج'),
];

/// Immutable label → region lookup.
#[derive(Debug, Clone)]
pub struct RegionTable {
    regions: Vec<Region>,
    by_label: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
}

impl RegionTable {
    /// The table shipped with the service.
    pub fn builtin() -> Self {
        let entries = BUILTIN_REGIONS
            .iter()
            .map(|(label, key, prefix)| RegionEntry {
                label: (*label).to_string(),
                key: (*key).to_string(),
                prefix: *prefix,
            })
            .collect::<Vec<_>>();

        Self::build(entries).expect("built-in region table is valid")
    }

    /// Build a table from configured entries, or the built-in table when none are given.
    pub fn from_config(entries: &[RegionEntry]) -> Result<Self, RegionTableError> {
        if entries.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::build(entries.to_vec())
        }
    }

    /// Build a table from explicit entries.
    pub fn build(entries: Vec<RegionEntry>) -> Result<Self, RegionTableError> {
        if entries.is_empty() {
            return Err(RegionTableError::Empty);
        }

        let mut regions = Vec::with_capacity(entries.len());
        let mut by_label = HashMap::with_capacity(entries.len());
        let mut by_key = HashMap::with_capacity(entries.len());

        for entry in entries {
            if !is_valid_key(&entry.key) {
                return Err(RegionTableError::InvalidKey(entry.key));
            }
            if entry.label.is_empty() {
                return Err(RegionTableError::EmptyLabel(entry.key));
            }
            if entry.label.trim() != entry.label || entry.label.chars().count() > REGION_MAX {
                return Err(RegionTableError::UnreachableLabel(entry.label));
            }
            if by_label.contains_key(&entry.label) {
                return Err(RegionTableError::DuplicateLabel(entry.label));
            }
            if by_key.contains_key(&entry.key) {
                return Err(RegionTableError::DuplicateKey(entry.key));
            }

            let idx = regions.len();
            by_label.insert(entry.label.clone(), idx);
            by_key.insert(entry.key.clone(), idx);
            regions.push(Region {
                label: entry.label,
                key: entry.key,
                prefix: entry.prefix,
            });
        }

        Ok(Self {
            regions,
            by_label,
            by_key,
        })
    }

    /// Look up a region by its exact label.
    pub fn resolve(&self, label: &str) -> Option<&Region> {
        self.by_label.get(label).map(|&idx| &self.regions[idx])
    }

    /// Look up a region by its storage key.
    pub fn by_key(&self, key: &str) -> Option<&Region> {
        self.by_key.get(key).map(|&idx| &self.regions[idx])
    }

    /// Regions in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
