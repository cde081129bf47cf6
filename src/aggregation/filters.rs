//! Frontend-only filter overlay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::{category, Record};

/// Active filters: field name → accepted values.
///
/// A record passes when, for every field with a non-empty value list, its
/// value for that field is one of the accepted values. Fields with an empty
/// list impose nothing, and an empty set lets every record through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    fields: BTreeMap<String, Vec<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSet::set`].
    pub fn with<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(field, values);
        self
    }

    /// Replaces the accepted values for `field`.
    pub fn set<I, S>(&mut self, field: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.into().trim().to_string())
            .collect();
        self.fields.insert(field.to_string(), values);
    }

    pub fn clear(&mut self, field: &str) {
        self.fields.remove(field);
    }

    /// True when no field constrains anything.
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Vec::is_empty)
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .filter(|(_, accepted)| !accepted.is_empty())
            .all(|(field, accepted)| {
                category(record, field)
                    .map_or(false, |value| accepted.iter().any(|a| a.trim() == value))
            })
    }

    /// Records that pass, in input order. The input is left untouched.
    pub fn apply<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        records.iter().filter(move |record| self.matches(record))
    }
}
