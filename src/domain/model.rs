use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// A dynamically shaped record: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

/// The complete, ordered output of one parse.
///
/// Produced once and never mutated afterwards; clones share the same storage.
#[derive(Debug)]
pub struct RecordList<R> {
    records: Arc<[R]>,
}

impl<R> RecordList<R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when both lists are views of the same produced result.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl<R> Clone for RecordList<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R> From<Vec<R>> for RecordList<R> {
    fn from(records: Vec<R>) -> Self {
        Self {
            records: Arc::from(records),
        }
    }
}

impl<R> Deref for RecordList<R> {
    type Target = [R];

    fn deref(&self) -> &[R] {
        &self.records
    }
}

impl<'a, R> IntoIterator for &'a RecordList<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Csv,
    Json,
    Lines,
}

/// Where a parse task is in its lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    Running,
    Completed,
    Failed,
}

/// One configured input: its location plus how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub location: String,
    #[serde(default)]
    pub format: InputFormat,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_has_headers() -> bool {
    true
}

impl SourceSpec {
    pub fn new(location: impl Into<String>, format: InputFormat) -> Self {
        Self {
            location: location.into(),
            format,
            delimiter: default_delimiter(),
            has_headers: default_has_headers(),
        }
    }
}
