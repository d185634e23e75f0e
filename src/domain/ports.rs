use crate::domain::model::{Record, SourceSpec};
use crate::utils::error::Result;
use std::io::Read;

/// A parsing strategy: turns a whole byte stream into an ordered list of records.
///
/// Implementations run on a blocking worker thread and may read synchronously.
/// A failure anywhere in the stream must be returned as an error; partial
/// lists are never observable by callers of the task.
pub trait DataParser: Send + Sync + 'static {
    type Record: Send + Sync + 'static;

    fn parse(&self, input: &mut dyn Read) -> Result<Vec<Self::Record>>;

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// A record that can fill display labels.
pub trait Bindable {
    fn field(&self, label: &str) -> Option<String>;
}

impl Bindable for Record {
    fn field(&self, label: &str) -> Option<String> {
        self.data.get(label).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

pub trait ConfigProvider: Send + Sync {
    fn sources(&self) -> Vec<SourceSpec>;
    fn labels(&self) -> &[String];
    fn workers(&self) -> usize;
    fn timeout_seconds(&self) -> u64;
}
