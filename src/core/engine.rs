use crate::core::binder::ListBinder;
use crate::core::parsers::FormatParser;
use crate::core::pool::WorkerPool;
use crate::core::source::Source;
use crate::core::task::ParseTask;
use crate::domain::model::{Record, RecordList, SourceSpec};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use reqwest::Client;
use std::collections::BTreeSet;
use std::time::Duration;

/// The result of parsing one configured source.
#[derive(Debug)]
pub struct SourceOutcome {
    pub location: String,
    pub result: Result<RecordList<Record>>,
}

impl SourceOutcome {
    /// Binds the parsed records; with no explicit labels, every field seen is used, sorted.
    pub fn binder(&self, labels: &[String]) -> Option<ListBinder<Record>> {
        let records = self.result.as_ref().ok()?.clone();
        let labels = if labels.is_empty() {
            all_fields(&records)
        } else {
            labels.to_vec()
        };
        Some(ListBinder::new(records, labels))
    }
}

pub struct ParseEngine<C: ConfigProvider> {
    config: C,
}

impl<C: ConfigProvider> ParseEngine<C> {
    pub fn new(config: C) -> Self {
        Self { config }
    }

    /// Starts one task per source on a shared pool, then collects them in order.
    ///
    /// A source that fails does not stop the others.
    pub async fn run(&self) -> Result<Vec<SourceOutcome>> {
        let sources = self.config.sources();
        tracing::info!(
            sources = sources.len(),
            workers = self.config.workers(),
            "Starting parse run"
        );

        let pool = WorkerPool::new(self.config.workers())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds()))
            .build()?;

        let mut pending = Vec::with_capacity(sources.len());
        for spec in sources {
            let started = start_task(&spec, &pool, &client);
            if let Err(e) = &started {
                tracing::warn!(source = %spec.location, error = %e, "Could not start parser");
            }
            pending.push((spec.location, started));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (location, started) in pending {
            let result = match started {
                Ok(mut task) => task.retrieve().await,
                Err(e) => Err(e),
            };
            match &result {
                Ok(records) => {
                    tracing::info!(source = %location, records = records.len(), "Parsed source")
                }
                Err(e) => tracing::error!(source = %location, error = %e, "Source failed"),
            }
            outcomes.push(SourceOutcome { location, result });
        }

        Ok(outcomes)
    }
}

fn start_task(
    spec: &SourceSpec,
    pool: &WorkerPool,
    client: &Client,
) -> Result<ParseTask<FormatParser>> {
    let parser = FormatParser::from_spec(spec)?;
    let source = Source::from_location(&spec.location)?;
    let mut task = ParseTask::with_client(parser, source, pool, client.clone());
    task.execute()?;
    Ok(task)
}

fn all_fields(records: &RecordList<Record>) -> Vec<String> {
    records
        .iter()
        .flat_map(|record| record.data.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
