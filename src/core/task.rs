//! Asynchronous parse tasks.
//!
//! A [`ParseTask`] pairs a [`Source`] with a [`DataParser`] and runs the parse
//! on a [`WorkerPool`]. The lifecycle is `Created -> Running -> Completed | Failed`;
//! terminal states are absorbing, so retrieving twice yields the same list or
//! the same error. Parse failures are logged at the task boundary and always
//! handed back to the caller.

use crate::core::pool::WorkerPool;
use crate::core::source::Source;
use crate::domain::model::{RecordList, TaskStatus};
use crate::domain::ports::DataParser;
use crate::utils::error::{DataError, Result};
use futures::FutureExt;
use reqwest::Client;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

enum State<R> {
    Created,
    Running(JoinHandle<Result<Vec<R>>>),
    Completed(RecordList<R>),
    Failed(Arc<DataError>),
}

pub struct ParseTask<P: DataParser> {
    parser: Arc<P>,
    source: Option<Source>,
    pool: WorkerPool,
    client: Option<Client>,
    progress: watch::Sender<u64>,
    state: State<P::Record>,
}

impl<P: DataParser> ParseTask<P> {
    /// URL sources get a default HTTP client when the task runs.
    pub fn new(parser: P, source: impl Into<Source>, pool: &WorkerPool) -> Self {
        Self::build(parser, source.into(), pool, None)
    }

    /// Uses `client` for URL sources, so tasks can share connection pools and timeouts.
    pub fn with_client(
        parser: P,
        source: impl Into<Source>,
        pool: &WorkerPool,
        client: Client,
    ) -> Self {
        Self::build(parser, source.into(), pool, Some(client))
    }

    fn build(parser: P, source: Source, pool: &WorkerPool, client: Option<Client>) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            parser: Arc::new(parser),
            source: Some(source),
            pool: pool.clone(),
            client,
            progress,
            state: State::Created,
        }
    }

    pub fn name(&self) -> &str {
        self.parser.name()
    }

    pub fn status(&self) -> TaskStatus {
        match self.state {
            State::Created => TaskStatus::Created,
            State::Running(_) => TaskStatus::Running,
            State::Completed(_) => TaskStatus::Completed,
            State::Failed(_) => TaskStatus::Failed,
        }
    }

    /// Bytes consumed by the parser so far.
    pub fn progress(&self) -> watch::Receiver<u64> {
        self.progress.subscribe()
    }

    /// Schedules the parse on the pool and returns immediately.
    pub fn execute(&mut self) -> Result<()> {
        let source = match (&self.state, self.source.take()) {
            (State::Created, Some(source)) => source,
            _ => {
                return Err(DataError::AlreadyStarted {
                    parser: self.name().to_string(),
                })
            }
        };

        let parser = Arc::clone(&self.parser);
        let client = self.client.clone();
        let progress = self.progress.clone();

        tracing::debug!(parser = %self.name(), source = ?source, "Scheduling parser");
        let handle = self
            .pool
            .submit(run_parser(parser, source, client, progress));
        self.state = State::Running(handle);
        Ok(())
    }

    /// Waits for the parse to finish and returns its records.
    ///
    /// Cancel-safe: dropping the returned future leaves the task running, and
    /// a later call picks up where this one stopped.
    pub async fn retrieve(&mut self) -> Result<RecordList<P::Record>> {
        let outcome = match &mut self.state {
            State::Created => {
                return Err(DataError::NotStarted {
                    parser: self.name().to_string(),
                })
            }
            State::Completed(records) => return Ok(records.clone()),
            State::Failed(err) => {
                let err = Arc::clone(err);
                return Err(self.wrap(&err));
            }
            State::Running(handle) => handle.await,
        };
        self.finish(outcome)
    }

    /// Like [`retrieve`](Self::retrieve), but gives up after `timeout`.
    /// The task keeps running and can still be retrieved afterwards.
    pub async fn retrieve_timeout(&mut self, timeout: Duration) -> Result<RecordList<P::Record>> {
        match tokio::time::timeout(timeout, self.retrieve()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(parser = %self.name(), waited = ?timeout, "Stopped waiting for parser");
                Err(DataError::Interrupted {
                    parser: self.name().to_string(),
                    waited: timeout,
                })
            }
        }
    }

    /// Non-blocking poll: `None` until the task has finished.
    pub fn try_retrieve(&mut self) -> Option<Result<RecordList<P::Record>>> {
        let outcome = match &mut self.state {
            State::Created => {
                return Some(Err(DataError::NotStarted {
                    parser: self.name().to_string(),
                }))
            }
            State::Completed(records) => return Some(Ok(records.clone())),
            State::Failed(err) => {
                let err = Arc::clone(err);
                return Some(Err(self.wrap(&err)));
            }
            // a finished handle must not read as pending because the caller's coop budget is spent
            State::Running(handle) if handle.is_finished() => {
                tokio::task::unconstrained(handle).now_or_never()?
            }
            State::Running(_) => return None,
        };
        Some(self.finish(outcome))
    }

    pub async fn execute_and_retrieve(&mut self) -> Result<RecordList<P::Record>> {
        self.execute()?;
        self.retrieve().await
    }

    fn finish(
        &mut self,
        outcome: std::result::Result<Result<Vec<P::Record>>, JoinError>,
    ) -> Result<RecordList<P::Record>> {
        let outcome = outcome.map_err(|e| self.join_failure(e)).and_then(|r| r);
        match outcome {
            Ok(records) => {
                let records = RecordList::from(records);
                tracing::info!(parser = %self.name(), records = records.len(), "Parser finished");
                self.state = State::Completed(records.clone());
                Ok(records)
            }
            Err(e) => {
                tracing::debug!(parser = %self.name(), error = %e, "Retrieved failed parser");
                let err = Arc::new(e);
                let wrapped = self.wrap(&err);
                self.state = State::Failed(err);
                Err(wrapped)
            }
        }
    }

    fn wrap(&self, err: &Arc<DataError>) -> DataError {
        DataError::execution(self.name(), Arc::clone(err))
    }

    fn join_failure(&self, err: JoinError) -> DataError {
        let message = if err.is_cancelled() {
            "worker was cancelled".to_string()
        } else {
            panic_message(err.into_panic())
        };
        tracing::error!(parser = %self.name(), error = %message, "Parser worker died");
        DataError::WorkerPanicked {
            parser: self.name().to_string(),
            message,
        }
    }
}

/// Runs on the pool. Failures are logged here, whether or not anyone retrieves them.
async fn run_parser<P: DataParser>(
    parser: Arc<P>,
    source: Source,
    client: Option<Client>,
    progress: watch::Sender<u64>,
) -> Result<Vec<P::Record>> {
    let name = parser.name().to_string();
    let result = parse_source(parser, source, client, progress).await;
    if let Err(e) = &result {
        tracing::error!(parser = %name, error = %e, "Exception caught during parser");
    }
    result
}

async fn parse_source<P: DataParser>(
    parser: Arc<P>,
    source: Source,
    client: Option<Client>,
    progress: watch::Sender<u64>,
) -> Result<Vec<P::Record>> {
    let reader = source.open(client.as_ref()).await?;
    let name = parser.name().to_string();
    let blocking = tokio::task::spawn_blocking(move || {
        tracing::debug!(parser = %parser.name(), "Started parser");
        let mut reader = ProgressReader::new(reader, progress);
        parser.parse(&mut reader)
    });

    match blocking.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(DataError::WorkerPanicked {
            parser: name,
            message: panic_message(e.into_panic()),
        }),
        Err(_) => Err(DataError::PoolClosed),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Counts bytes as the parser pulls them and publishes the running total.
struct ProgressReader<R> {
    inner: R,
    read: u64,
    progress: watch::Sender<u64>,
}

impl<R: Read> ProgressReader<R> {
    fn new(inner: R, progress: watch::Sender<u64>) -> Self {
        Self {
            inner,
            read: 0,
            progress,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.read += n as u64;
            self.progress.send_replace(self.read);
        }
        Ok(n)
    }
}
