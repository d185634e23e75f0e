pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::TomlConfig;

pub use core::{
    binder::{ListBinder, Row},
    engine::{ParseEngine, SourceOutcome},
    parsers::{CsvParser, FormatParser, JsonParser, LineParser},
    pool::WorkerPool,
    source::{source_to_stream, ByteStream, Source},
    task::ParseTask,
};
pub use domain::model::{InputFormat, Record, RecordList, SourceSpec, TaskStatus};
pub use domain::ports::{Bindable, ConfigProvider, DataParser};
pub use utils::error::{DataError, Result};
