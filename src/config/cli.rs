use crate::config::{DEFAULT_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS};
use crate::core::pool::default_pool_size;
use crate::core::{ConfigProvider, InputFormat, SourceSpec};
use crate::utils::error::{DataError, Result};
use crate::utils::validation::{
    parse_delimiter, validate_non_empty_string, validate_positive_number, validate_range,
    validate_source_location, Validate,
};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "datadroid")]
#[command(about = "Parse remote or local data sources into records on a worker pool")]
pub struct CliConfig {
    /// URL or file to parse; repeat for several sources
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = InputFormat::Csv)]
    pub format: InputFormat,

    /// CSV delimiter (use \t for tabs)
    #[arg(long, default_value = ",")]
    pub delimiter: String,

    /// Treat the first CSV row as data
    #[arg(long)]
    pub no_headers: bool,

    /// Fields to display, in order; all fields when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Maximum number of sources parsed at once
    #[arg(short, long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Load sources and settings from a TOML file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn sources(&self) -> Vec<SourceSpec> {
        self.sources
            .iter()
            .map(|location| SourceSpec {
                location: location.clone(),
                format: self.format,
                delimiter: self.delimiter.clone(),
                has_headers: !self.no_headers,
            })
            .collect()
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn workers(&self) -> usize {
        self.workers.unwrap_or_else(default_pool_size)
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(DataError::MissingConfigError {
                field: "source".to_string(),
            });
        }
        for location in &self.sources {
            validate_source_location("source", location)?;
        }
        for label in &self.labels {
            validate_non_empty_string("labels", label)?;
        }
        parse_delimiter("delimiter", &self.delimiter)?;
        validate_positive_number("workers", self.workers(), 1)?;
        validate_range("timeout_secs", self.timeout_seconds(), 1, MAX_TIMEOUT_SECONDS)?;
        Ok(())
    }
}
