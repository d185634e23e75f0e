use crate::config::{DEFAULT_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS};
use crate::core::pool::default_pool_size;
use crate::core::{ConfigProvider, SourceSpec};
use crate::utils::error::{DataError, Result};
use crate::utils::validation::{
    parse_delimiter, validate_non_empty_string, validate_positive_number, validate_range,
    validate_source_location, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub binder: BinderConfig,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    pub workers: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinderConfig {
    #[serde(default)]
    pub labels: Vec<String>,
}

impl TomlConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DataError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses the configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DataError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DataError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Command-line values take precedence over the file.
    pub fn apply_overrides(&mut self, workers: Option<usize>, timeout_seconds: Option<u64>) {
        if let Some(workers) = workers {
            self.pool.workers = Some(workers);
        }
        if let Some(timeout) = timeout_seconds {
            self.pool.timeout_seconds = Some(timeout);
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn sources(&self) -> Vec<SourceSpec> {
        self.sources.clone()
    }

    fn labels(&self) -> &[String] {
        &self.binder.labels
    }

    fn workers(&self) -> usize {
        self.pool.workers.unwrap_or_else(default_pool_size)
    }

    fn timeout_seconds(&self) -> u64 {
        self.pool.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(DataError::MissingConfigError {
                field: "sources".to_string(),
            });
        }

        for (i, source) in self.sources.iter().enumerate() {
            let field = format!("sources[{}]", i);
            validate_source_location(&format!("{}.location", field), &source.location)?;
            parse_delimiter(&format!("{}.delimiter", field), &source.delimiter)?;
        }

        for label in &self.binder.labels {
            validate_non_empty_string("binder.labels", label)?;
        }

        validate_positive_number("pool.workers", self.workers(), 1)?;
        validate_range(
            "pool.timeout_seconds",
            self.timeout_seconds(),
            1,
            MAX_TIMEOUT_SECONDS,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InputFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[pool]
workers = 2
timeout_seconds = 10

[binder]
labels = ["importo", "oggetto", "aggiudicatario"]

[[sources]]
location = "https://api.example.com/appalti.csv"
delimiter = ";"

[[sources]]
location = "./local/appalti.json"
format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.workers(), 2);
        assert_eq!(config.timeout_seconds(), 10);
        assert_eq!(config.labels().len(), 3);
        assert_eq!(config.sources[0].format, InputFormat::Csv);
        assert_eq!(config.sources[0].delimiter, ";");
        assert_eq!(config.sources[1].format, InputFormat::Json);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DATADROID_TEST_SOURCE", "https://test.api.com/data.csv");

        let toml_content = r#"
[[sources]]
location = "${DATADROID_TEST_SOURCE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.sources[0].location, "https://test.api.com/data.csv");

        std::env::remove_var("DATADROID_TEST_SOURCE");
    }

    #[test]
    fn test_unset_env_var_is_left_verbatim() {
        let toml_content = r#"
[[sources]]
location = "${DATADROID_SURELY_UNSET_VAR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.sources[0].location, "${DATADROID_SURELY_UNSET_VAR}");
    }

    #[test]
    fn test_config_validation() {
        let no_sources = TomlConfig::from_toml_str("[pool]\nworkers = 1\n").unwrap();
        assert!(matches!(
            no_sources.validate(),
            Err(DataError::MissingConfigError { .. })
        ));

        let bad_delimiter = TomlConfig::from_toml_str(
            r#"
[[sources]]
location = "data.csv"
delimiter = "ab"
"#,
        )
        .unwrap();
        assert!(bad_delimiter.validate().is_err());

        let mut zero_workers = TomlConfig::from_toml_str(
            r#"
[[sources]]
location = "data.csv"
"#,
        )
        .unwrap();
        zero_workers.apply_overrides(Some(0), None);
        assert!(zero_workers.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let result = TomlConfig::from_toml_str("[[sources]\nlocation = 1");
        assert!(matches!(
            result,
            Err(DataError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[[sources]]
location = "https://api.example.com"
format = "lines"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.sources[0].format, InputFormat::Lines);
    }
}
