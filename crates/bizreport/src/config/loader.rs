use std::path::{Path, PathBuf};

use crate::config::reports::{PipelineVariant, ReportSpec};
use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Returns the default config path: `~/.bizreport/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".bizreport").join("config.json"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "database_path must not be empty".to_string(),
        });
    }

    if config.output_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "output_directory must not be empty".to_string(),
        });
    }

    if config.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "poll_interval_secs must be at least 1".to_string(),
        });
    }

    let endpoint = &config.generator.endpoint;
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("generator.endpoint must be an http(s) URL: {}", endpoint),
        });
    }

    // Stage ordering relies on unique report types; the catalogs are static,
    // but check anyway so a bad edit fails at startup rather than mid-job.
    for variant in [PipelineVariant::Essentials, PipelineVariant::Full] {
        validate_reports(&format!("Pipeline '{}'", variant), &variant.specs())?;
    }
    if let Some(reports) = &config.reports {
        validate_reports("Custom report list", reports)?;
    }

    Ok(())
}

fn validate_reports(label: &str, specs: &[ReportSpec]) -> Result<(), ConfigError> {
    if specs.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("{} has no reports", label),
        });
    }
    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        if !crate::sanitize::is_safe_file_stem(&spec.report_type) {
            return Err(ConfigError::Validation {
                message: format!(
                    "{}: report type '{}' is not a valid file name",
                    label, spec.report_type
                ),
            });
        }
        if !seen.insert(spec.report_type.as_str()) {
            return Err(ConfigError::Validation {
                message: format!("{}: Duplicate report type '{}'", label, spec.report_type),
            });
        }
    }
    Ok(())
}
