use serde::{Deserialize, Serialize};

use super::reports::{PipelineVariant, ReportSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub database_path: String,
    pub output_directory: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_stage_delay_ms")]
    pub stage_delay_ms: u64,
    #[serde(default = "default_claim_timeout_secs")]
    pub claim_timeout_secs: u64,
    #[serde(default)]
    pub pipeline: PipelineVariant,
    #[serde(default = "default_true")]
    pub write_report_rows: bool,
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Custom report list run for every job instead of the variant catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports: Option<Vec<ReportSpec>>,
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_stage_delay_ms() -> u64 {
    2000
}

fn default_claim_timeout_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

/// Settings for the OpenAI-compatible content generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
        }
    }
}
