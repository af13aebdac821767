use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, PipelineVariant, ReportSpec};

pub struct PipelineConfig {
    pub output_directory: PathBuf,
    /// Used for jobs that did not pin a variant at enqueue time.
    pub default_variant: PipelineVariant,
    /// Pause between stages. Not applied after the last stage.
    pub stage_delay: Duration,
    pub write_report_rows: bool,
    /// Replaces the catalog for every variant when set.
    pub reports: Option<Vec<ReportSpec>>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_directory: PathBuf::from(crate::secrets::expand_home(&config.output_directory)),
            default_variant: config.pipeline,
            stage_delay: Duration::from_millis(config.stage_delay_ms),
            write_report_rows: config.write_report_rows,
            reports: config.reports.clone(),
        }
    }

    /// The ordered report list a job of `variant` runs.
    pub fn specs_for(&self, variant: PipelineVariant) -> Vec<ReportSpec> {
        match &self.reports {
            Some(reports) => reports.clone(),
            None => variant.specs(),
        }
    }
}
