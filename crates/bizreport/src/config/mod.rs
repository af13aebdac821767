pub mod loader;
pub mod reports;
pub mod schema;

pub use loader::{default_config_path, load_config, load_config_from_str};
pub use reports::{PipelineVariant, ReportSpec};
pub use schema::{Config, GeneratorConfig};
