pub mod app_config;
pub mod cli;

pub use app_config::{AppConfig, ConfigError, DedupPolicy, TroublePolicy};
pub use cli::{Cli, RunMode};
