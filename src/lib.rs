pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::loader::ArtifactLoader;
pub use app::{build_router, start_server};
pub use config::ServiceConfig;
pub use core::{InferenceService, ModelRegistry};
pub use utils::error::{Result, ServiceError};
