pub mod gateway;
pub mod normalizer;
pub mod satisfaction;
pub mod service;
pub mod validator;

pub use gateway::{ArtifactState, ModelRegistry};
pub use service::InferenceService;
