//! Shared types for the Sentinel classification service: model registry,
//! request/response contracts, and the error taxonomy.

mod error;
pub mod registry;
pub mod request;

pub use error::MlError;
pub use registry::{ModelFormat, ModelRegistry, ModelRegistryEntry};
pub use request::{
    DEFAULT_MODEL_ID, Explainability, Language, PredictInput, PredictRequest, PredictResponse,
    ValidationIssue,
};
