use thiserror::Error;

/// Failures that can occur inside the prediction path.
///
/// None of these escape the prediction handler as raw errors: they are
/// converted into an error-shaped [`PredictResponse`](crate::PredictResponse)
/// at the handler boundary. The distinction matters for logging and for the
/// HTTP-equivalent status a host would map them to.
#[derive(Debug, Error)]
pub enum MlError {
    /// Unknown model identifier. A request error, not a server error.
    #[error("Model {0} not found")]
    NotFound(String),

    /// Registry/vocabulary mismatch. Indicates a deployment bug and is
    /// logged loudly; the caller sees a generic failure message.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The inference backend failed to initialize or run.
    #[error("inference backend error: {0}")]
    Backend(String),

    /// The backend produced outputs that violate its contract, e.g. the
    /// expected `logits` tensor is missing.
    #[error("backend contract violation: {0}")]
    Contract(String),

    /// The inference call exceeded its deadline.
    #[error("inference timed out after {0} ms")]
    Timeout(u64),
}
