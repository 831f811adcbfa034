/// Error types for the land-cover pipeline
///
/// A run either returns a complete result or one of these. The zero-total
/// percentage fallback is not an error, see `BucketSummary::division_guarded`.
#[derive(Debug, thiserror::Error)]
pub enum ReforestError {
    /// ROI text is not valid JSON. The user must resubmit.
    #[error("Malformed ROI input: {0}")]
    MalformedInput(String),

    /// ROI JSON is valid but `features[0].geometry.coordinates` is unusable.
    #[error("ROI schema error: {0}")]
    Schema(String),

    /// Backend call failed, timed out or answered with something unreadable.
    /// The user may retry the action.
    #[error("Upstream service error: {0}")]
    UpstreamService(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ReforestError {
    /// Whether retrying the same action can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReforestError::UpstreamService(_))
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ReforestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReforestError::UpstreamService(format!("request timed out: {}", err))
        } else {
            ReforestError::UpstreamService(err.to_string())
        }
    }
}

/// Result type for pipeline operations
pub type ReforestResult<T> = Result<T, ReforestError>;
