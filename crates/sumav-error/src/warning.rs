#[derive(Debug, Clone, thiserror::Error)]
pub enum WarningError {
    #[error("verdict value truncated to {max_len} chars: {engine}")]
    TruncatedVerdict { engine: String, max_len: usize },

    #[error("edge probability computation skipped for ({a}, {b}): {reason}")]
    EdgeProbabilitySkipped { a: String, b: String, reason: String },

    #[error("store connection lost, reconnecting: {0}")]
    ReconnectAttempted(String),
}
