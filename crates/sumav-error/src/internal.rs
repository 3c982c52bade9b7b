#[derive(Debug, Clone, thiserror::Error)]
pub enum InternalError {
    #[error("internal invariant violated: {0}")]
    InvalidState(String),

    #[error("feature not implemented: {0}")]
    NotImplemented(String),
}
