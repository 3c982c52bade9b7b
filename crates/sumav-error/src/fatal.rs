// crates/sumav-error/src/fatal.rs
#[derive(Debug, Clone, thiserror::Error)]
pub enum FatalError {
    #[error("store corruption detected: {0}")]
    StoreCorruption(String),
    #[error("build transaction aborted and could not be rolled back: {0}")]
    BuildTransactionFailed(String),
}
