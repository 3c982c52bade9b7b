#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("tokenizer error: {message}")]
    Tokenizer { message: String },

    #[error("graph build error: {message}")]
    Build { message: String },

    #[error("graph search error: {message}")]
    Search { message: String },

    #[error("evaluator error: {message}")]
    Eval { message: String },

    #[error("store error: {message}")]
    Store { message: String },
}
