use std::backtrace::Backtrace;
use std::path::PathBuf;

use super::*;

#[derive(Debug)]
pub struct ErrorContext {
    pub file_path: PathBuf,
    pub note: Option<String>,
    pub backtrace: Option<Backtrace>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContextualError {
    #[error("{source}\nContext: {context:?}")]
    WithContext {
        #[source]
        source: Box<Error>,
        context: ErrorContext,
    },
}

impl Clone for ContextualError {
    fn clone(&self) -> Self {
        match self {
            ContextualError::WithContext { source, context } => ContextualError::WithContext {
                source: source.clone(),
                context: ErrorContext {
                    file_path: context.file_path.clone(),
                    note: context.note.clone(),
                    backtrace: None,
                },
            },
        }
    }
}

impl ErrorContext {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            note: None,
            backtrace: Some(Backtrace::capture()),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Attach a file-path context to a fallible operation.
pub trait ContextExt<T> {
    fn with_file_context(self, file_path: PathBuf) -> Result<T, ContextualError>;
}

impl<T, E: Into<Error>> ContextExt<T> for std::result::Result<T, E> {
    fn with_file_context(self, file_path: PathBuf) -> Result<T, ContextualError> {
        self.map_err(|e| ContextualError::WithContext {
            source: Box::new(e.into()),
            context: ErrorContext::new(file_path),
        })
    }
}
