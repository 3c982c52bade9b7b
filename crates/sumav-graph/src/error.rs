//! Error types for sumav-graph.

use std::panic::Location;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("cozo error: {0}")]
    Cozo(String),

    #[error("cozo script `{query_name}` failed at {file}:{line}:{column}: {message}")]
    CozoQuery {
        query_name: &'static str,
        message: String,
        file: &'static str,
        line: u32,
        column: u32,
    },

    #[error("sumav graph does not exist: no nodes are loaded")]
    GraphNotLoaded,

    #[error("token not found in graph: {0}")]
    TokenNotFound(String),

    #[error("hash not found in detection store: {0}")]
    HashNotFound(String),

    #[error("invalid query construction: {0}")]
    QueryConstruction(String),
}

impl GraphError {
    #[track_caller]
    pub fn cozo_with_callsite(query_name: &'static str, message: String) -> Self {
        let caller: &'static Location<'static> = Location::caller();
        Self::CozoQuery {
            query_name,
            message,
            file: caller.file(),
            line: caller.line(),
            column: caller.column(),
        }
    }
}

impl From<cozo::Error> for GraphError {
    fn from(value: cozo::Error) -> Self {
        let msg = value.to_string();
        tracing::trace!("cozo error: {msg}");
        Self::Cozo(msg)
    }
}

impl From<GraphError> for sumav_error::Error {
    fn from(value: GraphError) -> Self {
        sumav_error::DomainError::Store {
            message: value.to_string(),
        }
        .into()
    }
}
