//! Token-graph construction and querying over AV-engine verdict strings.
//!
//! Four components, leaves first: [`tokenizer`] normalizes raw verdicts,
//! [`builder`] produces the persisted graph, [`searcher`] answers
//! representative-token and relation queries against it, and [`store`]
//! defines the narrow storage traits both depend on plus the cozo-backed
//! implementation.

pub mod builder;
pub mod dump;
pub mod error;
pub mod relation;
pub mod searcher;
pub mod store;
pub mod tokenizer;

pub use builder::{BuildReport, Builder};
pub use error::GraphError;
pub use searcher::{Comparison, RelatedTokens, RepresentativeTokenOptions, Searcher, SumavResult};
pub use store::{CozoStore, DetectionStore, GraphStore};
pub use tokenizer::{make_tokens, make_unique_tokens};
