//! Shared data types, identifiers, and configuration used by every sumav crate.

pub mod config;
pub mod hash;
pub mod ids;
pub mod types;

pub use config::Config;
pub use hash::{Md5Hash, Sha256Hash};
pub use ids::{DetectionId, EdgeId, NodeId};
pub use types::{Detection, Relation, TokenEdge, TokenNode};
