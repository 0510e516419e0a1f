//! Query system for plait contexts
//!
//! Read-only: finds nodes and runs typed multi-hop traversals against a
//! context snapshot. Queries read contributions but never write them.

mod composite;
mod find;
mod step;
mod types;

pub use composite::{evidence_trail, CompositeQuery, CompositeResult, EvidenceTrailResult};
pub use find::{FindQuery, NodeFilter};
pub use step::{Step, StepQuery, StepResult};
pub use types::{Direction, QueryResult, StepLevel};
