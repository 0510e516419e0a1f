//! Core graph data structures and the contribution ledger

mod context;
mod edge;
mod emission;
mod engine;
mod events;
pub mod ledger;
mod node;

pub use context::{Context, ContextId, ContextMetadata};
pub use edge::{Contributions, Edge, EdgeId};
pub use emission::{EdgeUpsert, Emission};
pub use engine::{PlaitEngine, PlaitError, PlaitResult, RetractionResult};
pub use events::{GraphEvent, RemovalReason};
pub use node::{dimension, Node, NodeId, NodeMergePolicy, NodeMetadata, Properties, PropertyValue};
