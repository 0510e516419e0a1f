//! Plait: Contribution Graph Engine
//!
//! A live knowledge-graph engine that accumulates evidence from many
//! independent producers into one weighted graph.
//!
//! # Core Concepts
//!
//! - **Contexts**: isolated, named graph partitions
//! - **Contributions**: every edge records one value per producer; the
//!   edge's raw weight is the sum of each producer's value after min–max
//!   normalization over that producer's own range
//! - **Emissions**: one producer's atomic batch of proposed changes
//! - **Enrichments**: reactive producers run to a fixed point after ingest
//!
//! # Example
//!
//! ```
//! use plait::{Emission, EdgeUpsert, Node, NodeId, PlaitEngine};
//!
//! let engine = PlaitEngine::new();
//! let ctx = engine.create_context("notes").unwrap();
//! let emission = Emission::new()
//!     .with_node(Node::new("A", "concept"))
//!     .with_node(Node::new("B", "concept"))
//!     .with_edge(EdgeUpsert::new("A", "B", "related_to", 5.0));
//! engine.commit(&ctx, "X", emission).unwrap();
//!
//! let snapshot = engine.get_context(&ctx).unwrap();
//! let edge = snapshot.find_edge(&NodeId::from("A"), "related_to", &NodeId::from("B")).unwrap();
//! assert_eq!(edge.raw_weight, 1.0);
//! ```

pub mod adapter;
pub mod api;
pub mod config;
mod graph;
pub mod query;
pub mod storage;

pub use adapter::{
    Adapter, AdapterError, AdapterInput, AdapterRegistry, BackgroundScheduler, CoOccurrenceEnrichment,
    EdgeListAdapter, EdgeListInput, Enrichment, EnrichmentRegistry, IngestOutcome, IngestPipeline,
    OutboundEvent, Processed,
};
pub use api::{ContextInfo, PlaitApi};
pub use config::{ConfigError, EngineConfig};
pub use graph::{
    dimension, ledger, Context, ContextId, ContextMetadata, Contributions, Edge, EdgeId, EdgeUpsert,
    Emission, GraphEvent, Node, NodeId, NodeMergePolicy, NodeMetadata, PlaitEngine, PlaitError,
    PlaitResult, Properties, PropertyValue, RemovalReason, RetractionResult,
};
pub use query::{
    evidence_trail, CompositeQuery, Direction, EvidenceTrailResult, FindQuery, QueryResult, StepQuery,
    StepResult,
};
pub use storage::{EdgeRecord, GraphStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
