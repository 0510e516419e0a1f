//! Producer layer
//!
//! Adapters transform domain-specific input into emissions; enrichments
//! react to committed events with derived evidence. Both commit through the
//! same path, keyed by their producer id.

mod commit;
pub mod cooccurrence;
pub mod edge_list;
mod enrichment;
mod enrichment_loop;
mod error;
mod ingest;
pub mod provenance;
mod registry;
mod scheduler;
mod traits;
mod types;

pub use commit::commit_emission;
pub use cooccurrence::CoOccurrenceEnrichment;
pub use edge_list::{EdgeListAdapter, EdgeListInput, EdgeSpec, NodeSpec, EDGE_LIST_KIND};
pub use enrichment::{Enrichment, EnrichmentRegistry, DEFAULT_MAX_ROUNDS};
pub use enrichment_loop::{run_enrichment_loop, LoopOutcome};
pub use error::AdapterError;
pub use ingest::{IngestOutcome, IngestPipeline};
pub use registry::AdapterRegistry;
pub use scheduler::{BackgroundScheduler, StagePayload};
pub use traits::Adapter;
pub use types::{AdapterInput, OutboundEvent, Processed};
