//! Adapter trait: the bidirectional integration contract
//!
//! Inbound: transforms domain-specific input into an emission via process().
//! Outbound: transforms raw graph events into domain-meaningful events via transform_events().

use super::error::AdapterError;
use super::types::{AdapterInput, OutboundEvent, Processed};
use crate::graph::{Context, GraphEvent};
use async_trait::async_trait;

/// The bidirectional integration contract.
///
/// An adapter declares the input kind it consumes and turns that input into
/// at most one emission per call. Its `id()` is the producer id under which
/// its edge contributions are recorded.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Unique identifier for this adapter (its producer id)
    fn id(&self) -> &str;

    /// What kind of input this adapter consumes
    fn input_kind(&self) -> &str;

    /// Inbound: turn input into proposed graph changes.
    ///
    /// The adapter downcasts `input.data` internally. If the downcast fails,
    /// return `Err(AdapterError::InvalidInput)`. Return `Processed::Skipped`
    /// when an optional dependency is unavailable.
    async fn process(&self, input: &AdapterInput) -> Result<Processed, AdapterError>;

    /// Outbound: translate raw graph events into domain-meaningful events.
    ///
    /// Called once per ingest with every event accumulated from the primary
    /// commits and all enrichment rounds, plus a snapshot of the final state.
    ///
    /// Default: no outbound events.
    fn transform_events(&self, _events: &[GraphEvent], _context: &Context) -> Vec<OutboundEvent> {
        vec![]
    }
}
