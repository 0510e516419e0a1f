//! Core adapter layer types
//!
//! - AdapterInput: the envelope handed to an adapter
//! - Processed: what an adapter produced (an emission, or a soft skip)
//! - OutboundEvent: domain-meaningful event returned to the ingest caller

use crate::graph::Emission;
use serde::Serialize;
use std::any::Any;

/// The input envelope the framework hands to an adapter.
#[derive(Debug)]
pub struct AdapterInput {
    /// The kind of input (matched against `Adapter::input_kind`)
    pub kind: String,
    /// Opaque data payload; the adapter downcasts internally
    pub data: Box<dyn Any + Send + Sync>,
    /// Target context ID
    pub context_id: String,
}

impl AdapterInput {
    pub fn new(
        kind: impl Into<String>,
        data: impl Any + Send + Sync + 'static,
        context_id: impl Into<String>,
    ) -> Self {
        Self::from_boxed(kind, Box::new(data), context_id)
    }

    pub fn from_boxed(
        kind: impl Into<String>,
        data: Box<dyn Any + Send + Sync>,
        context_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            data,
            context_id: context_id.into(),
        }
    }

    /// Attempt to downcast the data payload to a specific type.
    pub fn downcast_data<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

/// Result of a successful `Adapter::process` call
#[derive(Debug)]
pub enum Processed {
    /// The adapter proposes these changes
    Emitted(Emission),
    /// An optional dependency was unavailable; nothing to commit
    Skipped { reason: String },
}

impl Processed {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

impl From<Emission> for Processed {
    fn from(emission: Emission) -> Self {
        Self::Emitted(emission)
    }
}

/// A domain-meaningful event produced by an adapter's outbound transform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    /// Event kind, chosen by the adapter (e.g. "edges_added")
    pub kind: String,
    /// Human-readable detail
    pub detail: String,
}

impl OutboundEvent {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_downcasts_to_original_type() {
        let input = AdapterInput::new("edge_list", "payload".to_string(), "ctx");
        assert_eq!(input.downcast_data::<String>().map(String::as_str), Some("payload"));
        assert!(input.downcast_data::<u32>().is_none());
    }

    #[test]
    fn skipped_carries_reason() {
        match Processed::skipped("service offline") {
            Processed::Skipped { reason } => assert_eq!(reason, "service offline"),
            Processed::Emitted(_) => panic!("expected skip"),
        }
    }
}
