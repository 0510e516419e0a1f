//! Fixed-point enrichment loop
//!
//! Rounds run strictly in sequence. Within a round every enrichment sees
//! the same snapshot, taken when the round starts, and exactly the events
//! the previous round produced. Their emissions are committed afterwards in
//! registration order. The loop ends in the first round where no
//! enrichment proposes anything, or at the round cap. A round run at the
//! cap is never committed; it only tells quiescence from a cut-off.

use super::commit::commit_emission;
use super::enrichment::EnrichmentRegistry;
use super::error::AdapterError;
use crate::graph::{ContextId, Emission, GraphEvent, PlaitEngine};
use tracing::{debug, warn};

/// What the enrichment loop did
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// Events from every enrichment commit, in commit order
    pub events: Vec<GraphEvent>,
    /// Rounds in which at least one enrichment emitted
    pub rounds: usize,
    /// False when enrichments still had work after `max_rounds` committing
    /// rounds. Reaching the cap with nothing left to do counts as quiesced.
    pub quiesced: bool,
}

/// Run registered enrichments to quiescence.
///
/// A producer-local commit failure is logged and skipped; the rest of the
/// round still commits. Hitting the round cap is logged, never an error.
pub fn run_enrichment_loop(
    engine: &PlaitEngine,
    context_id: &ContextId,
    registry: &EnrichmentRegistry,
    trigger_events: &[GraphEvent],
) -> Result<LoopOutcome, AdapterError> {
    let mut outcome = LoopOutcome::default();
    let mut round_events: Vec<GraphEvent> = trigger_events.to_vec();

    loop {
        let snapshot = engine.snapshot(context_id)?;

        let mut round_emissions: Vec<(&str, Emission)> = Vec::new();
        for enrichment in registry.enrichments() {
            if let Some(emission) = enrichment.enrich(&round_events, &snapshot) {
                if !emission.is_empty() {
                    round_emissions.push((enrichment.id(), emission));
                }
            }
        }

        if round_emissions.is_empty() {
            outcome.quiesced = true;
            debug!(context_id = %context_id, rounds = outcome.rounds, "enrichment loop quiesced");
            return Ok(outcome);
        }

        // At the cap the last pass only checks for quiescence
        if outcome.rounds >= registry.max_rounds() {
            warn!(
                context_id = %context_id,
                rounds = outcome.rounds,
                pending = round_emissions.len(),
                "enrichment loop stopped at round cap before quiescence"
            );
            return Ok(outcome);
        }

        let mut next_events = Vec::new();
        for (producer_id, emission) in round_emissions {
            match commit_emission(engine, context_id, producer_id, emission) {
                Ok(events) => next_events.extend(events),
                Err(e) if e.is_producer_local() => {}
                Err(e) => return Err(e),
            }
        }

        outcome.rounds += 1;
        debug!(
            context_id = %context_id,
            round = outcome.rounds,
            events = next_events.len(),
            "enrichment round committed"
        );
        outcome.events.extend(next_events.iter().cloned());
        round_events = next_events;
    }
}
