//! Enrichment loop behavior observed through the ingest pipeline

use plait::adapter::{EdgeSpec, NodeSpec, EDGE_LIST_KIND};
use plait::{
    CoOccurrenceEnrichment, Context, Direction, EdgeListAdapter, EdgeListInput, EdgeUpsert, Emission,
    Enrichment, EnrichmentRegistry, GraphEvent, IngestPipeline, NodeId, PlaitEngine, StepQuery,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn tagged(fragment: &str, tags: &[&str]) -> Box<EdgeListInput> {
    let mut input = EdgeListInput::new().with_node(NodeSpec::new(fragment, "fragment"));
    for tag in tags {
        input = input
            .with_node(NodeSpec::new(*tag, "concept"))
            .with_edge(EdgeSpec::new(fragment, *tag, "tagged_with", 1.0));
    }
    Box::new(input)
}

fn pipeline_with(enrichments: Vec<Arc<dyn Enrichment>>, max_rounds: usize) -> (IngestPipeline, Arc<PlaitEngine>, String) {
    let engine = Arc::new(PlaitEngine::new());
    let ctx = engine.create_context("enriched").unwrap().to_string();
    let registry = EnrichmentRegistry::new(enrichments).with_max_rounds(max_rounds);
    let mut pipeline = IngestPipeline::new(engine.clone()).with_enrichments(Arc::new(registry));
    pipeline.register_adapter(Arc::new(EdgeListAdapter::new("fragments")));
    (pipeline, engine, ctx)
}

/// Proposes a new value every round
struct Drifting {
    calls: AtomicUsize,
}

impl Enrichment for Drifting {
    fn id(&self) -> &str {
        "drifting"
    }

    fn enrich(&self, _events: &[GraphEvent], context: &Context) -> Option<Emission> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let first = context.nodes().map(|n| n.id.clone()).min()?;
        Some(Emission::new().with_edge(EdgeUpsert::new(first.clone(), first, "drifts", n as f64)))
    }
}

#[tokio::test]
async fn cooccurrence_reaches_quiescence() {
    let (pipeline, engine, ctx) = pipeline_with(vec![Arc::new(CoOccurrenceEnrichment::new())], 10);

    let first = pipeline
        .ingest(&ctx, EDGE_LIST_KIND, tagged("f1", &["travel", "avignon"]))
        .await
        .unwrap();
    assert!(first.quiesced);
    assert_eq!(first.rounds, 1);

    // A second fragment raises the shared count for the existing pair
    let second = pipeline
        .ingest(&ctx, EDGE_LIST_KIND, tagged("f2", &["travel", "avignon"]))
        .await
        .unwrap();
    assert!(second.quiesced);
    assert_eq!(second.rounds, 1);

    let snapshot = engine.get_context(&ctx.as_str().into()).unwrap();
    let pair = snapshot
        .find_edge(&NodeId::from("travel"), "may_be_related", &NodeId::from("avignon"))
        .unwrap();
    assert_eq!(pair.contribution("co_occurrence:tagged_with:may_be_related"), Some(2.0));
}

#[tokio::test]
async fn duplicate_registration_runs_once() {
    let (pipeline, engine, ctx) = pipeline_with(
        vec![
            Arc::new(CoOccurrenceEnrichment::new()),
            Arc::new(CoOccurrenceEnrichment::new()),
        ],
        10,
    );
    assert_eq!(pipeline.enrichments().enrichments().len(), 1);

    pipeline
        .ingest(&ctx, EDGE_LIST_KIND, tagged("f1", &["travel", "avignon"]))
        .await
        .unwrap();
    let snapshot = engine.get_context(&ctx.as_str().into()).unwrap();
    assert_eq!(
        snapshot
            .edges()
            .filter(|e| e.relationship == "may_be_related")
            .count(),
        2
    );
}

#[tokio::test]
async fn drifting_enrichment_stops_at_cap_without_error() {
    let drifting = Arc::new(Drifting {
        calls: AtomicUsize::new(0),
    });
    let (pipeline, engine, ctx) = pipeline_with(vec![drifting.clone()], 3);

    let outcome = pipeline
        .ingest(&ctx, EDGE_LIST_KIND, tagged("f1", &["travel"]))
        .await
        .unwrap();

    assert!(!outcome.quiesced);
    assert_eq!(outcome.rounds, 3);
    // The call at the cap sees pending work but commits nothing
    assert_eq!(drifting.calls.load(Ordering::SeqCst), 4);

    // Partial results from the capped loop stay committed
    let snapshot = engine.get_context(&ctx.as_str().into()).unwrap();
    let edge = snapshot.edges().find(|e| e.relationship == "drifts").unwrap();
    assert_eq!(edge.contribution("drifting"), Some(2.0));
}

#[tokio::test]
async fn enrichment_output_is_queryable() {
    let (pipeline, engine, ctx) = pipeline_with(vec![Arc::new(CoOccurrenceEnrichment::new())], 10);
    pipeline
        .ingest(&ctx, EDGE_LIST_KIND, tagged("f1", &["travel", "avignon", "food"]))
        .await
        .unwrap();

    let snapshot = engine.get_context(&ctx.as_str().into()).unwrap();
    let result = StepQuery::from("travel")
        .step(Direction::Outgoing, "may_be_related")
        .step(Direction::Incoming, "tagged_with")
        .execute(&snapshot);

    let mut related: Vec<&str> = result.at_step(0).iter().map(|n| n.id.as_str()).collect();
    related.sort_unstable();
    assert_eq!(related, vec!["avignon", "food"]);
    // Step 1 starts from avignon and food, both tagged by f1
    assert_eq!(result.at_step(1).len(), 1);
    assert_eq!(result.at_step(1)[0].id.as_str(), "f1");
}
