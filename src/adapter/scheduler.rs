//! Background stages
//!
//! Slow work (external analysis, large files) runs outside the triggering
//! ingest call. When it finishes it re-enters the graph through the normal
//! `IngestPipeline::ingest` path, so its output is validated, committed and
//! enriched exactly like any other producer's.

use super::error::AdapterError;
use super::ingest::{IngestOutcome, IngestPipeline};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Payload a background stage hands back for ingestion
pub type StagePayload = Box<dyn Any + Send + Sync>;

/// Spawns background stages that complete through the ingest pipeline.
#[derive(Clone)]
pub struct BackgroundScheduler {
    pipeline: Arc<IngestPipeline>,
}

impl BackgroundScheduler {
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<IngestPipeline> {
        &self.pipeline
    }

    /// Run `work` on the tokio runtime without blocking the caller.
    ///
    /// When `work` yields a payload, it is ingested into `context_id` as
    /// `input_kind`. `Ok(None)` means the stage had nothing to contribute.
    /// Failures are logged and returned through the handle.
    pub fn schedule<F>(
        &self,
        context_id: impl Into<String>,
        input_kind: impl Into<String>,
        work: F,
    ) -> JoinHandle<Result<Option<IngestOutcome>, AdapterError>>
    where
        F: Future<Output = Result<Option<StagePayload>, AdapterError>> + Send + 'static,
    {
        let pipeline = self.pipeline.clone();
        let context_id = context_id.into();
        let input_kind = input_kind.into();

        tokio::spawn(async move {
            let payload = match work.await {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    debug!(context_id = %context_id, input_kind = %input_kind, "background stage produced nothing");
                    return Ok(None);
                }
                Err(e) => {
                    warn!(context_id = %context_id, input_kind = %input_kind, error = %e, "background stage failed");
                    return Err(e);
                }
            };

            match pipeline.ingest(&context_id, &input_kind, payload).await {
                Ok(outcome) => Ok(Some(outcome)),
                Err(e) => {
                    warn!(context_id = %context_id, input_kind = %input_kind, error = %e, "background ingest failed");
                    Err(e)
                }
            }
        })
    }
}

impl std::fmt::Debug for BackgroundScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundScheduler")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::edge_list::{EdgeListAdapter, EdgeListInput, EdgeSpec, NodeSpec, EDGE_LIST_KIND};
    use crate::graph::{NodeId, PlaitEngine};

    fn scheduler() -> (BackgroundScheduler, Arc<PlaitEngine>) {
        let engine = Arc::new(PlaitEngine::new());
        engine.create_context("test").unwrap();
        let mut pipeline = IngestPipeline::new(engine.clone());
        pipeline.register_adapter(Arc::new(EdgeListAdapter::new("analysis")));
        (BackgroundScheduler::new(Arc::new(pipeline)), engine)
    }

    #[tokio::test]
    async fn completed_stage_reenters_ingest() {
        let (scheduler, engine) = scheduler();

        let handle = scheduler.schedule("test", EDGE_LIST_KIND, async {
            let payload = EdgeListInput::new()
                .with_node(NodeSpec::new("A", "concept"))
                .with_node(NodeSpec::new("B", "concept"))
                .with_edge(EdgeSpec::new("A", "B", "similar_to", 0.8));
            Ok(Some(Box::new(payload) as StagePayload))
        });

        let outcome = handle.await.unwrap().unwrap().unwrap();
        assert!(!outcome.events.is_empty());

        let id = engine.resolve("test").unwrap();
        let ctx = engine.get_context(&id).unwrap();
        let edge = ctx
            .find_edge(&NodeId::from("A"), "similar_to", &NodeId::from("B"))
            .unwrap();
        assert_eq!(edge.contribution("analysis"), Some(0.8));
    }

    #[tokio::test]
    async fn empty_stage_commits_nothing() {
        let (scheduler, engine) = scheduler();
        let result = scheduler
            .schedule("test", EDGE_LIST_KIND, async { Ok(None) })
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_none());
        let id = engine.resolve("test").unwrap();
        assert_eq!(engine.get_context(&id).unwrap().node_count(), 0);
    }

    #[tokio::test]
    async fn stage_failure_is_returned() {
        let (scheduler, _) = scheduler();
        let result = scheduler
            .schedule("test", EDGE_LIST_KIND, async {
                Err(AdapterError::Internal("service timed out".to_string()))
            })
            .await
            .unwrap();
        assert!(matches!(result, Err(AdapterError::Internal(_))));
    }
}
