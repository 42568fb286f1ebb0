//! [`MemoryRouter`] – executes memory tool calls.
//!
//! Each [`ToolInvocation`] names one of the six registered memory operations.
//! Saves embed the argument and insert it into the named collection; searches
//! embed the argument as a query and return the single nearest record's text
//! (top-1, no score threshold).
//!
//! [`MemoryRouter::invoke_all`] runs a batch strictly in order and joins every
//! non-empty search hit with `", "` into one context string. A failing call
//! is logged and skipped; it never aborts the rest of the batch.

use std::sync::Arc;

use nao_types::{MemoryOp, MemoryType, NaoError, ToolInvocation};
use tracing::{debug, info, warn};

use crate::embedding::Embedder;
use crate::store::MemoryBank;

/// Separator between search hits in the aggregated context.
pub const CONTEXT_SEPARATOR: &str = ", ";

/// Dispatches memory tool calls to the [`MemoryBank`].
pub struct MemoryRouter {
    bank: MemoryBank,
    embedder: Arc<dyn Embedder>,
}

impl MemoryRouter {
    pub fn new(bank: MemoryBank, embedder: Arc<dyn Embedder>) -> Self {
        Self { bank, embedder }
    }

    pub fn bank(&self) -> &MemoryBank {
        &self.bank
    }

    /// Execute one tool call.
    ///
    /// Returns `Ok(Some(text))` for a search that found a record, `Ok(None)`
    /// for a save or an empty search.
    ///
    /// # Errors
    ///
    /// [`NaoError::UnknownTool`] for an unregistered function name,
    /// [`NaoError::Memory`] when the argument is blank or the embedding or
    /// collection call fails.
    pub async fn invoke(&self, call: &ToolInvocation) -> Result<Option<String>, NaoError> {
        let op = call.op()?;
        let argument = call.argument.trim();
        if argument.is_empty() {
            return Err(NaoError::Memory(format!("{op} called with an empty argument")));
        }

        match op {
            MemoryOp::Save(memory_type) => {
                self.save(memory_type, argument).await?;
                Ok(None)
            }
            MemoryOp::Search(memory_type) => self.search(memory_type, argument).await,
        }
    }

    /// Execute `calls` in order and return the aggregated search context.
    pub async fn invoke_all(&self, calls: &[ToolInvocation]) -> String {
        let mut hits: Vec<String> = Vec::new();
        for (i, call) in calls.iter().enumerate() {
            match self.invoke(call).await {
                Ok(Some(text)) if !text.is_empty() => hits.push(text),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        call = i,
                        function = %call.function_name,
                        error = %e,
                        "memory tool call skipped"
                    );
                }
            }
        }
        hits.join(CONTEXT_SEPARATOR)
    }

    async fn save(&self, memory_type: MemoryType, text: &str) -> Result<(), NaoError> {
        let embedding = self
            .embedder
            .embed_one(text)
            .await
            .map_err(|e| NaoError::Memory(format!("embedding failed: {e}")))?;
        let record = self.bank.store(memory_type).add(text, embedding)?;
        info!(memory_type = %memory_type, id = %record.id, "memory saved");
        Ok(())
    }

    async fn search(
        &self,
        memory_type: MemoryType,
        query: &str,
    ) -> Result<Option<String>, NaoError> {
        let embedding = self
            .embedder
            .embed_one(query)
            .await
            .map_err(|e| NaoError::Memory(format!("embedding failed: {e}")))?;
        let hit = self
            .bank
            .store(memory_type)
            .query(&embedding, 1)?
            .into_iter()
            .next();
        match hit {
            Some((record, score)) => {
                debug!(memory_type = %memory_type, id = %record.id, score, "memory recalled");
                Ok(Some(record.text))
            }
            None => {
                debug!(memory_type = %memory_type, "memory search found nothing");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashEmbedder};
    use crate::store::VectorStore;
    use async_trait::async_trait;

    fn router() -> MemoryRouter {
        MemoryRouter::new(
            MemoryBank::open_in_memory().unwrap(),
            Arc::new(HashEmbedder::default()),
        )
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::BadResponse("offline".into()))
        }
    }

    // ── invoke ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn save_produces_no_context_and_stores_record() {
        let r = router();
        let out = r
            .invoke(&ToolInvocation::new("save_semantic_memory", "favorite color is blue"))
            .await
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(r.bank().store(MemoryType::Semantic).len().unwrap(), 1);
    }

    #[tokio::test]
    async fn saving_identical_text_twice_creates_two_records() {
        let r = router();
        let call = ToolInvocation::new("save_episodic_memory", "prefers brief answers");
        r.invoke(&call).await.unwrap();
        r.invoke(&call).await.unwrap();
        let hits = r
            .bank()
            .store(MemoryType::Episodic)
            .query(&HashEmbedder::default().embed_text("prefers brief answers"), 10)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_ne!(hits[0].0.id, hits[1].0.id);
    }

    #[tokio::test]
    async fn search_after_save_returns_saved_text() {
        let r = router();
        r.invoke(&ToolInvocation::new("save_semantic_memory", "favorite color is blue"))
            .await
            .unwrap();
        let out = r
            .invoke(&ToolInvocation::new("search_semantic_memory", "favorite color is blue"))
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("favorite color is blue"));
    }

    #[tokio::test]
    async fn search_in_other_namespace_finds_nothing() {
        let r = router();
        r.invoke(&ToolInvocation::new("save_semantic_memory", "favorite color is blue"))
            .await
            .unwrap();
        for name in ["search_episodic_memory", "search_procedural_memory"] {
            let out = r
                .invoke(&ToolInvocation::new(name, "favorite color is blue"))
                .await
                .unwrap();
            assert_eq!(out, None, "{name} must not see semantic records");
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = router()
            .invoke(&ToolInvocation::new("search_web", "weather in Oslo"))
            .await
            .unwrap_err();
        assert_eq!(err, NaoError::UnknownTool("search_web".into()));
    }

    #[tokio::test]
    async fn blank_argument_is_rejected() {
        let err = router()
            .invoke(&ToolInvocation::new("save_semantic_memory", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, NaoError::Memory(_)));
    }

    #[tokio::test]
    async fn embedding_failure_surfaces_as_memory_error() {
        let r = MemoryRouter::new(
            MemoryBank::open_in_memory().unwrap(),
            Arc::new(FailingEmbedder),
        );
        let err = r
            .invoke(&ToolInvocation::new("save_semantic_memory", "anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, NaoError::Memory(msg) if msg.contains("embedding failed")));
    }

    // ── invoke_all ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn invoke_all_joins_hits_in_order() {
        let r = router();
        r.invoke(&ToolInvocation::new("save_semantic_memory", "Tamim is 5 ft tall"))
            .await
            .unwrap();
        r.invoke(&ToolInvocation::new("save_procedural_memory", "make tea by boiling water"))
            .await
            .unwrap();

        let context = r
            .invoke_all(&[
                ToolInvocation::new("search_procedural_memory", "how to make tea"),
                ToolInvocation::new("search_semantic_memory", "how tall is Tamim"),
            ])
            .await;
        assert_eq!(context, "make tea by boiling water, Tamim is 5 ft tall");
    }

    #[tokio::test]
    async fn invoke_all_skips_bad_calls_and_continues() {
        let r = router();
        let context = r
            .invoke_all(&[
                ToolInvocation::new("search_web", "news"),
                ToolInvocation::new("save_semantic_memory", "lives in Dhaka"),
                ToolInvocation::new("search_semantic_memory", "where does the user live"),
            ])
            .await;
        assert_eq!(context, "lives in Dhaka");
    }

    #[tokio::test]
    async fn invoke_all_search_before_save_sees_previous_state() {
        let r = router();
        let context = r
            .invoke_all(&[
                ToolInvocation::new("search_semantic_memory", "favourite food"),
                ToolInvocation::new("save_semantic_memory", "favourite food is biryani"),
            ])
            .await;
        // The search ran first, against an empty collection.
        assert_eq!(context, "");
        assert_eq!(r.bank().store(MemoryType::Semantic).len().unwrap(), 1);
    }

    #[tokio::test]
    async fn invoke_all_empty_batch_is_empty_context() {
        assert_eq!(router().invoke_all(&[]).await, "");
    }
}
