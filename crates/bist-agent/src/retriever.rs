use std::sync::Arc;

use async_trait::async_trait;
use bist_data::DocumentStore;
use bist_models::ContextSnippet;

use crate::error::AgentError;

/// Document search over the financial corpus. Mockable for testing.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `top_k` snippets, highest score first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ContextSnippet>, AgentError>;
}

/// Retriever backed by the in-memory lexical document store.
pub struct StoreRetriever {
    store: Arc<DocumentStore>,
}

impl StoreRetriever {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Retriever for StoreRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ContextSnippet>, AgentError> {
        Ok(self.store.search(query, top_k))
    }
}
