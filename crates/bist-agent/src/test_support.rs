//! Test doubles for generators, tools and retrievers, plus a small market
//! snapshot. Public so downstream crates can drive the workflow offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bist_data::MarketSnapshot;
use bist_models::{ContextSnippet, Ticker, ToolId};

use crate::error::{AgentError, GenerationError};
use crate::generation::{GenerationRequest, Generator};
use crate::retriever::Retriever;
use crate::tools::ToolAdapter;

enum Reply {
    Text(String),
    Error(GenerationError),
    Panic,
}

/// Generator returning canned replies, optionally chosen by request purpose.
pub struct StubGenerator {
    default: Reply,
    by_purpose: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubGenerator {
    fn with_reply(default: Reply) -> Self {
        Self {
            default,
            by_purpose: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fixed(text: &str) -> Self {
        Self::with_reply(Reply::Text(text.to_string()))
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::with_reply(Reply::Error(error))
    }

    /// Panics inside `generate`, to exercise task-level failure handling.
    pub fn panicking() -> Self {
        Self::with_reply(Reply::Panic)
    }

    /// Reply with `text` when the request purpose equals `purpose`.
    pub fn on(mut self, purpose: &str, text: &str) -> Self {
        self.by_purpose.insert(purpose.to_string(), text.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls started but not yet returned.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(text) = self.by_purpose.get(&request.purpose) {
            return Ok(text.clone());
        }
        match &self.default {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Error(e) => Err(e.clone()),
            Reply::Panic => panic!("stub generator panicked"),
        }
    }
}

/// Fails with a quota error for the first `failures` calls, then succeeds.
pub struct FlakyGenerator {
    failures: usize,
    text: String,
    calls: AtomicUsize,
}

impl FlakyGenerator {
    pub fn new(failures: usize, text: &str) -> Self {
        Self {
            failures,
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FlakyGenerator {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(GenerationError::Quota {
                detail: "429 Too Many Requests".to_string(),
                retry_after: None,
            })
        } else {
            Ok(self.text.clone())
        }
    }
}

enum ToolBehavior {
    Ok(serde_json::Value),
    Fail(String),
    Slow(Duration),
    Panic,
}

/// Tool adapter with a fixed behavior.
pub struct ScriptedTool {
    id: ToolId,
    behavior: ToolBehavior,
    calls: AtomicUsize,
}

impl ScriptedTool {
    fn new(id: ToolId, behavior: ToolBehavior) -> Self {
        Self {
            id,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ok(id: ToolId, payload: serde_json::Value) -> Self {
        Self::new(id, ToolBehavior::Ok(payload))
    }

    pub fn failing(id: ToolId, reason: &str) -> Self {
        Self::new(id, ToolBehavior::Fail(reason.to_string()))
    }

    pub fn slow(id: ToolId, delay: Duration) -> Self {
        Self::new(id, ToolBehavior::Slow(delay))
    }

    pub fn panicking(id: ToolId) -> Self {
        Self::new(id, ToolBehavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolAdapter for ScriptedTool {
    fn id(&self) -> ToolId {
        self.id
    }

    async fn invoke(&self, ticker: Option<Ticker>) -> Result<serde_json::Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ToolBehavior::Ok(payload) => {
                let mut payload = payload.clone();
                if let (Some(obj), Some(ticker)) = (payload.as_object_mut(), ticker) {
                    obj.insert("ticker".to_string(), serde_json::json!(ticker.symbol()));
                }
                Ok(payload)
            }
            ToolBehavior::Fail(reason) => Err(AgentError::Tool(reason.clone())),
            ToolBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(serde_json::json!({"slow": true}))
            }
            ToolBehavior::Panic => panic!("scripted tool panicked"),
        }
    }
}

/// Retriever returning the same snippets for every query.
pub struct StaticRetriever {
    snippets: Vec<ContextSnippet>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(snippets: Vec<ContextSnippet>) -> Self {
        Self {
            snippets,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_texts(texts: &[&str]) -> Self {
        let snippets = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ContextSnippet {
                text: text.to_string(),
                score: 1.0 / (i as f64 + 1.0),
                source_id: format!("test_doc ({i})"),
            })
            .collect();
        Self::new(snippets)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<ContextSnippet>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snippets.iter().take(top_k).cloned().collect())
    }
}

pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<ContextSnippet>, AgentError> {
        Err(AgentError::Tool("index unavailable".to_string()))
    }
}

/// Two-stock snapshot: THYAO with 40 rising closes, TCELL with only three.
pub fn sample_snapshot() -> MarketSnapshot {
    let thyao_closes: Vec<String> = (0..40).map(|i| format!("{}", 240 + i)).collect();
    let raw = serde_json::json!({
        "as_of": "2025-01-15",
        "source": "test fixture",
        "stocks": {
            "THYAO": {
                "company_name": "Turk Hava Yollari",
                "price": "265.40",
                "previous_close": "260.20",
                "volume": 45000000,
                "market_cap": "366252000000",
                "pe_ratio": "5.2",
                "pb_ratio": "1.8",
                "dividend_yield": null,
                "free_float": "50.4",
                "foreign_ratio": "38.1",
                "closes": thyao_closes
            },
            "TCELL": {
                "company_name": "Turkcell",
                "price": "92.10",
                "previous_close": "92.10",
                "volume": 12000000,
                "market_cap": "202620000000",
                "pe_ratio": "11.4",
                "pb_ratio": "1.6",
                "dividend_yield": "2.1",
                "free_float": null,
                "foreign_ratio": null,
                "closes": ["90", "91", "92"]
            }
        }
    });
    match serde_json::from_value(raw) {
        Ok(snapshot) => snapshot,
        Err(e) => panic!("sample snapshot fixture is invalid: {e}"),
    }
}
