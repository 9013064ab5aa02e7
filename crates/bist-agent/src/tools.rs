use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bist_data::{macro_data, portfolios, technicals, MarketSnapshot};
use bist_models::{Ticker, ToolId};

use crate::error::AgentError;

/// A data source the executor can call. Mockable for testing.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn id(&self) -> ToolId;

    async fn invoke(&self, ticker: Option<Ticker>) -> Result<serde_json::Value, AgentError>;
}

/// Adapters by tool id. At most one adapter per id; registering again replaces it.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    adapters: BTreeMap<ToolId, Arc<dyn ToolAdapter>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every snapshot-backed data tool.
    pub fn with_snapshot(snapshot: Arc<MarketSnapshot>) -> Self {
        Self::new()
            .with(Arc::new(MarketDataTool::new(Arc::clone(&snapshot))))
            .with(Arc::new(TechnicalsTool::new(snapshot)))
            .with(Arc::new(MacroDataTool))
            .with(Arc::new(ModelPortfoliosTool))
    }

    pub fn with(mut self, adapter: Arc<dyn ToolAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: ToolId) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<ToolId> {
        self.adapters.keys().copied().collect()
    }
}

fn require_ticker(ticker: Option<Ticker>) -> Result<Ticker, AgentError> {
    ticker.ok_or_else(|| AgentError::Tool("ticker_required".to_string()))
}

/// Price and fundamentals for one ticker.
pub struct MarketDataTool {
    snapshot: Arc<MarketSnapshot>,
}

impl MarketDataTool {
    pub fn new(snapshot: Arc<MarketSnapshot>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl ToolAdapter for MarketDataTool {
    fn id(&self) -> ToolId {
        ToolId::MarketData
    }

    async fn invoke(&self, ticker: Option<Ticker>) -> Result<serde_json::Value, AgentError> {
        let ticker = require_ticker(ticker)?;
        Ok(self.snapshot.stock_data(ticker)?)
    }
}

/// Indicators computed from the snapshot's close history.
pub struct TechnicalsTool {
    snapshot: Arc<MarketSnapshot>,
}

impl TechnicalsTool {
    pub fn new(snapshot: Arc<MarketSnapshot>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl ToolAdapter for TechnicalsTool {
    fn id(&self) -> ToolId {
        ToolId::Technicals
    }

    async fn invoke(&self, ticker: Option<Ticker>) -> Result<serde_json::Value, AgentError> {
        let ticker = require_ticker(ticker)?;
        let closes = self.snapshot.closes(ticker)?;
        let indicators = technicals::compute(ticker.symbol(), &closes)?;
        let mut payload = serde_json::to_value(indicators)?;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("ticker".to_string(), serde_json::json!(ticker.symbol()));
            obj.insert("observations".to_string(), serde_json::json!(closes.len()));
            obj.insert("as_of".to_string(), serde_json::json!(self.snapshot.as_of));
        }
        Ok(payload)
    }
}

/// Policy rate, inflation and FX.
pub struct MacroDataTool;

#[async_trait]
impl ToolAdapter for MacroDataTool {
    fn id(&self) -> ToolId {
        ToolId::MacroData
    }

    async fn invoke(&self, _ticker: Option<Ticker>) -> Result<serde_json::Value, AgentError> {
        Ok(macro_data::macro_data())
    }
}

/// Brokerage model portfolios; a ticker narrows to that stock's consensus.
pub struct ModelPortfoliosTool;

#[async_trait]
impl ToolAdapter for ModelPortfoliosTool {
    fn id(&self) -> ToolId {
        ToolId::ModelPortfolios
    }

    async fn invoke(&self, ticker: Option<Ticker>) -> Result<serde_json::Value, AgentError> {
        Ok(portfolios::lookup(ticker))
    }
}
