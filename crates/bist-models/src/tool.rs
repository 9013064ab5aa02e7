use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ticker::Ticker;

/// The closed set of data capabilities the planner can schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    MarketData,
    Technicals,
    MacroData,
    ModelPortfolios,
    /// Document retrieval. Planned through the retrieval flag, never as an invocation.
    RagSearch,
}

impl ToolId {
    pub const ALL: [ToolId; 5] = [
        ToolId::MarketData,
        ToolId::Technicals,
        ToolId::MacroData,
        ToolId::ModelPortfolios,
        ToolId::RagSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::MarketData => "market_data",
            ToolId::Technicals => "technicals",
            ToolId::MacroData => "macro_data",
            ToolId::ModelPortfolios => "model_portfolios",
            ToolId::RagSearch => "rag_search",
        }
    }

    /// Human-readable label used when disclosing data gaps in a report.
    pub fn label(&self) -> &'static str {
        match self {
            ToolId::MarketData => "market data",
            ToolId::Technicals => "technical indicators",
            ToolId::MacroData => "macro data",
            ToolId::ModelPortfolios => "model portfolios",
            ToolId::RagSearch => "document search",
        }
    }

    /// Whether the tool cannot produce anything without a ticker parameter.
    pub fn requires_ticker(&self) -> bool {
        matches!(self, ToolId::MarketData | ToolId::Technicals)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned tool call. `ticker` is `None` for market-wide tools, or when the
/// query named no ticker for a ticker-scoped tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolInvocation {
    pub tool: ToolId,
    pub ticker: Option<Ticker>,
}

impl ToolInvocation {
    pub fn new(tool: ToolId, ticker: Option<Ticker>) -> Self {
        Self { tool, ticker }
    }

    /// Slot key in the gathered-results map: `tool` or `tool:TICKER`.
    pub fn key(&self) -> String {
        match self.ticker {
            Some(ticker) => format!("{}:{}", self.tool, ticker),
            None => self.tool.to_string(),
        }
    }
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { payload: serde_json::Value },
    Failure { reason: String },
}

impl ToolResult {
    pub fn success(payload: serde_json::Value) -> Self {
        ToolResult::Success { payload }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ToolResult::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ToolResult::Failure { reason } => Some(reason),
            ToolResult::Success { .. } => None,
        }
    }
}

/// A retrieved document snippet with its relevance score and source attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextSnippet {
    pub text: String,
    pub score: f64,
    pub source_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_keys() {
        let scoped = ToolInvocation::new(ToolId::MarketData, Some(Ticker::Akbnk));
        assert_eq!(scoped.key(), "market_data:AKBNK");
        let global = ToolInvocation::new(ToolId::MacroData, None);
        assert_eq!(global.key(), "macro_data");
    }

    #[test]
    fn tool_result_is_tagged() {
        let failure = ToolResult::failure("insufficient data");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "failure", "reason": "insufficient data"})
        );

        let success: ToolResult =
            serde_json::from_str(r#"{"status": "success", "payload": {"price": "265.40"}}"#)
                .unwrap();
        assert!(success.is_success());
        assert_eq!(success.failure_reason(), None);
    }

    #[test]
    fn ticker_scoped_tools() {
        assert!(ToolId::MarketData.requires_ticker());
        assert!(ToolId::Technicals.requires_ticker());
        assert!(!ToolId::ModelPortfolios.requires_ticker());
        assert!(!ToolId::MacroData.requires_ticker());
    }
}
