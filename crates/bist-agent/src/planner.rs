use std::collections::BTreeSet;

use bist_models::{CapabilityFlags, QueryCategory, Sector, Ticker, ToolId, ToolInvocation};

/// Tool invocations and retrieval decision for one query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub invocations: Vec<ToolInvocation>,
    pub retrieve: bool,
}

impl Plan {
    /// Distinct tools in the plan, counting retrieval as `RagSearch`.
    pub fn tool_set(&self) -> BTreeSet<ToolId> {
        let mut set: BTreeSet<ToolId> = self.invocations.iter().map(|inv| inv.tool).collect();
        if self.retrieve {
            set.insert(ToolId::RagSearch);
        }
        set
    }
}

/// Data tools the category calls for, before capability flags apply.
pub fn category_tools(category: QueryCategory) -> &'static [ToolId] {
    match category {
        QueryCategory::Fundamental => &[ToolId::MarketData],
        QueryCategory::Technical => &[ToolId::Technicals],
        QueryCategory::Macro => &[ToolId::MacroData],
        QueryCategory::Portfolio => &[ToolId::ModelPortfolios],
        QueryCategory::Sector | QueryCategory::Comparison => &[ToolId::MarketData],
        QueryCategory::Comprehensive => &[
            ToolId::MarketData,
            ToolId::Technicals,
            ToolId::MacroData,
            ToolId::ModelPortfolios,
        ],
        QueryCategory::Risk => &[ToolId::MarketData, ToolId::Technicals],
        QueryCategory::Unknown => &[],
    }
}

/// The tool set a correct plan has for a labelled category under the given
/// flags. Used as ground truth when scoring tool selection.
pub fn expected_tool_set(category: QueryCategory, capabilities: CapabilityFlags) -> BTreeSet<ToolId> {
    let mut set = BTreeSet::new();
    if capabilities.tools {
        set.extend(category_tools(category).iter().copied());
    }
    if capabilities.rag {
        set.insert(ToolId::RagSearch);
    }
    set
}

/// Build the plan for a classified query. Deterministic and never fails:
/// a ticker-scoped tool with no ticker is still planned and fails at
/// execution time, which keeps the gap visible in the report.
pub fn plan(
    category: QueryCategory,
    tickers: &[Ticker],
    sector: Option<Sector>,
    capabilities: CapabilityFlags,
) -> Plan {
    let retrieve = capabilities.rag;
    if !capabilities.tools {
        return Plan {
            invocations: Vec::new(),
            retrieve,
        };
    }

    let primary = tickers.first().copied();
    let mut invocations = Vec::new();

    match category {
        QueryCategory::Sector => {
            let members = sector
                .or_else(|| primary.map(|t| t.sector()))
                .map(|s| s.tickers())
                .unwrap_or_default();
            push_per_ticker(&mut invocations, ToolId::MarketData, &members, primary);
        }
        QueryCategory::Comparison => {
            let mut members = tickers.to_vec();
            if members.len() < 2 {
                if let Some(sector) = sector.or_else(|| primary.map(|t| t.sector())) {
                    for ticker in sector.tickers() {
                        if !members.contains(&ticker) {
                            members.push(ticker);
                        }
                    }
                }
            }
            push_per_ticker(&mut invocations, ToolId::MarketData, &members, primary);
        }
        other => {
            for tool in category_tools(other) {
                let ticker = if tool.requires_ticker() || *tool == ToolId::ModelPortfolios {
                    primary
                } else {
                    None
                };
                invocations.push(ToolInvocation::new(*tool, ticker));
            }
        }
    }

    Plan {
        invocations,
        retrieve,
    }
}

fn push_per_ticker(
    invocations: &mut Vec<ToolInvocation>,
    tool: ToolId,
    members: &[Ticker],
    fallback: Option<Ticker>,
) {
    if members.is_empty() {
        invocations.push(ToolInvocation::new(tool, fallback));
        return;
    }
    for ticker in members {
        let invocation = ToolInvocation::new(tool, Some(*ticker));
        if !invocations.contains(&invocation) {
            invocations.push(invocation);
        }
    }
}
