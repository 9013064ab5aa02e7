use bist_models::Ticker;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Rating {
    #[serde(rename = "AL")]
    Buy,
    #[serde(rename = "TUT")]
    Hold,
    #[serde(rename = "SAT")]
    Sell,
}

/// A brokerage's published model portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPortfolio {
    pub institution: String,
    pub last_updated: String,
    pub holdings: Vec<Holding>,
}

/// A holding may be outside the tracked universe, so the symbol stays a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub rating: Rating,
    pub target_price: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub institution: String,
    pub rating: Rating,
    pub target_price: Decimal,
    pub weight: Decimal,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consensus {
    pub buy_count: usize,
    pub hold_count: usize,
    pub sell_count: usize,
    pub average_target: Decimal,
    pub coverage_count: usize,
}

fn holding(symbol: &str, rating: Rating, target: i64, weight_pct: i64) -> Holding {
    Holding {
        symbol: symbol.to_string(),
        rating,
        target_price: Decimal::new(target, 1),
        weight: Decimal::new(weight_pct, 2),
    }
}

fn portfolio(institution: &str, holdings: Vec<Holding>) -> ModelPortfolio {
    ModelPortfolio {
        institution: institution.to_string(),
        last_updated: "2025-01".to_string(),
        holdings,
    }
}

/// Model portfolios collected from the brokerages' January 2025 publications.
pub fn model_portfolios() -> Vec<ModelPortfolio> {
    use Rating::*;
    vec![
        portfolio(
            "Is Yatirim",
            vec![
                holding("THYAO", Buy, 2950, 12),
                holding("AKBNK", Buy, 580, 10),
                holding("GARAN", Hold, 1250, 8),
                holding("SISE", Buy, 720, 7),
                holding("TUPRS", Buy, 1850, 9),
                holding("EREGL", Hold, 520, 6),
                holding("KCHOL", Buy, 2150, 8),
                holding("TCELL", Buy, 980, 7),
            ],
        ),
        portfolio(
            "Oyak Yatirim",
            vec![
                holding("AKBNK", Buy, 550, 11),
                holding("YKBNK", Buy, 380, 10),
                holding("THYAO", Buy, 2900, 12),
                holding("TOASO", Buy, 3200, 9),
                holding("KCHOL", Buy, 2100, 8),
                holding("BIMAS", Hold, 6200, 7),
                holding("PGSUS", Buy, 9800, 8),
            ],
        ),
        portfolio(
            "Gedik Yatirim",
            vec![
                holding("GARAN", Buy, 1300, 10),
                holding("THYAO", Buy, 2850, 11),
                holding("SISE", Buy, 750, 8),
                holding("EREGL", Buy, 550, 7),
                holding("SAHOL", Hold, 850, 9),
                holding("TUPRS", Buy, 1900, 10),
            ],
        ),
        portfolio(
            "Yapi Kredi Yatirim",
            vec![
                holding("AKBNK", Buy, 560, 12),
                holding("THYAO", Buy, 3000, 10),
                holding("TCELL", Buy, 950, 8),
                holding("BIMAS", Buy, 6400, 9),
                holding("KCHOL", Buy, 2200, 8),
            ],
        ),
    ]
}

/// Per-institution view of one ticker with consensus, or an overview of every
/// portfolio's top picks when no ticker is given.
pub fn lookup(ticker: Option<Ticker>) -> serde_json::Value {
    let portfolios = model_portfolios();

    let Some(ticker) = ticker else {
        let overview: Vec<serde_json::Value> = portfolios
            .iter()
            .map(|p| {
                serde_json::json!({
                    "institution": p.institution,
                    "stock_count": p.holdings.len(),
                    "last_updated": p.last_updated,
                    "top_picks": p.holdings.iter().take(3).map(|h| h.symbol.clone()).collect::<Vec<_>>(),
                })
            })
            .collect();
        return serde_json::json!({"type": "overview", "portfolios": overview});
    };

    let recommendations: Vec<Recommendation> = portfolios
        .iter()
        .filter_map(|p| {
            p.holdings
                .iter()
                .find(|h| h.symbol == ticker.symbol())
                .map(|h| Recommendation {
                    institution: p.institution.clone(),
                    rating: h.rating,
                    target_price: h.target_price,
                    weight: h.weight,
                    last_updated: p.last_updated.clone(),
                })
        })
        .collect();

    if recommendations.is_empty() {
        return serde_json::json!({
            "type": "ticker_search",
            "ticker": ticker,
            "found": false,
            "message": format!("{ticker} model portfoylerde bulunamadi"),
        });
    }

    let count = |rating: Rating| recommendations.iter().filter(|r| r.rating == rating).count();
    let total: Decimal = recommendations.iter().map(|r| r.target_price).sum();
    let consensus = Consensus {
        buy_count: count(Rating::Buy),
        hold_count: count(Rating::Hold),
        sell_count: count(Rating::Sell),
        average_target: (total / Decimal::from(recommendations.len())).round_dp(2),
        coverage_count: recommendations.len(),
    };

    serde_json::json!({
        "type": "ticker_search",
        "ticker": ticker,
        "found": true,
        "recommendations": recommendations,
        "consensus": consensus,
    })
}
