use std::collections::BTreeMap;
use std::path::Path;

use bist_models::Ticker;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DataError;

/// Point-in-time market data for the tracked universe, produced offline from
/// the exchange data feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub as_of: String,
    pub source: String,
    pub stocks: BTreeMap<Ticker, StockRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    pub company_name: String,
    pub price: Decimal,
    pub previous_close: Decimal,
    pub volume: u64,
    pub market_cap: Decimal,
    pub pe_ratio: Option<Decimal>,
    pub pb_ratio: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub free_float: Option<Decimal>,
    pub foreign_ratio: Option<Decimal>,
    /// Daily closes, oldest first.
    #[serde(default)]
    pub closes: Vec<Decimal>,
}

impl MarketSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshot: MarketSnapshot = serde_json::from_str(&raw)?;
        debug!(
            path = %path.as_ref().display(),
            stocks = snapshot.stocks.len(),
            as_of = %snapshot.as_of,
            "Loaded market snapshot"
        );
        Ok(snapshot)
    }

    pub fn record(&self, ticker: Ticker) -> Result<&StockRecord, DataError> {
        self.stocks
            .get(&ticker)
            .ok_or_else(|| DataError::NotFound(ticker.to_string()))
    }

    /// Fundamentals and price payload for one ticker.
    pub fn stock_data(&self, ticker: Ticker) -> Result<serde_json::Value, DataError> {
        let record = self.record(ticker)?;
        let change_percent = if record.previous_close.is_zero() {
            None
        } else {
            Some(
                ((record.price - record.previous_close) / record.previous_close
                    * Decimal::ONE_HUNDRED)
                    .round_dp(2),
            )
        };
        let (week_low, week_high) = match (record.closes.iter().min(), record.closes.iter().max()) {
            (Some(low), Some(high)) => (Some(*low), Some(*high)),
            _ => (None, None),
        };

        Ok(serde_json::json!({
            "ticker": ticker,
            "company_name": record.company_name,
            "sector": ticker.sector(),
            "current_price": record.price,
            "previous_close": record.previous_close,
            "change_percent": change_percent,
            "volume": record.volume,
            "market_cap": record.market_cap,
            "pe_ratio": record.pe_ratio,
            "pb_ratio": record.pb_ratio,
            "dividend_yield": record.dividend_yield,
            "free_float": record.free_float,
            "foreign_ratio": record.foreign_ratio,
            "period_low": week_low,
            "period_high": week_high,
            "as_of": self.as_of,
            "source": self.source,
        }))
    }

    /// Close history as floats for indicator math.
    pub fn closes(&self, ticker: Ticker) -> Result<Vec<f64>, DataError> {
        let record = self.record(ticker)?;
        Ok(record.closes.iter().filter_map(|c| c.to_f64()).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub fn sample_snapshot() -> MarketSnapshot {
        let mut stocks = BTreeMap::new();
        stocks.insert(
            Ticker::Thyao,
            StockRecord {
                company_name: "Turk Hava Yollari".to_string(),
                price: dec!(265.40),
                previous_close: dec!(260.20),
                volume: 45_000_000,
                market_cap: dec!(366252000000),
                pe_ratio: Some(dec!(5.2)),
                pb_ratio: Some(dec!(1.8)),
                dividend_yield: None,
                free_float: Some(dec!(50.4)),
                foreign_ratio: Some(dec!(38.1)),
                closes: (0..40).map(|i| dec!(240) + Decimal::from(i)).collect(),
            },
        );
        stocks.insert(
            Ticker::Tcell,
            StockRecord {
                company_name: "Turkcell".to_string(),
                price: dec!(92.10),
                previous_close: dec!(92.10),
                volume: 12_000_000,
                market_cap: dec!(202620000000),
                pe_ratio: Some(dec!(11.4)),
                pb_ratio: Some(dec!(1.6)),
                dividend_yield: Some(dec!(2.1)),
                free_float: None,
                foreign_ratio: None,
                closes: vec![dec!(90), dec!(91), dec!(92)],
            },
        );
        MarketSnapshot {
            as_of: "2025-01-15".to_string(),
            source: "test".to_string(),
            stocks,
        }
    }

    #[test]
    fn stock_data_computes_change_percent() {
        let snapshot = sample_snapshot();
        let payload = snapshot.stock_data(Ticker::Thyao).unwrap();
        assert_eq!(payload["ticker"], "THYAO");
        assert_eq!(payload["change_percent"], "2.00");
        assert_eq!(payload["period_low"], "240");
        assert_eq!(payload["period_high"], "279");
    }

    #[test]
    fn missing_ticker_is_not_found() {
        let snapshot = sample_snapshot();
        let err = snapshot.stock_data(Ticker::Garan).unwrap_err();
        assert!(matches!(err, DataError::NotFound(ref s) if s == "GARAN"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, serde_json::to_string(&sample_snapshot()).unwrap()).unwrap();

        let loaded = MarketSnapshot::load(&path).unwrap();
        assert_eq!(loaded, sample_snapshot());
        assert_eq!(loaded.closes(Ticker::Tcell).unwrap(), vec![90.0, 91.0, 92.0]);
    }
}
