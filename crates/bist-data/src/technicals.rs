use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Fewer closes than this and no indicator is meaningful.
pub const MIN_CLOSES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalIndicators {
    pub current_price: f64,
    pub sma_20: f64,
    pub sma_50: Option<f64>,
    pub rsi_14: Option<f64>,
    pub rsi_signal: String,
    pub macd: Option<Macd>,
    pub bollinger_upper: f64,
    pub bollinger_lower: f64,
    pub support: f64,
    pub resistance: f64,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the indicator set over a close series (oldest first). Windows
/// shrink to the available history, as long as there are `MIN_CLOSES` points.
pub fn compute(symbol: &str, closes: &[f64]) -> Result<TechnicalIndicators, DataError> {
    if closes.len() < MIN_CLOSES {
        return Err(DataError::InsufficientData {
            symbol: symbol.to_string(),
            available: closes.len(),
        });
    }

    let n = closes.len();
    let current_price = closes[n - 1];
    let window = 20.min(n - 1);
    let sma_20 = sma(closes, window);
    let sma_50 = (n >= 50).then(|| sma(closes, 50));
    let rsi_14 = rsi(closes, 14.min(n - 1));
    let macd = (n >= 26).then(|| macd(closes));

    let std_dev = std_dev(&closes[n - window..]);
    let tail = &closes[n - 20.min(n)..];
    let support = tail.iter().copied().fold(f64::INFINITY, f64::min);
    let resistance = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let trend = match sma_50 {
        Some(long) if current_price > sma_20 && sma_20 > long => "Guclu Yukselis",
        Some(long) if current_price < sma_20 && sma_20 < long => "Guclu Dusus",
        _ if current_price > sma_20 => "Yukselis",
        _ if current_price < sma_20 => "Dusus",
        _ => "Yatay",
    };

    let rsi_signal = match rsi_14 {
        Some(v) if v > 70.0 => "Asiri Alim",
        Some(v) if v < 30.0 => "Asiri Satim",
        Some(_) => "Notr",
        None => "N/A",
    };

    Ok(TechnicalIndicators {
        current_price,
        sma_20,
        sma_50,
        rsi_14,
        rsi_signal: rsi_signal.to_string(),
        macd,
        bollinger_upper: sma_20 + 2.0 * std_dev,
        bollinger_lower: sma_20 - 2.0 * std_dev,
        support,
        resistance,
        trend: trend.to_string(),
    })
}

fn sma(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Simple-average RSI over the last `period` price changes.
fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period < 2 || closes.len() <= period {
        return None;
    }
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &changes[changes.len() - period..];
    let gain = recent.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let loss = -recent.iter().filter(|c| **c < 0.0).sum::<f64>() / period as f64;
    if loss == 0.0 {
        return Some(if gain == 0.0 { 50.0 } else { 100.0 });
    }
    Some(100.0 - 100.0 / (1.0 + gain / loss))
}

fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    for v in values {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

fn macd(closes: &[f64]) -> Macd {
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, 9);
    let macd = line[line.len() - 1];
    let signal = signal[signal.len() - 1];
    Macd {
        macd,
        signal,
        histogram: macd - signal,
    }
}
