use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MacroIndicator {
    pub key: String,
    pub name: String,
    pub value: Decimal,
    pub unit: String,
    pub date: String,
}

fn indicator(key: &str, name: &str, value: Decimal, unit: &str, date: &str) -> MacroIndicator {
    MacroIndicator {
        key: key.to_string(),
        name: name.to_string(),
        value,
        unit: unit.to_string(),
        date: date.to_string(),
    }
}

/// Last published central bank series, used when the live EVDS feed is not
/// configured. Values carry their own publication dates.
pub fn fallback_indicators() -> Vec<MacroIndicator> {
    vec![
        indicator("policy_rate", "TCMB Politika Faizi", Decimal::new(450, 1), "%", "2025-01"),
        indicator("cpi_annual", "TUFE Yillik", Decimal::new(444, 1), "%", "2024-12"),
        indicator("ppi_annual", "UFE Yillik", Decimal::new(290, 1), "%", "2024-12"),
        indicator("usd_try", "USD/TRY", Decimal::new(352, 1), "TL", "2025-01"),
        indicator("eur_try", "EUR/TRY", Decimal::new(365, 1), "TL", "2025-01"),
    ]
}

pub fn macro_data() -> serde_json::Value {
    serde_json::json!({
        "indicators": fallback_indicators(),
        "source": "TCMB EVDS (son yayinlanan degerler)",
        "fetch_date": chrono::Utc::now().format("%Y-%m-%d").to_string(),
        "note": "Bu veriler guncel olmayabilir; tarihleri her gostergede belirtilmistir.",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_has_rate_inflation_and_fx() {
        let indicators = fallback_indicators();
        let keys: Vec<&str> = indicators.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["policy_rate", "cpi_annual", "ppi_annual", "usd_try", "eur_try"]);
        assert_eq!(indicators[0].value, Decimal::new(45, 0));
    }

    #[test]
    fn payload_carries_source_and_note() {
        let payload = macro_data();
        assert_eq!(payload["indicators"].as_array().unwrap().len(), 5);
        assert!(payload["note"].as_str().unwrap().contains("guncel"));
    }
}
