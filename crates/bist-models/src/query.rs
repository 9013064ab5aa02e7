use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Intent category a free-text query is classified into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Fundamental,
    Technical,
    Macro,
    Portfolio,
    Comprehensive,
    Sector,
    Comparison,
    Risk,
    #[default]
    Unknown,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 9] = [
        QueryCategory::Fundamental,
        QueryCategory::Technical,
        QueryCategory::Macro,
        QueryCategory::Portfolio,
        QueryCategory::Comprehensive,
        QueryCategory::Sector,
        QueryCategory::Comparison,
        QueryCategory::Risk,
        QueryCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::Fundamental => "fundamental",
            QueryCategory::Technical => "technical",
            QueryCategory::Macro => "macro",
            QueryCategory::Portfolio => "portfolio",
            QueryCategory::Comprehensive => "comprehensive",
            QueryCategory::Sector => "sector",
            QueryCategory::Comparison => "comparison",
            QueryCategory::Risk => "risk",
            QueryCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which workflow capabilities are switched on for a run. Ablations toggle these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CapabilityFlags {
    pub rag: bool,
    pub tools: bool,
}

impl CapabilityFlags {
    pub const ALL: CapabilityFlags = CapabilityFlags {
        rag: true,
        tools: true,
    };
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self::ALL
    }
}

/// How many worked examples the synthesis prompt carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptingMode {
    ZeroShot,
    OneShot,
    #[default]
    FewShot,
}

impl PromptingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptingMode::ZeroShot => "zero_shot",
            PromptingMode::OneShot => "one_shot",
            PromptingMode::FewShot => "few_shot",
        }
    }
}

impl fmt::Display for PromptingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "zero_shot" | "0-shot" => Ok(PromptingMode::ZeroShot),
            "one" | "one_shot" | "1-shot" => Ok(PromptingMode::OneShot),
            "few" | "few_shot" | "3-shot" => Ok(PromptingMode::FewShot),
            other => Err(format!("unknown prompting mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip_snake_case() {
        for category in QueryCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            let parsed: QueryCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn prompting_mode_aliases() {
        assert_eq!("0-shot".parse::<PromptingMode>().unwrap(), PromptingMode::ZeroShot);
        assert_eq!("one".parse::<PromptingMode>().unwrap(), PromptingMode::OneShot);
        assert_eq!("FEW_SHOT".parse::<PromptingMode>().unwrap(), PromptingMode::FewShot);
        assert!("two".parse::<PromptingMode>().is_err());
    }
}
