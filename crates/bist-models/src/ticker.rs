use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed BIST universe the agent answers questions about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ticker {
    Thyao,
    Akbnk,
    Garan,
    Sise,
    Tuprs,
    Eregl,
    Kchol,
    Sahol,
    Tcell,
    Bimas,
}

impl Ticker {
    pub const ALL: [Ticker; 10] = [
        Ticker::Thyao,
        Ticker::Akbnk,
        Ticker::Garan,
        Ticker::Sise,
        Ticker::Tuprs,
        Ticker::Eregl,
        Ticker::Kchol,
        Ticker::Sahol,
        Ticker::Tcell,
        Ticker::Bimas,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Ticker::Thyao => "THYAO",
            Ticker::Akbnk => "AKBNK",
            Ticker::Garan => "GARAN",
            Ticker::Sise => "SISE",
            Ticker::Tuprs => "TUPRS",
            Ticker::Eregl => "EREGL",
            Ticker::Kchol => "KCHOL",
            Ticker::Sahol => "SAHOL",
            Ticker::Tcell => "TCELL",
            Ticker::Bimas => "BIMAS",
        }
    }

    pub fn sector(&self) -> Sector {
        match self {
            Ticker::Thyao => Sector::Aviation,
            Ticker::Akbnk | Ticker::Garan => Sector::Banking,
            Ticker::Sise => Sector::Industrials,
            Ticker::Tuprs => Sector::Energy,
            Ticker::Eregl => Sector::Steel,
            Ticker::Kchol | Ticker::Sahol => Sector::Holding,
            Ticker::Tcell => Sector::Telecom,
            Ticker::Bimas => Sector::Retail,
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Ticker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Ticker::ALL
            .iter()
            .copied()
            .find(|t| t.symbol() == upper)
            .ok_or_else(|| format!("unknown ticker: {s}"))
    }
}

/// Industry grouping used to expand sector and peer-comparison queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Aviation,
    Banking,
    Industrials,
    Energy,
    Steel,
    Holding,
    Telecom,
    Retail,
}

impl Sector {
    pub const ALL: [Sector; 8] = [
        Sector::Aviation,
        Sector::Banking,
        Sector::Industrials,
        Sector::Energy,
        Sector::Steel,
        Sector::Holding,
        Sector::Telecom,
        Sector::Retail,
    ];

    /// Lowercase, ASCII-folded keyword stems that name this sector in a query.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Sector::Aviation => &["havacilik", "havayol", "aviation", "airline"],
            Sector::Banking => &["banka", "banking", "bank"],
            Sector::Industrials => &["sanayi", "sisecam", "industrial"],
            Sector::Energy => &["enerji", "petrol", "rafineri", "dogalgaz", "energy"],
            Sector::Steel => &["celik", "demir", "metal", "steel"],
            Sector::Holding => &["holding"],
            Sector::Telecom => &["telekom", "iletisim", "telecom"],
            Sector::Retail => &["perakende", "market zinciri", "retail"],
        }
    }

    /// Tickers of the tracked universe belonging to this sector, in universe order.
    pub fn tickers(&self) -> Vec<Ticker> {
        Ticker::ALL
            .iter()
            .copied()
            .filter(|t| t.sector() == *self)
            .collect()
    }
}
