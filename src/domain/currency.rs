use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::domain::model::ValueError;

/// 固定的貨幣對照表，同時支援 symbol -> code 與 code -> symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Inr,
}

const TABLE: [(Currency, &str, &str); 5] = [
    (Currency::Usd, "$", "USD"),
    (Currency::Eur, "€", "EUR"),
    (Currency::Gbp, "£", "GBP"),
    (Currency::Jpy, "¥", "JPY"),
    (Currency::Inr, "₹", "INR"),
];

impl Currency {
    pub fn from_symbol(symbol: &str) -> Result<Self, ValueError> {
        TABLE
            .iter()
            .find(|(_, s, _)| *s == symbol)
            .map(|(c, _, _)| *c)
            .ok_or_else(|| ValueError::UnsupportedCurrency(symbol.to_string()))
    }

    /// Codes are matched case-insensitively ("usd" == "USD").
    pub fn from_code(code: &str) -> Result<Self, ValueError> {
        let code = code.trim();
        TABLE
            .iter()
            .find(|(_, _, c)| c.eq_ignore_ascii_case(code))
            .map(|(c, _, _)| *c)
            .ok_or_else(|| ValueError::UnsupportedCurrency(code.to_string()))
    }

    pub fn symbol(&self) -> &'static str {
        self.entry().1
    }

    pub fn code(&self) -> &'static str {
        self.entry().2
    }

    fn entry(&self) -> &'static (Currency, &'static str, &'static str) {
        // 每個 variant 在 TABLE 中都有對應項目
        &TABLE[*self as usize]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Currency::from_code(&code).map_err(serde::de::Error::custom)
    }
}
