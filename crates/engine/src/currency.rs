use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO currency code used by groups, users and their money values.
///
/// ## Minor units
///
/// The engine stores monetary values as an `i64` number of **minor units**.
/// `minor_units()` returns how many decimal digits are used when converting
/// between:
/// - major units (human input/output, e.g. `10.50 EUR`)
/// - minor units (stored integers, e.g. `1050`)
///
/// EUR has 2 minor units, so `10.50 EUR` ⇄ `1050`. The CFA francs (XAF/XOF)
/// have no minor unit, so `1500 XAF` ⇄ `1500`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Cad,
    Xaf,
    Xof,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Cad => "CAD",
            Currency::Xaf => "XAF",
            Currency::Xof => "XOF",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Eur
            | Currency::Usd
            | Currency::Gbp
            | Currency::Chf
            | Currency::Cad => 2,
            Currency::Xaf | Currency::Xof => 0,
        }
    }

    /// Formats an amount of minor units as a human-readable string.
    #[must_use]
    pub fn format_minor(self, amount_minor: i64) -> String {
        let sign = if amount_minor < 0 { "-" } else { "" };
        let abs = amount_minor.unsigned_abs();
        match self.minor_units() {
            0 => format!("{sign}{abs} {}", self.code()),
            _ => {
                let major = abs / 100;
                let minor = abs % 100;
                format!("{sign}{major}.{minor:02} {}", self.code())
            }
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "CHF" => Ok(Currency::Chf),
            "CAD" => Ok(Currency::Cad),
            "XAF" => Ok(Currency::Xaf),
            "XOF" => Ok(Currency::Xof),
            other => Err(EngineError::InvalidValue(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_minor_two_decimals() {
        assert_eq!(Currency::Eur.format_minor(0), "0.00 EUR");
        assert_eq!(Currency::Eur.format_minor(1050), "10.50 EUR");
        assert_eq!(Currency::Usd.format_minor(-1), "-0.01 USD");
    }

    #[test]
    fn format_minor_zero_decimals() {
        assert_eq!(Currency::Xaf.format_minor(1500), "1500 XAF");
        assert_eq!(Currency::Xof.format_minor(-250), "-250 XOF");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Currency::try_from("eur").unwrap(), Currency::Eur);
        assert_eq!(Currency::try_from(" XAF ").unwrap(), Currency::Xaf);
        assert!(Currency::try_from("BTC").is_err());
    }
}
