//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., shekels, not agorot).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display (e.g., "₪79", "₪0.5").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{}", self.currency_code.symbol(), self.amount.normalize())
    }
}

/// ISO 4217 currency codes used by the billing plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    ILS,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Currency symbol for display.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::ILS => "₪",
            Self::USD => "$",
            Self::EUR => "€",
        }
    }

    /// ISO 4217 code as sent to the Shopify billing API.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ILS => "ILS",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    /// Look up a supported currency by ISO code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ILS" => Some(Self::ILS),
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display_drops_trailing_zeros() {
        let price = Price::new(Decimal::new(7900, 2), CurrencyCode::ILS);
        assert_eq!(price.display(), "₪79");

        let price = Price::new(Decimal::new(5, 1), CurrencyCode::ILS);
        assert_eq!(price.display(), "₪0.5");
    }

    #[test]
    fn test_currency_code_serializes_as_iso() {
        let json = serde_json::to_string(&CurrencyCode::ILS).expect("serialize");
        assert_eq!(json, "\"ILS\"");
        assert_eq!(CurrencyCode::USD.code(), "USD");
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(CurrencyCode::from_code("ils"), Some(CurrencyCode::ILS));
        assert_eq!(CurrencyCode::from_code("GBP"), None);
    }
}
