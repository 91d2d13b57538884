// src/extractors/currency.rs
use once_cell::sync::Lazy;
use regex::Regex;

// Optional sign, digits, optional fraction. No exponents, no inf/nan.
static DECIMAL_NUMERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").expect("Failed to compile DECIMAL_NUMERAL_RE")
});

/// A way of turning displayed currency text into a number.
pub trait AmountFormat {
    /// Parses already-present text. Must return `None` rather than fail.
    fn parse(&self, text: &str) -> Option<f64>;
}

/// Symbol plus fixed thousands/decimal separators.
///
/// The separators are assumed, never inferred from the content: under `BRL`,
/// `"1234.56"` has its dot removed as a thousands separator and reads as `123456.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedAmountFormat {
    pub symbol: &'static str,
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl LocalizedAmountFormat {
    /// Brazilian real as printed by the portal: `R$ 1.234,56`.
    pub const BRL: Self = Self {
        symbol: "R$",
        thousands_separator: '.',
        decimal_separator: ',',
    };
}

impl Default for LocalizedAmountFormat {
    fn default() -> Self {
        Self::BRL
    }
}

impl AmountFormat for LocalizedAmountFormat {
    fn parse(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let cleaned = text.replace(self.symbol, "").replace('\u{a0}', " ");
        let numeral: String = cleaned
            .trim()
            .chars()
            .filter(|c| *c != self.thousands_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();

        if !DECIMAL_NUMERAL_RE.is_match(&numeral) {
            tracing::trace!("Not a decimal numeral after cleanup: {:?} -> {:?}", text, numeral);
            return None;
        }
        numeral.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Parses portal currency text with the default (BRL) format.
pub fn parse_amount(text: Option<&str>) -> Option<f64> {
    parse_amount_with(&LocalizedAmountFormat::BRL, text)
}

pub fn parse_amount_with<F: AmountFormat + ?Sized>(format: &F, text: Option<&str>) -> Option<f64> {
    text.and_then(|t| format.parse(t))
}
