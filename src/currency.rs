use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KasaError;

// ---------------------------------------------------------------------------
// Currencies
// ---------------------------------------------------------------------------

/// The four currency columns every ledger row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Dolar,
    Euro,
    Zl,
    Tl,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Self::Dolar, Self::Euro, Self::Zl, Self::Tl];

    /// Column key used in SQL and in settings.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Dolar => "dolar",
            Self::Euro => "euro",
            Self::Zl => "zl",
            Self::Tl => "tl",
        }
    }

    /// Spreadsheet header for this currency.
    pub fn header(&self) -> &'static str {
        match self {
            Self::Dolar => "Dolar",
            Self::Euro => "Euro",
            Self::Zl => "ZL",
            Self::Tl => "T.L",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Dolar => "$",
            Self::Euro => "\u{20ac}",
            Self::Zl => "z\u{142}",
            Self::Tl => "\u{20ba}",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Currency {
    type Err = KasaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dolar" | "dollar" | "usd" | "$" => Ok(Self::Dolar),
            "euro" | "eur" | "\u{20ac}" => Ok(Self::Euro),
            "zl" | "z\u{142}" | "pln" => Ok(Self::Zl),
            "tl" | "t.l" | "try" | "\u{20ba}" => Ok(Self::Tl),
            other => Err(KasaError::Other(format!(
                "Unknown currency '{other}' (expected dolar, euro, zl or tl)"
            ))),
        }
    }
}

/// Amounts in all four currencies at once.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Amounts {
    pub dolar: f64,
    pub euro: f64,
    pub zl: f64,
    pub tl: f64,
}

impl Amounts {
    pub fn new(dolar: f64, euro: f64, zl: f64, tl: f64) -> Self {
        Self { dolar, euro, zl, tl }
    }

    pub fn single(currency: Currency, value: f64) -> Self {
        let mut amounts = Self::default();
        *amounts.get_mut(currency) = value;
        amounts
    }

    pub fn get(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Dolar => self.dolar,
            Currency::Euro => self.euro,
            Currency::Zl => self.zl,
            Currency::Tl => self.tl,
        }
    }

    pub fn get_mut(&mut self, currency: Currency) -> &mut f64 {
        match currency {
            Currency::Dolar => &mut self.dolar,
            Currency::Euro => &mut self.euro,
            Currency::Zl => &mut self.zl,
            Currency::Tl => &mut self.tl,
        }
    }

    pub fn is_finite(&self) -> bool {
        Currency::ALL.iter().all(|c| self.get(*c).is_finite())
    }

    /// Largest per-currency difference against `other`.
    pub fn max_drift(&self, other: &Amounts) -> f64 {
        Currency::ALL
            .iter()
            .map(|c| (self.get(*c) - other.get(*c)).abs())
            .fold(0.0, f64::max)
    }
}

impl Add for Amounts {
    type Output = Amounts;

    fn add(self, rhs: Amounts) -> Amounts {
        Amounts::new(
            self.dolar + rhs.dolar,
            self.euro + rhs.euro,
            self.zl + rhs.zl,
            self.tl + rhs.tl,
        )
    }
}

impl AddAssign for Amounts {
    fn add_assign(&mut self, rhs: Amounts) {
        *self = *self + rhs;
    }
}

impl Sub for Amounts {
    type Output = Amounts;

    fn sub(self, rhs: Amounts) -> Amounts {
        self + (-rhs)
    }
}

impl Neg for Amounts {
    type Output = Amounts;

    fn neg(self) -> Amounts {
        Amounts::new(-self.dolar, -self.euro, -self.zl, -self.tl)
    }
}

// ---------------------------------------------------------------------------
// M/Y currency tags
// ---------------------------------------------------------------------------

/// Value of a tagged cell split by suffix letter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TagPair {
    pub m: f64,
    pub y: f64,
}

impl TagPair {
    pub fn is_zero(&self) -> bool {
        self.m == 0.0 && self.y == 0.0
    }
}

impl Add for TagPair {
    type Output = TagPair;

    fn add(self, rhs: TagPair) -> TagPair {
        TagPair {
            m: self.m + rhs.m,
            y: self.y + rhs.y,
        }
    }
}

/// Which ledger currency each tag letter lands in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagMapping {
    pub m: Currency,
    pub y: Currency,
}

impl Default for TagMapping {
    fn default() -> Self {
        Self {
            m: Currency::Zl,
            y: Currency::Tl,
        }
    }
}

impl TagMapping {
    pub fn to_amounts(&self, pair: TagPair) -> Amounts {
        Amounts::single(self.m, pair.m) + Amounts::single(self.y, pair.y)
    }
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([+-]?\d+(?:[.,]\d+)?)\s*([my])?").expect("tag pattern compiles")
    })
}

/// Parse a cell such as `"150Y"`, `"30M"` or `"100M 20Y"`.
///
/// A number without a suffix counts toward `m`. If anything other than
/// separators is left over after the tagged numbers, the whole cell is
/// treated as unparseable and yields zero.
pub fn parse_tag(raw: &str) -> TagPair {
    let s = raw.trim();
    let mut pair = TagPair::default();
    let mut consumed = 0usize;
    let mut leftover = String::new();

    for caps in tag_regex().captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        leftover.push_str(&s[consumed..whole.start()]);
        consumed = whole.end();

        let value: f64 = caps[1].replace(',', ".").parse().unwrap_or(0.0);
        match caps.get(2).map(|m| m.as_str()) {
            Some("Y") | Some("y") => pair.y += value,
            _ => pair.m += value,
        }
    }
    leftover.push_str(&s[consumed..]);

    if leftover.chars().any(|c| !(c.is_whitespace() || matches!(c, '+' | ';' | '/'))) {
        return TagPair::default();
    }
    pair
}

// ---------------------------------------------------------------------------
// Plain amount cells
// ---------------------------------------------------------------------------

/// Parse a plain numeric cell, returning 0 when it is not a number.
///
/// Accepts both `1,234.56` and `1.234,56`. A lone comma is a decimal
/// separator when followed by one or two digits, otherwise a thousands
/// separator.
pub fn parse_amount(raw: &str) -> f64 {
    let mut s: String = raw
        .trim()
        .trim_matches('"')
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '\u{20ac}' | '\u{20ba}'))
        .collect();
    for suffix in ["z\u{142}", "TL", "PLN", "USD", "EUR"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.to_string();
        }
    }

    let negative_parens = s.starts_with('(') && s.ends_with(')');
    if negative_parens {
        s = s[1..s.len() - 1].to_string();
    }

    let normalized = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = s.len() - comma - 1;
            if s.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        _ => s,
    };

    // f64 parsing takes "inf" and "NaN"; neither is an amount.
    let value = normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);
    if negative_parens {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_suffixes() {
        assert_eq!(parse_tag("150Y"), TagPair { m: 0.0, y: 150.0 });
        assert_eq!(parse_tag("30M"), TagPair { m: 30.0, y: 0.0 });
        assert_eq!(parse_tag(" 30m "), TagPair { m: 30.0, y: 0.0 });
        assert_eq!(parse_tag("12,5y"), TagPair { m: 0.0, y: 12.5 });
    }

    #[test]
    fn test_parse_tag_bare_number_counts_as_m() {
        assert_eq!(parse_tag("40"), TagPair { m: 40.0, y: 0.0 });
        assert_eq!(parse_tag("7.25"), TagPair { m: 7.25, y: 0.0 });
    }

    #[test]
    fn test_parse_tag_multiple_parts() {
        assert_eq!(parse_tag("100M 20Y"), TagPair { m: 100.0, y: 20.0 });
        assert_eq!(parse_tag("100M+20Y"), TagPair { m: 100.0, y: 20.0 });
        assert_eq!(parse_tag("10Y; 5Y"), TagPair { m: 0.0, y: 15.0 });
        assert_eq!(parse_tag("150 Y"), TagPair { m: 0.0, y: 150.0 });
    }

    #[test]
    fn test_parse_tag_unparseable_is_zero() {
        assert!(parse_tag("").is_zero());
        assert!(parse_tag("abc").is_zero());
        assert!(parse_tag("30X").is_zero());
        assert!(parse_tag("150 Yusuf").is_zero());
    }

    #[test]
    fn test_tag_mapping_routes_letters() {
        let mapping = TagMapping {
            m: Currency::Dolar,
            y: Currency::Euro,
        };
        let amounts = mapping.to_amounts(TagPair { m: 3.0, y: 4.0 });
        assert_eq!(amounts, Amounts::new(3.0, 4.0, 0.0, 0.0));

        let same = TagMapping {
            m: Currency::Tl,
            y: Currency::Tl,
        };
        assert_eq!(same.to_amounts(TagPair { m: 3.0, y: 4.0 }).tl, 7.0);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("1.234,56"), 1234.56);
        assert_eq!(parse_amount("12,5"), 12.5);
        assert_eq!(parse_amount("1,500"), 1500.0);
        assert_eq!(parse_amount("\"500.00\""), 500.0);
        assert_eq!(parse_amount("  -42.50  "), -42.5);
        assert_eq!(parse_amount("(50.00)"), -50.0);
        assert_eq!(parse_amount("$75"), 75.0);
        assert_eq!(parse_amount("120 TL"), 120.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("n/a"), 0.0);
    }

    #[test]
    fn test_parse_amount_non_finite_is_zero() {
        for raw in ["inf", "-inf", "Infinity", "NaN", "nan", "(inf)", "1e400"] {
            assert_eq!(parse_amount(raw), 0.0, "{raw}");
        }
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Dolar);
        assert_eq!("T.L".parse::<Currency>().unwrap(), Currency::Tl);
        assert_eq!("zl".parse::<Currency>().unwrap(), Currency::Zl);
        assert!("yen".parse::<Currency>().is_err());
    }

    #[test]
    fn test_amounts_arithmetic() {
        let a = Amounts::new(10.0, 5.0, 0.0, 1.0);
        let b = Amounts::single(Currency::Euro, 2.0);
        assert_eq!(a + b, Amounts::new(10.0, 7.0, 0.0, 1.0));
        assert_eq!(a - a, Amounts::default());
        assert!(a.is_finite());
        assert!(!Amounts::new(f64::INFINITY, 0.0, 0.0, 0.0).is_finite());
        assert!(!Amounts::single(Currency::Tl, f64::NAN).is_finite());
        assert_eq!(a.max_drift(&(a + b)), 2.0);
    }
}
