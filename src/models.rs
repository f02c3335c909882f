use crate::currency::{Amounts, Currency, TagPair};

/// A ledger row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub name: String,
    pub amounts: Amounts,
    pub vehicle: Option<String>,
    pub container: Option<String>,
    pub price: Option<f64>,
    pub notes: Option<String>,
    pub source: String,
}

/// A ledger row before insert, from a form or a spreadsheet line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTransaction {
    pub date: String,
    pub name: String,
    pub amounts: Amounts,
    pub vehicle: Option<String>,
    pub container: Option<String>,
    pub price: Option<f64>,
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn new(date: &str, name: &str, amounts: Amounts) -> Self {
        Self {
            date: date.to_string(),
            name: name.to_string(),
            amounts,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub balance: Amounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeItem {
    pub category: String,
    pub raw: String,
    pub value: TagPair,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub id: i64,
    pub date: String,
    pub vehicle: String,
    pub notes: Option<String>,
    pub items: Vec<OutcomeItem>,
}

impl Outcome {
    pub fn total(&self) -> TagPair {
        self.items
            .iter()
            .fold(TagPair::default(), |acc, item| acc + item.value)
    }
}

/// Expense entry with its categories still as raw text cells.
#[derive(Debug, Clone, Default)]
pub struct NewOutcome {
    pub date: String,
    pub vehicle: String,
    pub notes: Option<String>,
    /// (category, raw cell text)
    pub items: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn key(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "in" | "giri\u{15f}" | "incoming" => Some(Self::In),
            "out" | "\u{e7}\u{131}k\u{131}\u{15f}" | "outgoing" => Some(Self::Out),
            _ => None,
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            Self::In => 1.0,
            Self::Out => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub id: i64,
    pub date: String,
    pub counterpart: String,
    pub direction: Direction,
    pub amount: f64,
    pub currency: Currency,
    pub commission: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub date: String,
    pub counterpart: String,
    pub direction: Direction,
    pub amount: f64,
    pub currency: Currency,
    pub commission: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}
