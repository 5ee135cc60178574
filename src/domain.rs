// ===============================
// src/domain.rs
// ===============================
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument class. Bybit sends free text ("spot", "linear", "inverse", "option");
/// only "spot" is special, everything else reports its own execPnl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category { Derivative, Spot }

impl Category {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("spot") => Category::Spot,
            _ => Category::Derivative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }

impl Side {
    /// Case-insensitive; anything other than buy/sell is not a side.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("buy") {
            Some(Side::Buy)
        } else if raw.eq_ignore_ascii_case("sell") {
            Some(Side::Sell)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Side::Buy => "Buy", Side::Sell => "Sell" }
    }
}

/// One fill from the `execution` topic. Every field is optional on the wire,
/// so everything except the derived `category` stays an Option here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub category: Category,
    pub category_raw: Option<String>,
    pub exec_id: Option<String>,
    pub order_id: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub side_raw: Option<String>,
    pub exec_qty: Option<Decimal>,
    pub exec_price: Option<Decimal>,
    pub exec_value: Option<Decimal>,
    pub exec_fee: Option<Decimal>,
    pub exec_pnl: Option<Decimal>,
    pub exec_time_ms: Option<i64>,
}

/// Lines written by the recorder (JSONL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Frame { ts_ms: i64, raw: String },
    Fill {
        ts_ms: i64,
        order_id: Option<String>,
        symbol: Option<String>,
        category: Category,
        side: Option<Side>,
        net_pnl: Decimal,
    },
    Note(String),
}
