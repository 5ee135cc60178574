// ===============================
// src/pnl.rs (net realized PnL per fill)
// ===============================
//
// Derivative fills carry execPnl from the exchange, so net = execPnl - fee.
// Spot fills don't, so we use signed notional instead:
//   Sell -> +execValue - fee
//   Buy  -> -execValue - fee
// Missing fee counts as zero. Everything else that can't be priced is a skip,
// including results that don't fit in a Decimal.
//
use rust_decimal::Decimal;

use crate::domain::{Category, ExecutionEvent, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Derivative fill without execPnl.
    MissingExecPnl,
    /// Spot fill whose side is neither Buy nor Sell.
    UnknownSide,
    /// Spot fill with a valid side but no execValue.
    MissingExecValue,
    /// Net PnL falls outside what a Decimal can hold.
    Overflow,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingExecPnl => "skip_missing_exec_pnl",
            SkipReason::UnknownSide => "skip_unknown_side",
            SkipReason::MissingExecValue => "skip_missing_exec_value",
            SkipReason::Overflow => "skip_overflow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pricing {
    Net(Decimal),
    Skip(SkipReason),
}

pub fn price(ev: &ExecutionEvent) -> Pricing {
    let fee = ev.exec_fee.unwrap_or(Decimal::ZERO);

    match ev.category {
        Category::Derivative => match ev.exec_pnl {
            Some(pnl) => checked(pnl.checked_sub(fee)),
            None => Pricing::Skip(SkipReason::MissingExecPnl),
        },
        Category::Spot => {
            let Some(side) = ev.side else {
                return Pricing::Skip(SkipReason::UnknownSide);
            };
            let Some(value) = ev.exec_value else {
                return Pricing::Skip(SkipReason::MissingExecValue);
            };
            match side {
                Side::Sell => checked(value.checked_sub(fee)),
                Side::Buy => checked((-value).checked_sub(fee)),
            }
        }
    }
}

fn checked(net: Option<Decimal>) -> Pricing {
    net.map_or(Pricing::Skip(SkipReason::Overflow), Pricing::Net)
}
