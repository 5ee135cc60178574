// ===============================
// src/store.rs (running realized PnL: per order, per symbol, total)
// ===============================
//
// - per-key maps are sharded (DashMap); readers only ever lock one shard
// - merges serialize on the total's write lock: all three adds are checked
//   first and applied together, or none is (overflow leaves the store as is)
// - reads never see half an add
// - merges with a missing order_id/symbol still hit the total, so the total
//   can be larger than the sum of the visible keys
//
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("adding {net} would overflow the {view} accumulator")]
    Overflow { view: &'static str, net: Decimal },
}

#[derive(Debug, Default)]
pub struct PnlStore {
    by_order: DashMap<String, Decimal, RandomState>,
    by_symbol: DashMap<String, Decimal, RandomState>,
    total: RwLock<Decimal>,
    fills: AtomicU64,
}

/// Point-in-time copy for the query API. Keys sorted for stable output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlSnapshot {
    pub total: Decimal,
    pub fills_merged: u64,
    pub by_order: Vec<KeyedPnl>,
    pub by_symbol: Vec<KeyedPnl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedPnl {
    pub key: String,
    pub realized_pnl: Decimal,
}

impl PnlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new total, as seen under the lock.
    pub fn merge(
        &self,
        order_id: Option<&str>,
        symbol: Option<&str>,
        net: Decimal,
    ) -> Result<Decimal, MergeError> {
        let mut total = self.total.write();

        let overflow = |view| MergeError::Overflow { view, net };
        let new_total = total.checked_add(net).ok_or_else(|| overflow("total"))?;
        let new_order = match order_id {
            Some(id) => Some((id, added(&self.by_order, id, net).ok_or_else(|| overflow("order"))?)),
            None => None,
        };
        let new_symbol = match symbol {
            Some(sym) => Some((sym, added(&self.by_symbol, sym, net).ok_or_else(|| overflow("symbol"))?)),
            None => None,
        };

        // semua aman, baru tulis
        if let Some((id, v)) = new_order {
            put(&self.by_order, id, v);
        }
        if let Some((sym, v)) = new_symbol {
            put(&self.by_symbol, sym, v);
        }
        *total = new_total;
        self.fills.fetch_add(1, Ordering::Relaxed);
        Ok(new_total)
    }

    pub fn realized_pnl_for_order(&self, order_id: &str) -> Decimal {
        self.by_order.get(order_id).map(|r| *r.value()).unwrap_or(Decimal::ZERO)
    }

    pub fn realized_pnl_for_symbol(&self, symbol: &str) -> Decimal {
        self.by_symbol.get(symbol).map(|r| *r.value()).unwrap_or(Decimal::ZERO)
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        *self.total.read()
    }

    pub fn fills_merged(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PnlSnapshot {
        PnlSnapshot {
            total: self.total_realized_pnl(),
            fills_merged: self.fills_merged(),
            by_order: sorted(&self.by_order),
            by_symbol: sorted(&self.by_symbol),
        }
    }
}

fn added(map: &DashMap<String, Decimal, RandomState>, key: &str, net: Decimal) -> Option<Decimal> {
    map.get(key).map(|r| *r.value()).unwrap_or(Decimal::ZERO).checked_add(net)
}

fn put(map: &DashMap<String, Decimal, RandomState>, key: &str, value: Decimal) {
    // get_mut dulu supaya tidak alokasi String untuk key yang sudah ada
    if let Some(mut v) = map.get_mut(key) {
        *v = value;
        return;
    }
    map.insert(key.to_string(), value);
}

fn sorted(map: &DashMap<String, Decimal, RandomState>) -> Vec<KeyedPnl> {
    let mut out: Vec<KeyedPnl> = map
        .iter()
        .map(|r| KeyedPnl { key: r.key().clone(), realized_pnl: *r.value() })
        .collect();
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out
}
