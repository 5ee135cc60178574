// ===============================
// src/decode.rs
// ===============================
//
// Bybit V5 private `execution` frames -> ExecutionEvent.
//
// Contoh payload:
// {"topic":"execution","id":"..","creationTime":1672364174455,
//  "data":[{"category":"linear","symbol":"XRPUSDT","execFee":"0.005061",
//           "execId":"7e2ae69c-..","execPrice":"0.3374","execQty":"25",
//           "execValue":"8.435","execPnl":"0.12","orderId":"f6e324ff-..",
//           "side":"Sell","execTime":"1672364174443", ...}]}
//
// Frames on other topics (or control frames) yield nothing. A record with
// junk in a field just gets None for that field; it never poisons its siblings.
//
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Category, ExecutionEvent, Side};

pub const EXECUTION_TOPIC: &str = "execution";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("execution frame has no `data` array")]
    MissingData,
}

pub fn decode_message(raw: &str) -> Result<Vec<ExecutionEvent>, DecodeError> {
    let root: Value = serde_json::from_str(raw)?;

    if root.get("topic").and_then(Value::as_str) != Some(EXECUTION_TOPIC) {
        return Ok(Vec::new());
    }

    let data = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or(DecodeError::MissingData)?;

    Ok(data.iter().filter_map(decode_record).collect())
}

/// Non-object entries in `data` are dropped; objects always decode.
pub fn decode_record(rec: &Value) -> Option<ExecutionEvent> {
    if !rec.is_object() {
        return None;
    }

    let category_raw = text(rec, "category");
    let side_raw = text(rec, "side");

    Some(ExecutionEvent {
        category: Category::parse(category_raw.as_deref()),
        side: side_raw.as_deref().and_then(Side::parse),
        category_raw,
        side_raw,
        exec_id: text(rec, "execId"),
        order_id: text(rec, "orderId"),
        symbol: text(rec, "symbol"),
        exec_qty: decimal(rec, "execQty"),
        exec_price: decimal(rec, "execPrice"),
        exec_value: decimal(rec, "execValue"),
        exec_fee: decimal(rec, "execFee"),
        exec_pnl: decimal(rec, "execPnl"),
        exec_time_ms: text(rec, "execTime").and_then(|s| s.parse().ok()),
    })
}

/// Missing / null -> None. Numbers and bools are stringified.
fn text(rec: &Value, field: &str) -> Option<String> {
    match rec.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Empty, unparseable, or not representable without rounding -> None,
/// never an error.
fn decimal(rec: &Value, field: &str) -> Option<Decimal> {
    let s = text(rec, field)?;
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains(['e', 'E']) {
        return Decimal::from_scientific(s).ok();
    }
    Decimal::from_str_exact(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn other_topics_and_control_frames_yield_nothing() {
        assert!(decode_message(r#"{"topic":"order","data":[{"orderId":"x"}]}"#).unwrap().is_empty());
        assert!(decode_message(r#"{"op":"pong","success":true}"#).unwrap().is_empty());
        assert!(decode_message(r#"{"topic":"Execution","data":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(decode_message("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode_message(r#"{"topic":"execution","data":{"orderId":"x"}}"#),
            Err(DecodeError::MissingData)
        ));
        assert!(matches!(
            decode_message(r#"{"topic":"execution"}"#),
            Err(DecodeError::MissingData)
        ));
    }

    #[test]
    fn decodes_full_linear_record() {
        let raw = r#"{"topic":"execution","data":[{
            "category":"linear","symbol":"XRPUSDT","execFee":"0.005061",
            "execId":"e1","execPrice":"0.3374","execQty":"25","execValue":"8.435",
            "execPnl":"0.12","orderId":"o1","side":"Sell","execTime":"1672364174443"}]}"#;
        let evs = decode_message(raw).unwrap();
        assert_eq!(evs.len(), 1);
        let ev = &evs[0];
        assert_eq!(ev.category, Category::Derivative);
        assert_eq!(ev.category_raw.as_deref(), Some("linear"));
        assert_eq!(ev.order_id.as_deref(), Some("o1"));
        assert_eq!(ev.symbol.as_deref(), Some("XRPUSDT"));
        assert_eq!(ev.side, Some(Side::Sell));
        assert_eq!(ev.exec_qty, Some(dec!(25)));
        assert_eq!(ev.exec_value, Some(dec!(8.435)));
        assert_eq!(ev.exec_fee, Some(dec!(0.005061)));
        assert_eq!(ev.exec_pnl, Some(dec!(0.12)));
        assert_eq!(ev.exec_time_ms, Some(1672364174443));
    }

    #[test]
    fn category_and_side_are_case_insensitive() {
        let raw = r#"{"topic":"execution","data":[
            {"category":"SPOT","side":"bUy"},
            {"category":"Spot","side":"SELL"},
            {"category":"inverse","side":"hold"}]}"#;
        let evs = decode_message(raw).unwrap();
        assert_eq!(evs[0].category, Category::Spot);
        assert_eq!(evs[0].side, Some(Side::Buy));
        assert_eq!(evs[1].category, Category::Spot);
        assert_eq!(evs[1].side, Some(Side::Sell));
        assert_eq!(evs[2].category, Category::Derivative);
        assert_eq!(evs[2].side, None);
        assert_eq!(evs[2].side_raw.as_deref(), Some("hold"));
    }

    #[test]
    fn bad_numbers_and_nulls_degrade_to_none() {
        let raw = r#"{"topic":"execution","data":[{
            "category":"linear","orderId":null,"execPnl":"abc","execFee":"",
            "execQty":12.5,"execValue":"1e2"}]}"#;
        let ev = &decode_message(raw).unwrap()[0];
        assert_eq!(ev.order_id, None);
        assert_eq!(ev.symbol, None);
        assert_eq!(ev.exec_pnl, None);
        assert_eq!(ev.exec_fee, None);
        assert_eq!(ev.exec_qty, Some(dec!(12.5)));
        assert_eq!(ev.exec_value, Some(dec!(100)));
    }

    #[test]
    fn numbers_beyond_decimal_precision_are_absent() {
        let raw = r#"{"topic":"execution","data":[{
            "category":"linear",
            "execPnl":"79228162514264337593543950335",
            "execFee":"1.00000000000000000000000000001",
            "execValue":"79228162514264337593543950336",
            "execQty":"0.0000000000000000000000000001"}]}"#;
        let ev = &decode_message(raw).unwrap()[0];
        assert_eq!(ev.exec_pnl, Some(Decimal::MAX));
        // would round to 1
        assert_eq!(ev.exec_fee, None);
        assert_eq!(ev.exec_value, None);
        assert_eq!(ev.exec_qty, Some(Decimal::new(1, 28)));
    }

    #[test]
    fn non_object_entries_do_not_stop_siblings() {
        let raw = r#"{"topic":"execution","data":[42,"x",{"category":"linear","execPnl":"1"},null]}"#;
        let evs = decode_message(raw).unwrap();
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].exec_pnl, Some(dec!(1)));
    }
}
