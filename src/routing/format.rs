//! Response helpers shared by handlers

use serde_json::{json, Value};

/// `"USD 1,234.56"`; negative values keep the sign after the currency code
pub fn format_currency(value: f64, currency: &str) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{currency} {sign}{grouped}.{cents}")
}

/// Wrap a handler result as `{result, metadata?}`; empty metadata is omitted
pub fn build_response_payload(result: Value, metadata: Option<Value>) -> Value {
    let mut payload = json!({ "result": result });
    if let Some(metadata) = metadata {
        let empty = metadata.is_null() || metadata.as_object().is_some_and(|m| m.is_empty());
        if !empty {
            payload["metadata"] = metadata;
        }
    }
    payload
}
