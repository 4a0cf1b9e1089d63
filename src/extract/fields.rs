//! Tolerant coercions for fields of a model reply.
//!
//! The model is asked for strings and numbers but routinely answers with
//! arrays, numeric strings with units, or ISO 8601 durations. Each helper
//! accepts those shapes and yields `None` for anything it cannot read.

use html_escape::decode_html_entities;
use serde_json::Value;

/// Text field; arrays are joined one item per line.
pub fn text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => decode_html_symbols(s.trim()),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(list_item)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };

    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Duration in minutes.
pub fn minutes(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_f64().and_then(whole_number),
        Value::String(s) => {
            let s = s.trim();
            iso_duration_minutes(s).or_else(|| leading_number(s))
        }
        _ => None,
    }
}

/// Plain count such as servings.
pub fn count(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_f64().and_then(whole_number),
        Value::String(s) => leading_number(s),
        _ => None,
    }
}

fn list_item(item: &Value) -> Option<String> {
    let raw = match item {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let decoded = decode_html_symbols(raw.trim());
    (!decoded.is_empty()).then_some(decoded)
}

fn decode_html_symbols(text: &str) -> String {
    // Some pages double-encode entities
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn whole_number(n: f64) -> Option<u32> {
    (n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX)).then(|| n.round() as u32)
}

/// "30", "30 minutos", "4-6 porções", "1,5" -> first number, rounded
fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    digits.parse::<f64>().ok().and_then(whole_number)
}

/// PT30M -> 30, PT1H30M -> 90, PT5400.0S -> 90, PT15-20M -> 15
fn iso_duration_minutes(duration: &str) -> Option<u32> {
    let upper = duration.to_ascii_uppercase();
    let rest = upper.strip_prefix("PT")?;

    let mut total = 0.0_f64;
    let mut number = String::new();
    let mut range_start: Option<String> = None;
    let mut seen_unit = false;

    for c in rest.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            '-' => {
                if range_start.is_none() {
                    range_start = Some(std::mem::take(&mut number));
                } else {
                    number.clear();
                }
            }
            'H' | 'M' | 'S' => {
                let digits = range_start
                    .take()
                    .unwrap_or_else(|| std::mem::take(&mut number));
                number.clear();
                let amount: f64 = digits.parse().ok()?;
                total += match c {
                    'H' => amount * 60.0,
                    'M' => amount,
                    _ => amount / 60.0,
                };
                seen_unit = true;
            }
            _ => return None,
        }
    }

    if seen_unit {
        whole_number(total)
    } else {
        None
    }
}
