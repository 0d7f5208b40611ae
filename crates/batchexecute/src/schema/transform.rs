//! Post-processors applied to a field's raw value after a successful lookup.
//!
//! Every transform is total and pure: malformed input produces a defined
//! value (usually `null`, which the record layer then replaces with the
//! field's literal fallback) rather than an error.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::extract::nested_lookup;
use crate::value::Value;

/// Price fields are carried as micro-units of the currency.
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Number of rating buckets in a histogram (1 to 5 stars).
pub const HISTOGRAM_BUCKETS: usize = 5;

/// A named, side-effect-free post-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// `<br>` → CRLF, then decode HTML entities.
    UnescapeText,
    /// Rating container → five bucket counts.
    Histogram,
    /// Micro-currency integer → currency units.
    MicroPrice,
    /// Price code of exactly zero → `true`.
    FreeFlag,
    /// Unix epoch seconds → ISO-8601 UTC string (`""` if not numeric).
    EpochToIso,
    /// Payload truthiness → bool.
    Truthy,
    /// Developer page link → the `id=` query value.
    DeveloperId,
    /// Screenshot entries → image URLs.
    Screenshots,
    /// Comment entries → comment texts.
    Comments,
    /// Detail container → `[{name, id}]` categories.
    Categories,
    /// Permission entries → sorted permission names.
    SortedNames,
}

impl Transform {
    /// Applies the transform to a raw value.
    pub fn apply(self, raw: &Value) -> Value {
        match self {
            Self::UnescapeText => raw.as_str().map_or(Value::Null, |s| unescape_text(s).into()),
            Self::Histogram => Value::Array(
                process_histogram(raw)
                    .into_iter()
                    .map(|count| Value::Number(count as f64))
                    .collect(),
            ),
            Self::MicroPrice => process_price(raw).map_or(Value::Null, Value::Number),
            Self::FreeFlag => Value::Bool(process_free_flag(raw)),
            Self::EpochToIso => Value::String(epoch_to_iso(raw)),
            Self::Truthy => Value::Bool(raw.is_truthy()),
            Self::DeveloperId => raw
                .as_str()
                .and_then(|s| s.split("id=").nth(1))
                .map_or(Value::Null, Value::from),
            Self::Screenshots => map_entries(raw, &[3, 2]),
            Self::Comments => map_entries(raw, &[4]),
            Self::Categories => categories(raw),
            Self::SortedNames => sorted_names(raw),
        }
    }
}

/// Replaces `<br>` with CRLF and decodes HTML entities.
pub fn unescape_text(s: &str) -> String {
    html_escape::decode_html_entities(&s.replace("<br>", "\r\n")).into_owned()
}

/// Reads the five rating buckets at indices 1 through 5 of `container`.
///
/// A bucket is either a bare count or a `[label, count]` pair. Index 0 is
/// ignored. Anything malformed yields all zeros.
pub fn process_histogram(container: &Value) -> [u64; HISTOGRAM_BUCKETS] {
    let mut counts = [0u64; HISTOGRAM_BUCKETS];
    let Some(items) = container.as_array() else {
        return counts;
    };
    if items.len() <= HISTOGRAM_BUCKETS {
        return counts;
    }
    for (slot, bucket) in counts.iter_mut().zip(&items[1..=HISTOGRAM_BUCKETS]) {
        let count = match bucket {
            Value::Array(pair) => pair.get(1).and_then(Value::as_i64),
            other => other.as_i64(),
        };
        match count {
            Some(n) if n >= 0 => *slot = n as u64,
            _ => return [0; HISTOGRAM_BUCKETS],
        }
    }
    counts
}

/// Divides a micro-unit price by 1,000,000.
pub fn process_price(raw: &Value) -> Option<f64> {
    raw.as_f64().map(|micros| micros / MICROS_PER_UNIT)
}

/// `true` only for a numeric price code of exactly zero.
pub fn process_free_flag(raw: &Value) -> bool {
    raw.as_f64() == Some(0.0)
}

/// Formats epoch seconds as `YYYY-MM-DDTHH:MM:SSZ`; `""` when not numeric.
pub fn epoch_to_iso(raw: &Value) -> String {
    raw.as_f64()
        .and_then(|secs| DateTime::from_timestamp(secs.trunc() as i64, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn map_entries(container: &Value, path: &[usize]) -> Value {
    let Some(items) = container.as_array() else {
        return Value::Null;
    };
    let mapped: Option<Vec<Value>> = items
        .iter()
        .map(|item| nested_lookup(item, path).ok().cloned())
        .collect();
    mapped.map_or(Value::Null, Value::Array)
}

fn categories(container: &Value) -> Value {
    let mut found = Vec::new();
    if let Ok(tree) = nested_lookup(container, &[118]) {
        collect_categories(tree, &mut found);
    }
    if found.is_empty() {
        // Genre stands in when no category tree is published.
        let name = nested_lookup(container, &[79, 0, 0, 0]).cloned().unwrap_or_default();
        let id = nested_lookup(container, &[79, 0, 0, 2]).cloned().unwrap_or_default();
        found.push(category(name, id));
    }
    Value::Array(found)
}

fn collect_categories(node: &Value, out: &mut Vec<Value>) {
    let Some(items) = node.as_array() else {
        return;
    };
    match items {
        [Value::String(name), _, id, _, ..] => out.push(category(name.as_str().into(), id.clone())),
        _ => items.iter().for_each(|sub| collect_categories(sub, out)),
    }
}

fn category(name: Value, id: Value) -> Value {
    Value::Object(BTreeMap::from([("name".to_string(), name), ("id".to_string(), id)]))
}

fn sorted_names(container: &Value) -> Value {
    let Some(items) = container.as_array() else {
        return Value::Null;
    };
    let mut names: Vec<String> = items
        .iter()
        .filter_map(|item| nested_lookup(item, &[1]).ok())
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    names.sort();
    Value::Array(names.into_iter().map(Value::String).collect())
}
