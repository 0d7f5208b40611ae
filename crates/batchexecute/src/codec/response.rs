//! Response side of the codec: framing strip, JSON parse, chunk location.
//!
//! Review and permission responses start with the anti-hijacking guard
//! `)]}'` followed by a blank line and a JSON array of rows. The first row
//! carries the RPC result as a string of JSON at index 2.
//!
//! Detail and search pages are HTML. Each `AF_initDataCallback` script
//! carries a `ds:<n>` key and a `data:` literal array; every such pair
//! becomes chunk `n` of the decoded [`RawDataset`].

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use super::request::parse_json;
use crate::config::TokenLayout;
use crate::errors::DecodeError;
use crate::extract::{nested_lookup, RawDataset};
use crate::identifiers::PageToken;
use crate::value::Value;

/// Prefix every framed batchexecute body starts with.
pub const GUARD_PREFIX: &str = ")]}'\n\n";

/// Marker the gateway embeds in an otherwise successful body when it is
/// throttling the caller.
pub const RATE_LIMIT_MARKER: &str = "com.google.play.gateway.proto.PlayGatewayError";

// ---------------------------------------------------------------------------
// Framed responses
// ---------------------------------------------------------------------------

/// One decoded review page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    /// Each review item re-indexed so that chunk `i` is element `i`.
    pub items: Vec<RawDataset>,
    /// Token for the following page; `None` on the last page.
    pub next_token: Option<PageToken>,
}

/// Returns the text after the guard prefix.
///
/// # Errors
///
/// [`DecodeError::ProtocolMismatch`] if the prefix is absent.
pub fn strip_guard(body: &str) -> Result<&str, DecodeError> {
    body.find(GUARD_PREFIX)
        .map(|at| &body[at + GUARD_PREFIX.len()..])
        .ok_or_else(|| DecodeError::mismatch("anti-hijacking prefix"))
}

/// The first row of a framed body and its parsed RPC result (`None` when the
/// result slot is `null`).
fn framed_result(body: &str) -> Result<(Vec<Value>, Option<Value>), DecodeError> {
    let rows = parse_json(strip_guard(body)?, "framed rows")?;
    let row = match nested_lookup(&rows, &[0]) {
        Ok(Value::Array(row)) => row.clone(),
        Ok(other) => {
            return Err(DecodeError::corrupt(
                "framed rows",
                format!("first row is {}", other.kind()),
            ))
        }
        Err(e) => return Err(DecodeError::corrupt("framed rows", e)),
    };
    let result = match row.get(2) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(parse_json(text, "rpc result")?),
        Some(other) => {
            return Err(DecodeError::corrupt(
                "rpc result",
                format!("expected a JSON string, found {}", other.kind()),
            ))
        }
    };
    Ok((row, result))
}

/// Decodes one review page.
///
/// The item list is the first element of the RPC result; `null` or an empty
/// result is an empty page with no token.
///
/// # Errors
///
/// - [`DecodeError::ProtocolMismatch`] if the body is not framed.
/// - [`DecodeError::PayloadCorrupt`] if the JSON is malformed or the item
///   list is not an array. A single item that is not an array is skipped.
pub fn decode_reviews(body: &str, layout: TokenLayout) -> Result<ReviewPage, DecodeError> {
    let (row, result) = framed_result(body)?;
    let Some(Value::Array(inner)) = result else {
        debug!("review page carries no result");
        return Ok(ReviewPage::default());
    };

    let items = match inner.first() {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Array(fields) => Some(RawDataset::from_items(fields.clone())),
                other => {
                    warn!(index = i, found = %other.kind(), "skipping malformed review item");
                    None
                }
            })
            .collect(),
        Some(other) => {
            return Err(DecodeError::corrupt(
                "review items",
                format!("item list is {}", other.kind()),
            ))
        }
    };

    let next_token = match layout {
        TokenLayout::Trailing => trailing_token(&inner),
        TokenLayout::Positional => positional_token(&row, &inner),
    };
    Ok(ReviewPage { items, next_token })
}

fn trailing_token(inner: &[Value]) -> Option<PageToken> {
    let slot = inner.len().checked_sub(2).and_then(|i| inner.get(i))?;
    match slot.as_array()?.last()? {
        Value::String(token) => PageToken::new(token.as_str()),
        _ => None,
    }
}

fn positional_token(row: &[Value], inner: &[Value]) -> Option<PageToken> {
    if row.len() < 4 || inner.len() < 3 {
        return None;
    }
    match nested_lookup(&inner[inner.len() - 2], &[1]) {
        Ok(Value::String(token)) => PageToken::new(token.as_str()),
        _ => None,
    }
}

/// Decodes a permission response into one dataset per permission group.
///
/// Sections whose first entry is a bare `[icon, name]` pair are regrouped
/// under `"Uncategorized"`.
///
/// # Errors
///
/// As [`decode_reviews`].
pub fn decode_permissions(body: &str) -> Result<Vec<RawDataset>, DecodeError> {
    let (_, result) = framed_result(body)?;
    let Some(Value::Array(sections)) = result else {
        return Ok(Vec::new());
    };

    let mut groups = Vec::new();
    for section in sections.iter().filter_map(Value::as_array) {
        let Some(first) = section.first() else {
            continue;
        };
        let regrouped;
        let section = if first.as_array().is_some_and(|entry| entry.len() == 2) {
            regrouped = [Value::Array(vec![
                Value::from("Uncategorized"),
                Value::Null,
                Value::Array(section.to_vec()),
                Value::Null,
            ])];
            &regrouped[..]
        } else {
            section
        };
        for group in section {
            if let Value::Array(fields) = group {
                if !fields.is_empty() {
                    groups.push(RawDataset::from_items(fields.clone()));
                }
            }
        }
    }
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Detail pages
// ---------------------------------------------------------------------------

struct DetailPatterns {
    script: Regex,
    key: Regex,
    value: Regex,
}

impl DetailPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            script: Regex::new(r"AF_initDataCallback[\s\S]*?</script")?,
            key: Regex::new(r"(ds:.*?)'")?,
            value: Regex::new(r"data:([\s\S]*?), sideChannel: \{\}\}\);</")?,
        })
    }
}

static DETAIL_PATTERNS: OnceLock<Result<DetailPatterns, regex::Error>> = OnceLock::new();

/// Collects every `ds:<n>` chunk embedded in a detail page.
///
/// Script blocks without both a key and a value, or with a key that is not
/// `ds:<number>`, are skipped.
///
/// # Errors
///
/// - [`DecodeError::ProtocolMismatch`] if the page has no
///   `AF_initDataCallback` script at all.
/// - [`DecodeError::PayloadCorrupt`] if a chunk's literal is not valid JSON.
pub fn decode_detail_page(html: &str) -> Result<RawDataset, DecodeError> {
    let patterns = DETAIL_PATTERNS
        .get_or_init(DetailPatterns::compile)
        .as_ref()
        .map_err(|e| DecodeError::corrupt("detail patterns", e))?;

    let mut dataset = RawDataset::new();
    let mut scripts = 0usize;
    for script in patterns.script.find_iter(html) {
        scripts += 1;
        let script = script.as_str();
        let (Some(key), Some(value)) = (patterns.key.captures(script), patterns.value.captures(script))
        else {
            continue;
        };
        let key = &key[1];
        let Some(id) = key.strip_prefix("ds:").and_then(|n| n.parse::<usize>().ok()) else {
            debug!(key, "skipping callback with non-numeric chunk key");
            continue;
        };
        dataset.insert(id, parse_json(&value[1], key)?);
    }

    if scripts == 0 {
        return Err(DecodeError::mismatch("AF_initDataCallback scripts"));
    }
    debug!(chunks = dataset.len(), scripts, "detail page decoded");
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Search pages
// ---------------------------------------------------------------------------

/// Chunk holding search results.
pub(crate) const SEARCH_CHUNK: usize = 4;
/// Result sections inside the search chunk.
const SEARCH_SECTIONS: &[usize] = &[0, 1];
/// The hit list inside one section.
pub(crate) const SECTION_HITS: &[usize] = &[22, 0];
/// The highlighted top result, inside the search chunk.
const TOP_RESULT: &[usize] = &[0, 1, 0, 23, 16];

/// Hits decoded from a search results page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// The highlighted result above the list, when the page shows one.
    pub top: Option<RawDataset>,
    /// List entries in page order, each re-indexed so that chunk `i` is
    /// element `i`.
    pub hits: Vec<RawDataset>,
}

/// Decodes a search results page.
///
/// The hit list sits in the first section of `ds:4` that has one; which
/// section varies with language and country. A page without a hit list is
/// an empty result, even when it shows a top result.
///
/// # Errors
///
/// As [`decode_detail_page`].
pub fn decode_search_page(html: &str) -> Result<SearchPage, DecodeError> {
    let dataset = decode_detail_page(html)?;
    let Some(results) = dataset.chunk(SEARCH_CHUNK) else {
        debug!("search page carries no result chunk");
        return Ok(SearchPage::default());
    };

    let sections = nested_lookup(results, SEARCH_SECTIONS)
        .ok()
        .and_then(Value::as_array)
        .unwrap_or_default();
    let Some(hits) = sections
        .iter()
        .find_map(|section| nested_lookup(section, SECTION_HITS).ok().and_then(Value::as_array))
    else {
        debug!(sections = sections.len(), "search page has no hit list");
        return Ok(SearchPage::default());
    };

    let hits = hits
        .iter()
        .enumerate()
        .filter_map(|(i, hit)| match hit {
            Value::Array(fields) => Some(RawDataset::from_items(fields.clone())),
            other => {
                warn!(index = i, found = %other.kind(), "skipping malformed search hit");
                None
            }
        })
        .collect();
    let top = match nested_lookup(results, TOP_RESULT) {
        Ok(Value::Array(entry)) if !entry.is_empty() => Some(RawDataset::from_items(entry.clone())),
        _ => None,
    };
    Ok(SearchPage { top, hits })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(inner: &str) -> String {
        let row = serde_json::json!([["wrb.fr", "oCPfdb", inner, null, null, null, "generic"]]);
        format!("{GUARD_PREFIX}{row}")
    }

    #[test]
    fn missing_guard_is_a_protocol_mismatch() {
        let err = decode_reviews("<html>captcha</html>", TokenLayout::Trailing).unwrap_err();
        assert!(matches!(err, DecodeError::ProtocolMismatch { .. }));
    }

    #[test]
    fn malformed_rows_are_corrupt() {
        let err = decode_reviews(")]}'\n\n[[\"wrb.fr\",", TokenLayout::Trailing).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadCorrupt { .. }));
        let err = decode_reviews(&framed(r#"[{"a":1}]"#), TokenLayout::Trailing).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadCorrupt { .. }));
    }

    #[test]
    fn malformed_items_are_skipped_and_siblings_kept() {
        let page = decode_reviews(
            &framed(r#"[[["id-1"],7,null,["id-2"]],[null,"tok"],null]"#),
            TokenLayout::Trailing,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].lookup(&[0]).unwrap(), &Value::from("id-1"));
        assert_eq!(page.items[1].lookup(&[0]).unwrap(), &Value::from("id-2"));
        assert_eq!(page.next_token, PageToken::new("tok"));
    }

    #[test]
    fn items_are_reindexed_from_zero() {
        let page = decode_reviews(
            &framed(r#"[[["id-1",["Ada"],5],["id-2",["Bo"],3]],[null,"tok"],null]"#),
            TokenLayout::Trailing,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].lookup(&[0]).unwrap(), &Value::from("id-2"));
        assert_eq!(page.items[0].lookup(&[1, 0]).unwrap(), &Value::from("Ada"));
        assert_eq!(page.next_token, PageToken::new("tok"));
    }

    #[test]
    fn both_token_layouts_read_the_mock_shape() {
        let body = framed(r#"[[],[null,"next"],null]"#);
        for layout in [TokenLayout::Trailing, TokenLayout::Positional] {
            let page = decode_reviews(&body, layout).unwrap();
            assert_eq!(page.next_token, PageToken::new("next"), "{layout:?}");
        }
    }

    #[test]
    fn list_in_token_slot_means_last_page() {
        let body = framed(r#"[[["id-1"]],null]"#);
        assert_eq!(decode_reviews(&body, TokenLayout::Trailing).unwrap().next_token, None);
        let body = framed(r#"[[["id-1"]]]"#);
        let page = decode_reviews(&body, TokenLayout::Positional).unwrap();
        assert_eq!(page.next_token, None);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn null_result_is_an_empty_page() {
        let body = format!("{GUARD_PREFIX}[[\"wrb.fr\",\"oCPfdb\",null,null,null,[3],\"generic\"]]");
        assert_eq!(decode_reviews(&body, TokenLayout::Trailing).unwrap(), ReviewPage::default());
    }

    #[test]
    fn permissions_regroup_bare_entries() {
        let body = framed(
            r#"[[["Location",null,[[null,"precise location"],[null,"approximate location"]],null]],[[null,"full network access"],[null,"view network connections"]]]"#,
        );
        let groups = decode_permissions(&body).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].lookup(&[0]).unwrap(), &Value::from("Location"));
        assert_eq!(groups[1].lookup(&[0]).unwrap(), &Value::from("Uncategorized"));
        assert_eq!(groups[1].lookup(&[2, 1, 1]).unwrap(), &Value::from("view network connections"));
    }

    #[test]
    fn detail_page_chunks_are_keyed_by_ds_number() {
        let html = concat!(
            "<html><script nonce=\"a\">AF_initDataCallback({key: 'ds:5', hash: '3', ",
            "data:[null,[null,null,[[\"Notes\"]]]], sideChannel: {}});</script>",
            "<script nonce=\"a\">AF_initDataCallback({key: 'ds:8', hash: '1', ",
            "data:[[\"c\"]], sideChannel: {}});</script>",
            "<script>AF_initDataCallback({key: 'other', data:[1], sideChannel: {}});</script></html>"
        );
        let dataset = decode_detail_page(html).unwrap();
        assert_eq!(dataset.chunk_ids().collect::<Vec<_>>(), vec![5, 8]);
        assert_eq!(dataset.lookup(&[5, 1, 2, 0, 0]).unwrap(), &Value::from("Notes"));
    }

    #[test]
    fn detail_page_without_callbacks_is_a_mismatch() {
        assert!(matches!(
            decode_detail_page("<html><body>Not Found</body></html>"),
            Err(DecodeError::ProtocolMismatch { .. })
        ));
    }

    fn search_html(ds4: &str) -> String {
        format!(
            "<script nonce=\"a\">AF_initDataCallback({{key: 'ds:4', hash: '2', data:{ds4}, sideChannel: {{}}}});</script>"
        )
    }

    #[test]
    fn search_hits_come_from_the_first_section_with_a_list() {
        let mut first = vec![Value::Null; 24];
        first[1] = Value::from("banner");
        let mut second = vec![Value::Null; 23];
        second[22] = Value::from(serde_json::json!([[[[["com.a"]]], [[["com.b"]]], 3]]));
        let ds4 = Value::from(serde_json::json!([[null, [first, second]]]));
        let page = decode_search_page(&search_html(&ds4.to_json_string())).unwrap();
        assert_eq!(page.top, None);
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[1].lookup(&[0, 0, 0]).unwrap(), &Value::from("com.b"));
    }

    #[test]
    fn search_top_result_is_read_beside_the_list() {
        let mut section = vec![Value::Null; 24];
        section[22] = Value::from(serde_json::json!([[]]));
        let mut top = vec![Value::Null; 17];
        top[16] = Value::from(serde_json::json!([null, null, [["Notes"]]]));
        section[23] = Value::Array(top);
        let ds4 = Value::from(serde_json::json!([[null, [section]]]));
        let page = decode_search_page(&search_html(&ds4.to_json_string())).unwrap();
        assert!(page.hits.is_empty());
        assert_eq!(page.top.unwrap().lookup(&[2, 0, 0]).unwrap(), &Value::from("Notes"));
    }

    #[test]
    fn search_page_without_results_is_empty() {
        let page = decode_search_page(&search_html("[[null,[]]]")).unwrap();
        assert_eq!(page, SearchPage::default());
        let html = "<script>AF_initDataCallback({key: 'ds:5', hash: '1', data:[1], sideChannel: {}});</script>";
        assert_eq!(decode_search_page(html).unwrap(), SearchPage::default());
    }

    #[test]
    fn corrupt_chunk_literal_is_reported() {
        let html = "<script>AF_initDataCallback({key: 'ds:5', hash: '1', data:[1,, sideChannel: {}});</script>";
        assert!(matches!(decode_detail_page(html), Err(DecodeError::PayloadCorrupt { .. })));
    }
}
