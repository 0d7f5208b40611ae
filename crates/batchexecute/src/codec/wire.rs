//! Wire encoders: the inverse of [`super::response`].
//!
//! These produce bodies in exactly the shape the decoders read. The mock
//! server serves them; tests use them as fixtures.

use serde_json::json;

use super::request::{PERMISSIONS_RPC, REVIEWS_RPC};
use super::response::{GUARD_PREFIX, SEARCH_CHUNK};
use crate::extract::RawDataset;
use crate::identifiers::PageToken;
use crate::value::Value;

/// Frames an RPC result string as a batchexecute body.
fn frame(rpc_id: &str, result: &Value) -> String {
    let rows = json!([
        ["wrb.fr", rpc_id, result.to_json_string(), null, null, null, "generic"],
        ["di", 42],
        ["af.httprm", 41, "-1", 7]
    ]);
    format!("{GUARD_PREFIX}{rows}")
}

/// Encodes one review page.
///
/// The result is `[items, [null, token], null]` when another page follows
/// and `[items]` on the last page, so both token layouts read it.
pub fn encode_reviews_response(items: Vec<RawDataset>, next_token: Option<&PageToken>) -> String {
    let items = Value::Array(
        items
            .into_iter()
            .map(|item| Value::Array(item.into_items()))
            .collect(),
    );
    let result = match next_token {
        Some(token) => Value::Array(vec![
            items,
            Value::Array(vec![Value::Null, Value::from(token.as_str())]),
            Value::Null,
        ]),
        None => Value::Array(vec![items]),
    };
    frame(REVIEWS_RPC, &result)
}

/// Encodes a permission response from its raw sections.
///
/// Each section is either a list of `[name, icon, entries, _]` groups or a
/// bare list of `[icon, name]` entries.
pub fn encode_permissions_response(sections: Vec<Value>) -> String {
    frame(PERMISSIONS_RPC, &Value::Array(sections))
}

/// Renders a detail page carrying one `AF_initDataCallback` script per
/// chunk.
pub fn encode_detail_page(dataset: &RawDataset) -> String {
    let mut html = String::from("<!doctype html><html><head><title>Mock storefront</title>");
    for id in dataset.chunk_ids() {
        let data = dataset.chunk(id).map_or_else(|| "null".to_string(), Value::to_json_string);
        html.push_str(&format!(
            "<script nonce=\"mock\">AF_initDataCallback({{key: 'ds:{id}', hash: '{}', data:{data}, sideChannel: {{}}}});</script>",
            id % 10
        ));
    }
    html.push_str("</head><body></body></html>");
    html
}

/// Renders a search results page: a `ds:4` chunk with one section holding
/// the hit list at `[22][0]` and, when given, the top result at `[23][16]`.
pub fn encode_search_page(top: Option<RawDataset>, hits: Vec<RawDataset>) -> String {
    let hits = Value::Array(
        hits.into_iter()
            .map(|hit| Value::Array(hit.into_items()))
            .collect(),
    );
    let mut section = vec![Value::Null; 24];
    section[22] = Value::Array(vec![hits]);
    if let Some(top) = top {
        let mut slot = vec![Value::Null; 16];
        slot.push(Value::Array(top.into_items()));
        section[23] = Value::Array(slot);
    }
    let results = Value::Array(vec![Value::Array(vec![
        Value::Null,
        Value::Array(vec![Value::Array(section)]),
    ])]);
    let dataset: RawDataset = [(SEARCH_CHUNK, results)].into_iter().collect();
    encode_detail_page(&dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::response::{
        decode_detail_page, decode_permissions, decode_reviews, decode_search_page,
    };
    use crate::config::TokenLayout;

    fn item(id: &str) -> RawDataset {
        RawDataset::from_items(vec![Value::from(id), Value::Null, Value::Number(5.0)])
    }

    #[test]
    fn review_pages_decode_with_and_without_token() {
        let token = PageToken::new("offset:2").unwrap();
        let body = encode_reviews_response(vec![item("a"), item("b")], Some(&token));
        let page = decode_reviews(&body, TokenLayout::Trailing).unwrap();
        assert_eq!(page.items, vec![item("a"), item("b")]);
        assert_eq!(page.next_token, Some(token));

        let last = decode_reviews(&encode_reviews_response(vec![item("c")], None), TokenLayout::Positional)
            .unwrap();
        assert_eq!(last.next_token, None);
        assert_eq!(last.items.len(), 1);
    }

    #[test]
    fn detail_page_round_trips_chunks() {
        let dataset: RawDataset = [
            (3, Value::Array(vec![Value::from("x")])),
            (5, Value::Array(vec![Value::Null, Value::from("has, sideChannel text")])),
        ]
        .into_iter()
        .collect();
        assert_eq!(decode_detail_page(&encode_detail_page(&dataset)).unwrap(), dataset);
    }

    #[test]
    fn permissions_body_is_framed() {
        let body = encode_permissions_response(vec![Value::Array(vec![Value::Array(vec![
            Value::Null,
            Value::from("camera"),
        ])])]);
        assert!(body.starts_with(GUARD_PREFIX));
        assert_eq!(decode_permissions(&body).unwrap().len(), 1);
    }

    #[test]
    fn search_page_carries_top_result_and_hits() {
        let hit = |id: &str| RawDataset::from_items(vec![Value::Array(vec![Value::Array(vec![Value::from(id)])])]);
        let top = RawDataset::from_items(vec![Value::Null, Value::from("top")]);
        let page = decode_search_page(&encode_search_page(Some(top.clone()), vec![hit("a"), hit("b")])).unwrap();
        assert_eq!(page.top, Some(top));
        assert_eq!(page.hits, vec![hit("a"), hit("b")]);

        let page = decode_search_page(&encode_search_page(None, Vec::new())).unwrap();
        assert_eq!(page.top, None);
        assert!(page.hits.is_empty());
    }
}
