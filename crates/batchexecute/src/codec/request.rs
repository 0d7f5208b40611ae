//! Request side of the codec: URLs and `f.req` form bodies.
//!
//! A batchexecute body is a single form field, `f.req`, whose value is a
//! JSON array naming the RPC and carrying that RPC's own arguments as a
//! *string* of JSON. [`BatchRequest::encode_form`] builds that body and
//! [`BatchRequest::decode_form`] parses it back, which is what lets the mock
//! server answer exactly what the client sends.

use serde_json::json;

use crate::errors::DecodeError;
use crate::extract::nested_lookup;
use crate::identifiers::{AppId, PageToken};
use crate::types::{Device, ScoreFilter, Sort};
use crate::value::Value;

/// RPC id of the paginated review listing.
pub const REVIEWS_RPC: &str = "oCPfdb";
/// RPC id of the permission listing.
pub const PERMISSIONS_RPC: &str = "xdSrCf";

/// Path of the batchexecute endpoint, relative to the storefront origin.
pub const BATCHEXECUTE_PATH: &str = "/_/PlayStoreUi/data/batchexecute";
/// Path of the app detail page.
pub const DETAILS_PATH: &str = "/store/apps/details";
/// Path of the app search results page.
pub const SEARCH_PATH: &str = "/store/search";
/// Content type of every batchexecute POST.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Item-type tag that follows an app id in every payload.
const APP_ITEM_TYPE: u8 = 7;
/// Name of the single form field.
const FORM_FIELD: &str = "f.req";

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// `{base}/_/PlayStoreUi/data/batchexecute?hl={lang}&gl={country}`
pub fn batchexecute_url(base_url: &str, lang: &str, country: &str) -> String {
    format!(
        "{base_url}{BATCHEXECUTE_PATH}?hl={}&gl={}",
        urlencoding::encode(lang),
        urlencoding::encode(country)
    )
}

/// `{base}/store/apps/details?id={app_id}&hl={lang}&gl={country}`
pub fn detail_url(base_url: &str, app_id: &AppId, lang: &str, country: &str) -> String {
    format!(
        "{}&gl={}",
        detail_fallback_url(base_url, app_id, lang),
        urlencoding::encode(country)
    )
}

/// The detail URL without a country, tried when the country-specific page
/// is not found.
pub fn detail_fallback_url(base_url: &str, app_id: &AppId, lang: &str) -> String {
    format!(
        "{base_url}{DETAILS_PATH}?id={}&hl={}",
        urlencoding::encode(app_id.as_str()),
        urlencoding::encode(lang)
    )
}

/// `{base}/store/search?q={query}&c=apps&hl={lang}&gl={country}`
pub fn search_url(base_url: &str, query: &str, lang: &str, country: &str) -> String {
    format!(
        "{}&gl={}",
        search_fallback_url(base_url, query, lang),
        urlencoding::encode(country)
    )
}

/// The search URL without a country.
pub fn search_fallback_url(base_url: &str, query: &str, lang: &str) -> String {
    format!(
        "{base_url}{SEARCH_PATH}?q={}&c=apps&hl={}",
        urlencoding::encode(query),
        urlencoding::encode(lang)
    )
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Arguments of one review page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewsRequest {
    pub app_id: AppId,
    pub sort: Sort,
    /// Page size for this request.
    pub count: usize,
    /// Present on every page but the first.
    pub token: Option<PageToken>,
    pub score_filter: Option<ScoreFilter>,
    pub device_filter: Option<Device>,
}

/// A decoded or to-be-encoded batchexecute call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRequest {
    Reviews(ReviewsRequest),
    Permissions { app_id: AppId },
}

impl BatchRequest {
    pub fn rpc_id(&self) -> &'static str {
        match self {
            Self::Reviews(_) => REVIEWS_RPC,
            Self::Permissions { .. } => PERMISSIONS_RPC,
        }
    }

    pub fn app_id(&self) -> &AppId {
        match self {
            Self::Reviews(r) => &r.app_id,
            Self::Permissions { app_id } => app_id,
        }
    }

    /// The RPC's own arguments, as the compact JSON string embedded in the
    /// outer envelope.
    ///
    /// The review page-size triple is `[count]` on a first page and
    /// `[count, null, "token"]` when resuming.
    pub fn inner_payload(&self) -> String {
        let inner = match self {
            Self::Reviews(r) => {
                let page = match &r.token {
                    Some(token) => json!([r.count, null, token.as_str()]),
                    None => json!([r.count]),
                };
                let score = r.score_filter.map(ScoreFilter::stars);
                let device = r.device_filter.map(Device::code);
                json!([
                    null,
                    [2, r.sort.code(), page, null, [null, score, null, null, null, null, null, null, device]],
                    [r.app_id.as_str(), APP_ITEM_TYPE]
                ])
            }
            Self::Permissions { app_id } => json!([[null, [app_id.as_str(), APP_ITEM_TYPE], []]]),
        };
        inner.to_string()
    }

    /// The percent-encoded `f.req=...` form body.
    pub fn encode_form(&self) -> String {
        let tag = match self {
            Self::Reviews(_) => "generic",
            Self::Permissions { .. } => "1",
        };
        let envelope = json!([[[self.rpc_id(), self.inner_payload(), null, tag]]]);
        format!("{FORM_FIELD}={}", urlencoding::encode(&envelope.to_string()))
    }

    /// Parses a form body produced by [`encode_form`](Self::encode_form) (or
    /// by a browser).
    ///
    /// # Errors
    ///
    /// - [`DecodeError::ProtocolMismatch`] if there is no `f.req` field or
    ///   the RPC id is not one this codec understands.
    /// - [`DecodeError::PayloadCorrupt`] if either JSON layer is malformed or
    ///   an argument has the wrong shape.
    pub fn decode_form(body: &str) -> Result<Self, DecodeError> {
        let raw = body
            .split('&')
            .find_map(|pair| pair.strip_prefix("f.req="))
            .ok_or_else(|| DecodeError::mismatch("f.req form field"))?;
        let unplussed = raw.replace('+', " ");
        let decoded = urlencoding::decode(&unplussed)
            .map_err(|e| DecodeError::corrupt("f.req encoding", e))?;
        let envelope = parse_json(&decoded, "f.req envelope")?;

        let rpc_id = string_at(&envelope, &[0, 0, 0], "rpc id")?;
        let inner = parse_json(&string_at(&envelope, &[0, 0, 1], "rpc arguments")?, "rpc arguments")?;
        let app_id = |path: &[usize]| {
            let id = string_at(&inner, path, "app id")?;
            AppId::new(id).ok_or_else(|| DecodeError::corrupt("app id", "empty"))
        };

        match rpc_id.as_str() {
            REVIEWS_RPC => {
                let code = int_at(&inner, &[1, 1], "sort")?;
                let sort = Sort::from_code(code)
                    .ok_or_else(|| DecodeError::corrupt("sort", format!("unknown code {code}")))?;
                let count = usize::try_from(int_at(&inner, &[1, 2, 0], "count")?)
                    .map_err(|e| DecodeError::corrupt("count", e))?;
                let token = match nested_lookup(&inner, &[1, 2, 2]) {
                    Ok(Value::String(s)) => PageToken::new(s.as_str()),
                    _ => None,
                };
                let score_filter = match optional_int_at(&inner, &[1, 4, 1], "score filter")? {
                    Some(stars) => Some(
                        u8::try_from(stars)
                            .ok()
                            .and_then(ScoreFilter::new)
                            .ok_or_else(|| DecodeError::corrupt("score filter", stars))?,
                    ),
                    None => None,
                };
                let device_filter = match optional_int_at(&inner, &[1, 4, 8], "device filter")? {
                    Some(code) => Some(
                        Device::from_code(code)
                            .ok_or_else(|| DecodeError::corrupt("device filter", code))?,
                    ),
                    None => None,
                };
                Ok(Self::Reviews(ReviewsRequest {
                    app_id: app_id(&[2, 0])?,
                    sort,
                    count,
                    token,
                    score_filter,
                    device_filter,
                }))
            }
            PERMISSIONS_RPC => Ok(Self::Permissions {
                app_id: app_id(&[0, 1, 0])?,
            }),
            other => Err(DecodeError::mismatch(format!("rpc id '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn parse_json(text: &str, context: &str) -> Result<Value, DecodeError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| DecodeError::corrupt(context, e))
}

fn string_at(root: &Value, path: &[usize], context: &str) -> Result<String, DecodeError> {
    match nested_lookup(root, path) {
        Ok(Value::String(s)) => Ok(s.clone()),
        Ok(other) => Err(DecodeError::corrupt(context, format!("expected a string, found {}", other.kind()))),
        Err(e) => Err(DecodeError::corrupt(context, e)),
    }
}

fn int_at(root: &Value, path: &[usize], context: &str) -> Result<i64, DecodeError> {
    optional_int_at(root, path, context)?
        .ok_or_else(|| DecodeError::corrupt(context, "missing"))
}

fn optional_int_at(root: &Value, path: &[usize], context: &str) -> Result<Option<i64>, DecodeError> {
    match nested_lookup(root, path) {
        Ok(Value::Null) => Ok(None),
        Ok(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| DecodeError::corrupt(context, format!("expected an integer, found {}", v.kind()))),
        Err(e) => Err(DecodeError::corrupt(context, e)),
    }
}
