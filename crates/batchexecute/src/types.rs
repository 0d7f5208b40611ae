//! Shared value types for review and permission fetches.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! protocol codes with invariants (a score filter is 1 to 5 stars, a device
//! filter is one of four storefront codes) and travel inside request payloads
//! and continuation tokens.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::errors::SchemaError;
use crate::identifiers::PageToken;
use crate::schema::Record;

/// A textual filter value that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseCodeError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

// ---------------------------------------------------------------------------
// Sort order
// ---------------------------------------------------------------------------

/// Review ordering, with the storefront's wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    MostRelevant,
    #[default]
    Newest,
    Rating,
}

impl Sort {
    /// The integer sent in the request payload.
    pub fn code(self) -> u8 {
        match self {
            Self::MostRelevant => 1,
            Self::Newest => 2,
            Self::Rating => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::MostRelevant),
            2 => Some(Self::Newest),
            3 => Some(Self::Rating),
            _ => None,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MostRelevant => "most-relevant",
            Self::Newest => "newest",
            Self::Rating => "rating",
        })
    }
}

impl FromStr for Sort {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "most-relevant" => Ok(Self::MostRelevant),
            "newest" => Ok(Self::Newest),
            "rating" => Ok(Self::Rating),
            _ => Err(ParseCodeError {
                kind: "sort",
                value: s.to_string(),
                expected: "most-relevant, newest, rating",
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Device filter
// ---------------------------------------------------------------------------

/// Device class a review was written on, with the storefront's wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Mobile,
    Tablet,
    Chromebook,
    Tv,
}

impl Device {
    /// The integer sent in the request payload.
    pub fn code(self) -> u8 {
        match self {
            Self::Mobile => 2,
            Self::Tablet => 3,
            Self::Chromebook => 5,
            Self::Tv => 6,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(Self::Mobile),
            3 => Some(Self::Tablet),
            5 => Some(Self::Chromebook),
            6 => Some(Self::Tv),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Chromebook => "chromebook",
            Self::Tv => "tv",
        })
    }
}

impl FromStr for Device {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(Self::Mobile),
            "tablet" => Ok(Self::Tablet),
            "chromebook" => Ok(Self::Chromebook),
            "tv" => Ok(Self::Tv),
            _ => Err(ParseCodeError {
                kind: "device",
                value: s.to_string(),
                expected: "mobile, tablet, chromebook, tv",
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Score filter
// ---------------------------------------------------------------------------

/// Restricts a review fetch to one star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ScoreFilter(u8);

impl ScoreFilter {
    /// Returns `None` unless `stars` is in `1..=5`.
    #[must_use]
    pub fn new(stars: u8) -> Option<Self> {
        (1..=5).contains(&stars).then_some(Self(stars))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ScoreFilter {
    type Error = String;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::new(stars).ok_or_else(|| format!("score filter must be 1 to 5, got {stars}"))
    }
}

impl From<ScoreFilter> for u8 {
    fn from(filter: ScoreFilter) -> Self {
        filter.0
    }
}

impl FromStr for ScoreFilter {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseCodeError {
                kind: "score filter",
                value: s.to_string(),
                expected: "1, 2, 3, 4, 5",
            })
    }
}

// ---------------------------------------------------------------------------
// Review query and continuation
// ---------------------------------------------------------------------------

/// Everything that shapes one review fetch besides the app id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub lang: String,
    pub country: String,
    pub sort: Sort,
    /// Total number of reviews the caller wants across all pages.
    pub count: usize,
    pub score_filter: Option<ScoreFilter>,
    pub device_filter: Option<Device>,
}

impl Default for ReviewQuery {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            country: "us".to_string(),
            sort: Sort::Newest,
            count: 100,
            score_filter: None,
            device_filter: None,
        }
    }
}

impl ReviewQuery {
    /// Newest-first `count` reviews in the client's configured locale.
    pub fn for_config(config: &ClientConfig, count: usize) -> Self {
        Self {
            lang: config.lang.clone(),
            country: config.country.clone(),
            count,
            ..Self::default()
        }
    }
}

/// Resumable pagination state.
///
/// A token remembers the filters it was created with, so resuming needs
/// nothing but the token and the app id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationToken {
    pub token: PageToken,
    pub lang: String,
    pub country: String,
    pub sort: Sort,
    pub requested_count: usize,
    pub score_filter: Option<ScoreFilter>,
    pub device_filter: Option<Device>,
    pub max_per_fetch: usize,
}

impl ContinuationToken {
    /// Captures `query` together with the server's next-page token.
    pub fn resume(token: PageToken, query: &ReviewQuery, max_per_fetch: usize) -> Self {
        Self {
            token,
            lang: query.lang.clone(),
            country: query.country.clone(),
            sort: query.sort,
            requested_count: query.count,
            score_filter: query.score_filter,
            device_filter: query.device_filter,
            max_per_fetch,
        }
    }

    /// The query this token continues.
    pub fn query(&self) -> ReviewQuery {
        ReviewQuery {
            lang: self.lang.clone(),
            country: self.country.clone(),
            sort: self.sort,
            count: self.requested_count,
            score_filter: self.score_filter,
            device_filter: self.device_filter,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// A review record with its fields checked for kind.
///
/// Fields that fell back to `null` during extraction are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub review_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub content: Option<String>,
    pub score: Option<i64>,
    pub thumbs_up_count: Option<i64>,
    pub review_created_version: Option<String>,
    pub at: Option<DateTime<Utc>>,
    pub reply_content: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub app_version: String,
}

impl TryFrom<&Record> for Review {
    type Error = SchemaError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            review_id: record.opt_str("reviewId")?,
            user_name: record.opt_str("userName")?,
            user_image: record.opt_str("userImage")?,
            content: record.opt_str("content")?,
            score: record.opt_i64("score")?,
            thumbs_up_count: record.opt_i64("thumbsUpCount")?,
            review_created_version: record.opt_str("reviewCreatedVersion")?,
            at: opt_timestamp(record, "at")?,
            reply_content: record.opt_str("replyContent")?,
            replied_at: opt_timestamp(record, "repliedAt")?,
            app_version: record.opt_str("appVersion")?.unwrap_or_default(),
        })
    }
}

/// An ISO-8601 field; the empty string the epoch transform yields for
/// non-numeric input reads as `None`.
fn opt_timestamp(record: &Record, field: &str) -> Result<Option<DateTime<Utc>>, SchemaError> {
    match record.opt_str(field)?.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| SchemaError::FieldType {
                field: field.to_string(),
                expected: "an RFC 3339 timestamp",
                found: crate::value::ValueKind::String,
            }),
    }
}

/// Permission group name → sorted permission names.
pub type PermissionGroups = BTreeMap<String, Vec<String>>;
