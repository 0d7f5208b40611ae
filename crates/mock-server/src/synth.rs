//! Deterministic synthesis of reviews, app details and permissions.
//!
//! Every synthesized value is a pure function of `(seed, app_id, index)`:
//! the triple is hashed into a UUIDv5, which seeds a [`StdRng`]. Asking for
//! review 42 of an app twice yields the same review, so a client that pages
//! through the mock sees a stable corpus.
//!
//! Synthesis produces *raw* field values, the shape the storefront puts on
//! the wire before any transform runs (epoch seconds, micro-unit prices,
//! HTML-escaped text). They are placed into datasets with
//! [`ExtractionSchema::encode`], so the mock and the decoder share one set
//! of paths.

use batchexecute::{AppId, ExtractionSchema, RawDataset, RecordKind, SchemaError, ScoreFilter, Value};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use uuid::Uuid;

/// Apps a search answers with, the top result included.
pub const SEARCH_RESULTS: usize = 30;

/// Detail values a search result repeats.
const SEARCH_FIELDS: &[&str] = &[
    "title",
    "descriptionHTML",
    "installs",
    "score",
    "genre",
    "price",
    "currency",
    "developer",
    "icon",
    "screenshots",
];

/// Timestamp of the newest synthetic review; older ones step back from it.
pub const CORPUS_EPOCH: i64 = 1_760_000_000;

const SECONDS_PER_HOUR: i64 = 3_600;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Alan", "Radia",
];
const LAST_INITIALS: &[&str] = &["A.", "B.", "C.", "H.", "K.", "L.", "M.", "R.", "T.", "W."];

const PRAISE: &[&str] = &[
    "Works offline &amp; syncs fast.",
    "Clean interface, does exactly what it says.",
    "Best app in its category.<br>Highly recommended.",
    "Battery friendly and quick to start.",
];
const COMPLAINTS: &[&str] = &[
    "Crashes when I rotate the screen.",
    "Too many ads &amp; popups.",
    "Lost my data after the last update.",
    "Login keeps failing.<br>Please fix.",
];
const MIXED: &[&str] = &[
    "Decent, but the widget is missing.",
    "Good features, slow search.",
    "Fine for basic use.",
];
const REPLIES: &[&str] = &[
    "Thanks for the feedback! We are looking into it.",
    "Please contact support so we can help.",
    "Glad you like it!",
];

/// One synthetic review, in raw wire units.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticReview {
    pub review_id: String,
    pub user_name: String,
    pub user_image: String,
    /// HTML-escaped, as the storefront sends it.
    pub content: String,
    pub score: u8,
    pub thumbs_up_count: u32,
    pub app_version: String,
    /// Unix seconds.
    pub at: i64,
    pub reply: Option<SyntheticReply>,
}

/// A developer reply attached to a review.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticReply {
    pub content: String,
    /// Unix seconds.
    pub at: i64,
}

impl SyntheticReview {
    /// Raw values keyed by review field name.
    ///
    /// `reviewCreatedVersion` shares its position with `appVersion` and is
    /// not listed separately.
    pub fn raw_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            ("reviewId", Value::from(self.review_id.as_str())),
            ("userName", Value::from(self.user_name.as_str())),
            ("userImage", Value::from(self.user_image.as_str())),
            ("content", Value::from(self.content.as_str())),
            ("score", Value::from(i64::from(self.score))),
            ("thumbsUpCount", Value::from(self.thumbs_up_count)),
            ("at", Value::from(self.at)),
            ("appVersion", Value::from(self.app_version.as_str())),
        ];
        if let Some(reply) = &self.reply {
            fields.push(("replyContent", Value::from(reply.content.as_str())));
            fields.push(("repliedAt", Value::from(reply.at)));
        }
        fields
    }
}

/// Deterministic generator for one mock corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synthesizer {
    seed: u64,
    total_reviews: usize,
}

impl Synthesizer {
    pub fn new(seed: u64, total_reviews: usize) -> Self {
        Self {
            seed,
            total_reviews,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of reviews every app has.
    pub fn total_reviews(&self) -> usize {
        self.total_reviews
    }

    fn rng(&self, app_id: &AppId, stream: &str, index: usize) -> StdRng {
        let name = format!("{}/{}/{stream}/{index}", self.seed, app_id);
        let key = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        StdRng::seed_from_u64(key.as_u128() as u64)
    }

    /// Review `index` (0 = newest) of `app_id`.
    ///
    /// A score filter pins the star rating, so every review the mock hands
    /// out for a filtered request matches the filter.
    pub fn review(&self, app_id: &AppId, index: usize, score_filter: Option<ScoreFilter>) -> SyntheticReview {
        let mut rng = self.rng(app_id, "review", index);
        let score = score_filter.map_or_else(|| rng.random_range(1..=5), ScoreFilter::stars);
        let pool = match score {
            1 | 2 => COMPLAINTS,
            3 => MIXED,
            _ => PRAISE,
        };
        let at = CORPUS_EPOCH
            - (index as i64) * SECONDS_PER_HOUR
            - rng.random_range(0..SECONDS_PER_HOUR);
        let reply = rng.random_bool(0.25).then(|| SyntheticReply {
            content: pick(&mut rng, REPLIES).to_string(),
            at: at + rng.random_range(SECONDS_PER_HOUR..72 * SECONDS_PER_HOUR),
        });

        SyntheticReview {
            review_id: format!("gp:{}", Uuid::from_u128(rng.random::<u128>()).simple()),
            user_name: format!("{} {}", pick(&mut rng, FIRST_NAMES), pick(&mut rng, LAST_INITIALS)),
            user_image: format!("https://play-lh.googleusercontent.com/a/mock-{index}"),
            content: pick(&mut rng, pool).to_string(),
            score,
            thumbs_up_count: rng.random_range(0..250),
            app_version: format!(
                "{}.{}.{}",
                rng.random_range(1..=5),
                rng.random_range(0..20),
                rng.random_range(0..10)
            ),
            at,
            reply,
        }
    }

    /// Review `index` placed into a wire item.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] if the schema lacks one of the review fields or two
    /// of them collide.
    pub fn review_item(
        &self,
        schema: &ExtractionSchema,
        app_id: &AppId,
        index: usize,
        score_filter: Option<ScoreFilter>,
    ) -> Result<RawDataset, SchemaError> {
        let review = self.review(app_id, index, score_filter);
        schema.encode(RecordKind::Review, review.raw_fields())
    }

    /// Raw detail-page values for `app_id`.
    ///
    /// Only one field of each pair that shares a position is listed (`price`
    /// not `free`, `saleTime` not `sale`, `inAppProductPrice` not
    /// `offersIAP`, `containsAds` not `adSupported`); the other is derived
    /// from it on extraction. Categories are left to fall back to the genre.
    pub fn detail_fields(&self, app_id: &AppId) -> Vec<(&'static str, Value)> {
        let mut rng = self.rng(app_id, "detail", 0);
        let title = title_from(app_id);
        let developer_id: u64 = rng.random_range(1_000_000_000..10_000_000_000);
        let paid = rng.random_bool(0.3);
        let histogram: Vec<u64> = (0..5).map(|_| rng.random_range(10..5_000)).collect();
        let ratings: u64 = histogram.iter().sum();
        let updated = CORPUS_EPOCH - rng.random_range(0..90) * 24 * SECONDS_PER_HOUR;
        let slug = app_id.as_str().replace('.', "-");

        let mut fields = vec![
            ("title", Value::from(title.as_str())),
            (
                "descriptionHTML",
                Value::from(format!(
                    "{title} keeps your day in order.<br>Sync &amp; share across all your devices."
                )),
            ),
            ("summary", Value::from(format!("Fast &amp; simple {title}"))),
            ("installs", Value::from("1,000,000+")),
            ("minInstalls", Value::from(1_000_000i64)),
            ("realInstalls", Value::from(rng.random_range(1_000_000..5_000_000i64))),
            ("score", Value::from(f64::from(rng.random_range(30..=49u8)) / 10.0)),
            ("ratings", Value::from(ratings as i64)),
            ("reviews", Value::from(i64::try_from(self.total_reviews).unwrap_or(i64::MAX))),
            (
                "histogram",
                Value::from(json!([
                    null,
                    [1, histogram[0]],
                    [2, histogram[1]],
                    [3, histogram[2]],
                    [4, histogram[3]],
                    [5, histogram[4]]
                ])),
            ),
            ("price", Value::from(if paid { 2_990_000i64 } else { 0 })),
            ("currency", Value::from("USD")),
            ("inAppProductPrice", Value::from("$0.99 - $9.99 per item")),
            ("developer", Value::from(format!("{title} Labs"))),
            (
                "developerId",
                Value::from(format!("https://play.google.com/store/apps/dev?id={developer_id}")),
            ),
            ("developerEmail", Value::from(format!("support@{slug}.example"))),
            ("developerWebsite", Value::from(format!("https://{slug}.example"))),
            ("developerAddress", Value::from("1 Mock Street, Springfield")),
            ("privacyPolicy", Value::from(format!("https://{slug}.example/privacy"))),
            ("genre", Value::from("Productivity")),
            ("genreId", Value::from("PRODUCTIVITY")),
            ("icon", Value::from(format!("https://play-lh.googleusercontent.com/{slug}/icon"))),
            (
                "headerImage",
                Value::from(format!("https://play-lh.googleusercontent.com/{slug}/header")),
            ),
            (
                "screenshots",
                Value::Array(
                    (1..=3)
                        .map(|n| {
                            Value::from(json!([
                                null,
                                null,
                                null,
                                [null, null, format!("https://play-lh.googleusercontent.com/{slug}/shot-{n}")]
                            ]))
                        })
                        .collect(),
                ),
            ),
            ("contentRating", Value::from("Everyone")),
            ("containsAds", Value::Bool(!paid)),
            ("released", Value::from("Mar 3, 2019")),
            ("lastUpdatedOn", Value::from("Oct 9, 2025")),
            ("updated", Value::from(updated)),
            ("version", Value::from(format!("{}.{}.0", rng.random_range(1..=5), rng.random_range(0..20)))),
            (
                "comments",
                Value::from(json!([
                    [null, null, null, null, "Great for quick notes."],
                    [null, null, null, null, "Syncs reliably."]
                ])),
            ),
        ];
        if rng.random_bool(0.2) {
            fields.push(("saleTime", Value::from(CORPUS_EPOCH + 7 * 24 * SECONDS_PER_HOUR)));
            fields.push(("saleText", Value::from("Sale ends in 7 days")));
            fields.push(("originalPrice", Value::from(4_990_000i64)));
        }
        fields
    }

    /// The detail chunks (`ds:3`, `ds:4`, `ds:5`, `ds:8`) for `app_id`.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] if a detail field is missing from the schema or two
    /// fields collide.
    pub fn detail_dataset(&self, schema: &ExtractionSchema, app_id: &AppId) -> Result<RawDataset, SchemaError> {
        schema.encode(RecordKind::Detail, self.detail_fields(app_id))
    }

    /// The apps a search for `query` finds, best match first.
    ///
    /// Ids derive from the query's letters and digits, so one query always
    /// finds the same apps: `com.example.notes`, `com.example.notes2`, ...
    pub fn search_apps(&self, query: &str) -> Vec<AppId> {
        let mut slug: String = query
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if slug.is_empty() {
            slug.push_str("app");
        }
        (1..=SEARCH_RESULTS)
            .filter_map(|rank| match rank {
                1 => AppId::new(format!("com.example.{slug}")),
                _ => AppId::new(format!("com.example.{slug}{rank}")),
            })
            .collect()
    }

    /// Raw search-result values for `app_id`, matching its detail page.
    pub fn search_fields(&self, app_id: &AppId) -> Vec<(&'static str, Value)> {
        let mut fields: Vec<_> = self
            .detail_fields(app_id)
            .into_iter()
            .filter(|(name, _)| SEARCH_FIELDS.contains(name))
            .collect();
        fields.push(("appId", Value::from(app_id.as_str())));
        fields
    }

    /// The top result and the remaining hits for `query`.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] if a search field is missing from the schema or two
    /// fields collide.
    pub fn search_results(
        &self,
        schema: &ExtractionSchema,
        query: &str,
    ) -> Result<(Option<RawDataset>, Vec<RawDataset>), SchemaError> {
        let mut apps = self.search_apps(query).into_iter();
        let top = apps
            .next()
            .map(|app| schema.encode(RecordKind::TopSearchResult, self.search_fields(&app)))
            .transpose()?;
        let hits = apps
            .map(|app| schema.encode(RecordKind::SearchResult, self.search_fields(&app)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((top, hits))
    }
}

/// The permission sections every app reports: two named groups and a bare
/// list that decodes as "Uncategorized".
pub fn permission_sections() -> Vec<Value> {
    vec![
        Value::from(json!([
            [
                "Location",
                null,
                [
                    [null, "precise location (GPS and network-based)"],
                    [null, "approximate location (network-based)"]
                ],
                null
            ],
            [
                "Photos/Media/Files",
                null,
                [
                    [null, "read the contents of your USB storage"],
                    [null, "modify or delete the contents of your USB storage"]
                ],
                null
            ]
        ])),
        Value::from(json!([
            [null, "view network connections"],
            [null, "full network access"]
        ])),
    ]
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// `com.example.notes` → `Notes`.
fn title_from(app_id: &AppId) -> String {
    let last = app_id.as_str().rsplit('.').next().unwrap_or_default();
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => app_id.to_string(),
    }
}
