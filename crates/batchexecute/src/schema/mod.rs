//! Declarative extraction schema.
//!
//! A [`FieldSpec`] says where one named field lives in a [`RawDataset`]: an
//! optional chunk id, an index path, an optional [`Transform`] and a
//! [`Fallback`]. An [`ExtractionSchema`] groups the specs for each
//! [`RecordKind`]. The schema is built once at start-up, shared read-only
//! (usually behind an `Arc`) and passed explicitly to the codec and the
//! pagination engine.
//!
//! The same paths drive both directions: [`ExtractionSchema::extract`] reads
//! records out of a dataset and [`ExtractionSchema::encode`] places raw field
//! values into one, which is how the mock server builds wire payloads.

mod fields;
pub mod transform;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::errors::{LookupError, SchemaError};
use crate::extract::{nested_lookup, RawDataset};
use crate::value::Value;

pub use transform::Transform;

// ---------------------------------------------------------------------------
// Field specs
// ---------------------------------------------------------------------------

/// What a field resolves to when its path does not.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// A literal value.
    Value(Value),
    /// Another position in the payload, tried against the same dataset.
    Spec(Box<FieldSpec>),
}

/// Rule for pulling one named field out of a [`RawDataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    source_chunk: Option<usize>,
    path: Vec<usize>,
    transform: Option<Transform>,
    fallback: Fallback,
    blank_is_missing: bool,
}

impl FieldSpec {
    /// A field addressed directly in the dataset: the first path element is
    /// the chunk (or item element) id.
    pub fn at(path: &[usize]) -> Self {
        Self {
            source_chunk: None,
            path: path.to_vec(),
            transform: None,
            fallback: Fallback::Value(Value::Null),
            blank_is_missing: false,
        }
    }

    /// A field inside chunk `ds:<chunk>`.
    pub fn in_chunk(chunk: usize, path: &[usize]) -> Self {
        Self {
            source_chunk: Some(chunk),
            ..Self::at(path)
        }
    }

    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn or_value(mut self, value: impl Into<Value>) -> Self {
        self.fallback = Fallback::Value(value.into());
        self
    }

    #[must_use]
    pub fn or_spec(mut self, spec: FieldSpec) -> Self {
        self.fallback = Fallback::Spec(Box::new(spec));
        self
    }

    /// Treats a `null` or empty-string hit like a missing path, so the
    /// fallback applies.
    #[must_use]
    pub fn blank_is_missing(mut self) -> Self {
        self.blank_is_missing = true;
        self
    }

    pub fn source_chunk(&self) -> Option<usize> {
        self.source_chunk
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn fallback(&self) -> &Fallback {
        &self.fallback
    }

    /// Resolves the primary position only, without transform or fallback.
    pub fn lookup<'a>(&self, dataset: &'a RawDataset) -> Result<&'a Value, LookupError> {
        match self.source_chunk {
            Some(id) => {
                let chunk = dataset
                    .chunk(id)
                    .ok_or(LookupError::IndexNotFound { index: id, depth: 0 })?;
                nested_lookup(chunk, &self.path)
            }
            None => dataset.lookup(&self.path),
        }
    }

    /// Evaluates the field: lookup, then transform on success, otherwise the
    /// fallback (recursively, for chained specs).
    pub fn evaluate(&self, dataset: &RawDataset) -> Value {
        match self.lookup(dataset) {
            Ok(raw) if self.blank_is_missing && is_blank(raw) => {
                trace!(path = ?self.path, chunk = ?self.source_chunk, "blank field fell back");
                self.fall_back(dataset)
            }
            Ok(raw) => match self.transform {
                Some(t) => t.apply(raw),
                None => raw.clone(),
            },
            Err(err) => {
                trace!(path = ?self.path, chunk = ?self.source_chunk, %err, "field fell back");
                self.fall_back(dataset)
            }
        }
    }

    fn fall_back(&self, dataset: &RawDataset) -> Value {
        match &self.fallback {
            Fallback::Spec(next) => next.evaluate(dataset),
            Fallback::Value(v) => v.clone(),
        }
    }

    /// The literal at the end of the fallback chain.
    pub fn terminal_fallback(&self) -> &Value {
        match &self.fallback {
            Fallback::Value(v) => v,
            Fallback::Spec(next) => next.terminal_fallback(),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The record types the schema knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Detail,
    Review,
    Permission,
    /// One entry of a search hit list.
    SearchResult,
    /// The highlighted result above a search hit list.
    TopSearchResult,
}

impl RecordKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Detail => "Detail",
            Self::Review => "Review",
            Self::Permission => "Permission",
            Self::SearchResult => "SearchResult",
            Self::TopSearchResult => "TopSearchResult",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat mapping from field name to extracted value. Never mutated after
/// extraction except to attach request context (`appId`, `url`).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// A field that must be a string; `null` reads as `None`.
    pub fn opt_str(&self, field: &str) -> Result<Option<String>, SchemaError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(SchemaError::FieldType {
                field: field.to_string(),
                expected: "string",
                found: other.kind(),
            }),
        }
    }

    /// A field that must be an integer; `null` reads as `None`.
    pub fn opt_i64(&self, field: &str) -> Result<Option<i64>, SchemaError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| SchemaError::FieldType {
                field: field.to_string(),
                expected: "integer",
                found: v.kind(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Field name → spec, for one record kind.
pub type FieldSet = BTreeMap<&'static str, FieldSpec>;

/// All field specs, per record kind. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    detail: FieldSet,
    review: FieldSet,
    permission: FieldSet,
    search_result: FieldSet,
    top_search_result: FieldSet,
}

impl ExtractionSchema {
    /// The storefront's current field positions.
    pub fn standard() -> Self {
        Self {
            detail: fields::detail(),
            review: fields::review(),
            permission: fields::permission(),
            search_result: fields::search_result(),
            top_search_result: fields::top_search_result(),
        }
    }

    /// Replaces the field set of one record kind (tests, alternative
    /// layouts).
    #[must_use]
    pub fn with_fields(mut self, kind: RecordKind, fields: FieldSet) -> Self {
        *self.fields_mut(kind) = fields;
        self
    }

    fn fields_mut(&mut self, kind: RecordKind) -> &mut FieldSet {
        match kind {
            RecordKind::Detail => &mut self.detail,
            RecordKind::Review => &mut self.review,
            RecordKind::Permission => &mut self.permission,
            RecordKind::SearchResult => &mut self.search_result,
            RecordKind::TopSearchResult => &mut self.top_search_result,
        }
    }

    pub fn fields(&self, kind: RecordKind) -> &FieldSet {
        match kind {
            RecordKind::Detail => &self.detail,
            RecordKind::Review => &self.review,
            RecordKind::Permission => &self.permission,
            RecordKind::SearchResult => &self.search_result,
            RecordKind::TopSearchResult => &self.top_search_result,
        }
    }

    /// Looks up one spec. Asking for an undeclared field is a programming
    /// error, reported as [`SchemaError::UnknownField`].
    pub fn field(&self, kind: RecordKind, name: &str) -> Result<&FieldSpec, SchemaError> {
        self.fields(kind)
            .get(name)
            .ok_or_else(|| SchemaError::UnknownField {
                kind: kind.name(),
                field: name.to_string(),
            })
    }

    /// Evaluates every field of `kind` against `dataset`.
    ///
    /// A field that resolves to `null` takes the literal at the end of its
    /// fallback chain. Field-level failures never abort the record.
    pub fn extract(&self, kind: RecordKind, dataset: &RawDataset) -> Record {
        let mut record = Record::default();
        for (&name, spec) in self.fields(kind) {
            let value = match spec.evaluate(dataset) {
                Value::Null => spec.terminal_fallback().clone(),
                v => v,
            };
            record.insert(name, value);
        }
        record
    }

    /// Places raw (pre-transform) field values at their specs' primary
    /// positions, producing a dataset [`extract`](Self::extract) can read.
    pub fn encode<'a>(
        &self,
        kind: RecordKind,
        raw_fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<RawDataset, SchemaError> {
        let mut dataset = RawDataset::new();
        for (name, value) in raw_fields {
            let spec = self.field(kind, name)?;
            match spec.source_chunk {
                Some(id) => dataset.chunk_mut(id).place(&spec.path, value)?,
                None => {
                    let (&head, rest) = spec.path.split_first().ok_or_else(|| {
                        SchemaError::UnknownField {
                            kind: kind.name(),
                            field: name.to_string(),
                        }
                    })?;
                    dataset.chunk_mut(head).place(rest, value)?;
                }
            }
        }
        Ok(dataset)
    }
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn review_item() -> RawDataset {
        let item = Value::from(json!([
            "gp:AOqpTOE",
            ["Ada Lovelace", [null, null, null, [null, null, "https://img/ada"]]],
            4,
            null,
            "Works offline &amp; fast",
            [1_700_000_000, 0],
            12,
            null,
            null,
            null,
            "3.2.1"
        ]));
        RawDataset::from_items(item.as_array().unwrap().to_vec())
    }

    #[test]
    fn extracts_review_fields_at_known_paths() {
        let schema = ExtractionSchema::standard();
        let record = schema.extract(RecordKind::Review, &review_item());
        assert_eq!(record.get("reviewId"), Some(&Value::from("gp:AOqpTOE")));
        assert_eq!(record.get("userName"), Some(&Value::from("Ada Lovelace")));
        assert_eq!(record.get("userImage"), Some(&Value::from("https://img/ada")));
        assert_eq!(record.get("score"), Some(&Value::Number(4.0)));
        assert_eq!(record.get("at"), Some(&Value::from("2023-11-14T22:13:20Z")));
        assert_eq!(record.get("appVersion"), Some(&Value::from("3.2.1")));
        // Reply block is null: both reply fields fall back, siblings survive.
        assert_eq!(record.get("replyContent"), Some(&Value::Null));
        assert_eq!(record.get("repliedAt"), Some(&Value::Null));
    }

    #[test]
    fn literal_fallback_fires_on_missing_path() {
        let spec = FieldSpec::at(&[42, 0]).or_value("missing");
        assert_eq!(spec.evaluate(&review_item()), Value::from("missing"));
    }

    #[test]
    fn fallback_chain_tries_alternate_positions() {
        let spec = FieldSpec::at(&[9, 9])
            .or_spec(FieldSpec::at(&[3, 0]).or_spec(FieldSpec::at(&[1, 0])));
        assert_eq!(spec.evaluate(&review_item()), Value::from("Ada Lovelace"));
    }

    #[test]
    fn absent_chunk_takes_fallback() {
        let spec = FieldSpec::in_chunk(5, &[1, 2, 0, 0]).or_value("Varies with device");
        assert_eq!(spec.evaluate(&RawDataset::new()), Value::from("Varies with device"));
    }

    #[test]
    fn null_results_take_terminal_fallback() {
        let mut item = review_item().into_items();
        item[10] = Value::Null;
        let record = ExtractionSchema::standard()
            .extract(RecordKind::Review, &RawDataset::from_items(item));
        assert_eq!(record.get("appVersion"), Some(&Value::from("")));
    }

    #[test]
    fn description_uses_short_text_when_full_text_is_missing() {
        let mut dataset = RawDataset::new();
        dataset
            .chunk_mut(5)
            .place(&[1, 2, 72, 0, 1], Value::from("short &amp; sweet"))
            .unwrap();
        let record = ExtractionSchema::standard().extract(RecordKind::Detail, &dataset);
        assert_eq!(record.get("description"), Some(&Value::from("short & sweet")));
        assert_eq!(record.get("descriptionHTML"), Some(&Value::from("short &amp; sweet")));
    }

    #[test]
    fn description_uses_short_text_when_full_text_is_blank() {
        for blank in [Value::Null, Value::from("")] {
            let mut dataset = RawDataset::new();
            let app = dataset.chunk_mut(5);
            app.place(&[1, 2, 12, 0, 0, 1], blank.clone()).unwrap();
            app.place(&[1, 2, 72, 0, 1], Value::from("Short text")).unwrap();
            let record = ExtractionSchema::standard().extract(RecordKind::Detail, &dataset);
            assert_eq!(record.get("description"), Some(&Value::from("Short text")), "{blank:?}");
            assert_eq!(record.get("descriptionHTML"), Some(&Value::from("Short text")), "{blank:?}");
        }
    }

    #[test]
    fn blank_hits_are_kept_unless_asked_otherwise() {
        let dataset = RawDataset::from_items(vec![Value::from(""), Value::from("b")]);
        assert_eq!(FieldSpec::at(&[0]).or_spec(FieldSpec::at(&[1])).evaluate(&dataset), Value::from(""));
        let spec = FieldSpec::at(&[0]).blank_is_missing().or_spec(FieldSpec::at(&[1]));
        assert_eq!(spec.evaluate(&dataset), Value::from("b"));
    }

    #[test]
    fn unknown_field_is_a_schema_error() {
        let schema = ExtractionSchema::standard();
        assert!(matches!(
            schema.field(RecordKind::Review, "nope"),
            Err(SchemaError::UnknownField { kind: "Review", .. })
        ));
    }

    #[test]
    fn encode_then_extract_uses_the_same_positions() {
        let schema = ExtractionSchema::standard();
        let dataset = schema
            .encode(
                RecordKind::Detail,
                [
                    ("title", Value::from("Notes")),
                    ("price", Value::Number(2_990_000.0)),
                    ("currency", Value::from("USD")),
                ],
            )
            .unwrap();
        let record = schema.extract(RecordKind::Detail, &dataset);
        assert_eq!(record.get("title"), Some(&Value::from("Notes")));
        assert_eq!(record.get("price"), Some(&Value::Number(2.99)));
        assert_eq!(record.get("free"), Some(&Value::Bool(false)));
        assert_eq!(record.get("currency"), Some(&Value::from("USD")));
        assert_eq!(record.get("version"), Some(&Value::from("Varies with device")));
    }

    #[test]
    fn replaced_field_set_drives_extraction() {
        let schema = ExtractionSchema::standard().with_fields(
            RecordKind::Review,
            FieldSet::from([("first", FieldSpec::at(&[0]))]),
        );
        let record = schema.extract(RecordKind::Review, &review_item());
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("first"), Some(&Value::from("gp:AOqpTOE")));
    }

    #[test]
    fn record_typed_accessors_report_kind_mismatch() {
        let record = ExtractionSchema::standard().extract(RecordKind::Review, &review_item());
        assert_eq!(record.opt_i64("score").unwrap(), Some(4));
        assert!(matches!(
            record.opt_str("score"),
            Err(SchemaError::FieldType { expected: "string", .. })
        ));
    }
}
