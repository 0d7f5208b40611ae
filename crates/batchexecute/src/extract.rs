//! Integer-path lookup into nested payload arrays.
//!
//! The storefront addresses everything by position: a review's author name is
//! "element 1, then element 0", an app's title is "chunk 5, then 1, 2, 0, 0".
//! [`nested_lookup`] descends one index per path element and reports *why* a
//! path failed instead of panicking, so the schema layer can pick a fallback.
//!
//! [`RawDataset`] is the map of numbered chunks a response decodes into. For
//! detail pages the keys are `ds:<n>` chunk ids; for reviews each item's own
//! array is re-indexed so that key `i` is element `i`.

use std::collections::BTreeMap;

use crate::errors::LookupError;
use crate::value::Value;

/// Descends into `root` one index per element of `path`.
///
/// # Errors
///
/// - [`LookupError::InvalidPath`] if `path` is empty.
/// - [`LookupError::IndexNotFound`] if an array is too short.
/// - [`LookupError::NotIndexable`] if a non-array blocks further descent.
pub fn nested_lookup<'a>(root: &'a Value, path: &[usize]) -> Result<&'a Value, LookupError> {
    if path.is_empty() {
        return Err(LookupError::InvalidPath);
    }
    descend(root, path, 0)
}

fn descend<'a>(current: &'a Value, path: &[usize], depth: usize) -> Result<&'a Value, LookupError> {
    let Some((&index, rest)) = path.split_first() else {
        return Ok(current);
    };
    match current {
        Value::Array(items) => match items.get(index) {
            Some(next) => descend(next, rest, depth + 1),
            None => Err(LookupError::IndexNotFound { index, depth }),
        },
        other => Err(LookupError::NotIndexable {
            depth,
            found: other.kind(),
        }),
    }
}

/// Numbered chunks decoded from one response.
///
/// Built fresh per decoded response and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    chunks: BTreeMap<usize, Value>,
}

impl RawDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-indexes an item array so that chunk `i` is element `i`.
    pub fn from_items(items: Vec<Value>) -> Self {
        Self {
            chunks: items.into_iter().enumerate().collect(),
        }
    }

    pub fn insert(&mut self, id: usize, value: Value) {
        self.chunks.insert(id, value);
    }

    pub fn chunk(&self, id: usize) -> Option<&Value> {
        self.chunks.get(&id)
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Resolves `path` with its first element taken as a chunk id.
    ///
    /// Missing chunks report [`LookupError::IndexNotFound`] at depth 0.
    pub fn lookup(&self, path: &[usize]) -> Result<&Value, LookupError> {
        let (&head, rest) = path.split_first().ok_or(LookupError::InvalidPath)?;
        let root = self
            .chunks
            .get(&head)
            .ok_or(LookupError::IndexNotFound { index: head, depth: 0 })?;
        descend(root, rest, 1)
    }

    /// Mutable access for encoders; creates a `null` chunk if absent.
    pub(crate) fn chunk_mut(&mut self, id: usize) -> &mut Value {
        self.chunks.entry(id).or_default()
    }

    /// Flattens a re-indexed item back into a dense array, padding gaps
    /// with `null`.
    pub fn into_items(self) -> Vec<Value> {
        let len = self.chunks.keys().next_back().map_or(0, |last| last + 1);
        let mut items = vec![Value::Null; len];
        for (id, value) in self.chunks {
            items[id] = value;
        }
        items
    }
}

impl FromIterator<(usize, Value)> for RawDataset {
    fn from_iter<I: IntoIterator<Item = (usize, Value)>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}
