//! The finished, depth-indexed snapshot.
//!
//! A snapshot is a list of buckets, one per depth level. Each bucket holds the
//! rows produced at that level and each row holds the children of one
//! composite. Composites are never nested inline: a [`Stub`] points at its
//! children row through a [`Position`] that is always exactly one bucket
//! deeper than the bucket holding the stub. The structure is therefore an
//! acyclic table of indices, whatever the shape of the cloned value.
//!
//! # Layout
//!
//! - the root entry is stored in [`Snapshot::root`];
//! - a composite root has its children in bucket 0, row 0;
//! - a scalar root is mirrored as a one-entry synthetic row `{0 => root}` in
//!   bucket 0;
//! - entries in bucket `d` sit at depth `d + 1`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::SnapshotError;
use crate::stub::{Handle, Position, Stub};

/// Key of an entry in a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    Index(i64),
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Index(i64::from(i))
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i as i64)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

/// One entry of a snapshot: an inline scalar or a stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Stub(Box<Stub>),
}

impl Value {
    pub fn as_stub(&self) -> Option<&Stub> {
        match self {
            Value::Stub(stub) => Some(stub),
            _ => None,
        }
    }

    pub(crate) fn as_stub_mut(&mut self) -> Option<&mut Stub> {
        match self {
            Value::Stub(stub) => Some(stub),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Stub(_))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Stub> for Value {
    fn from(stub: Stub) -> Self {
        Value::Stub(Box::new(stub))
    }
}

/// The children of one composite, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(Vec<(Key, Value)>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub(crate) fn push(&mut self, key: Key, value: Value) {
        self.0.push((key, value));
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.index_of(key).map(|i| &self.0[i].1)
    }

    pub fn index_of(&self, key: &Key) -> Option<usize> {
        self.0.iter().position(|(k, _)| k == key)
    }

    pub fn entry(&self, index: usize) -> Option<(&Key, &Value)> {
        self.0.get(index).map(|(k, v)| (k, v))
    }

    pub(crate) fn value_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.0.get_mut(index).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Key, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Counters collected while a snapshot was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    /// Distinct composites that received a handle.
    pub handles: usize,
    /// Entries charged against the item budget.
    pub items: usize,
    /// Entries dropped by the item budget or the depth limit.
    pub cut_entries: usize,
}

/// A finished, immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The cloned value itself: a scalar or the root stub.
    pub root: Value,
    /// `buckets[d]` holds every row produced at depth level `d`.
    pub buckets: Vec<Vec<Row>>,
    /// Children position of each handle's definition, indexed by `handle - 1`.
    pub definitions: Vec<Option<Position>>,
    #[serde(default)]
    pub stats: SnapshotStats,
}

impl Snapshot {
    pub fn row(&self, position: Position) -> Option<&Row> {
        self.buckets.get(position.bucket)?.get(position.row)
    }

    /// Children position of the definition carrying `handle`.
    pub fn definition(&self, handle: Handle) -> Option<Position> {
        self.definitions.get(handle.slot()?).copied().flatten()
    }

    /// Position of the children of `stub`, following references back to
    /// their definition.
    pub fn children_of(&self, stub: &Stub) -> Option<Position> {
        match (stub.position, stub.is_reference, stub.handle) {
            (Some(position), _, _) => Some(position),
            (None, true, Some(handle)) => self.definition(handle),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.buckets.len()
    }

    pub fn row_count(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn entry_count(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|b| b.iter())
            .map(|r| r.len())
            .sum()
    }

    /// Check that every index in the snapshot is usable.
    ///
    /// The root's children must sit in bucket 0, every other stub's children
    /// exactly one bucket below the stub, and every position and handle must
    /// resolve. Snapshots produced by the cloner always pass; this is meant
    /// for ones read back from storage, since walking a snapshot that fails
    /// may not terminate.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if let Some(stub) = self.root.as_stub() {
            self.check_stub(stub, 0)?;
        }
        for (bucket, rows) in self.buckets.iter().enumerate() {
            for (_, value) in rows.iter().flat_map(Row::iter) {
                if let Some(stub) = value.as_stub() {
                    self.check_stub(stub, bucket + 1)?;
                }
            }
        }
        for position in self.definitions.iter().flatten() {
            self.check_row(*position)?;
        }
        Ok(())
    }

    /// Entries in bucket `d` sit at depth `d + 1` and own bucket `d + 1`.
    fn check_stub(&self, stub: &Stub, depth: usize) -> Result<(), SnapshotError> {
        if let Some(handle) = stub.handle {
            if handle.slot().map_or(true, |slot| slot >= self.definitions.len()) {
                return Err(SnapshotError::UnknownHandle(handle.0));
            }
        }
        let Some(position) = stub.position else {
            return Ok(());
        };
        if position.bucket != depth {
            return Err(SnapshotError::MisplacedRow {
                depth,
                target: position.bucket,
            });
        }
        self.check_row(position)
    }

    fn check_row(&self, position: Position) -> Result<(), SnapshotError> {
        match self.row(position) {
            Some(_) => Ok(()),
            None => Err(SnapshotError::MissingRow {
                bucket: position.bucket,
                row: position.row,
            }),
        }
    }

    /// Every stub in the snapshot, root first, then bucket by bucket.
    pub fn stubs(&self) -> impl Iterator<Item = &Stub> {
        self.root.as_stub().into_iter().chain(
            self.buckets
                .iter()
                .flat_map(|b| b.iter())
                .flat_map(|r| r.iter())
                .filter_map(|(_, v)| v.as_stub()),
        )
    }
}
