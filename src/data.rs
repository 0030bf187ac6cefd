//! Read-only cursor over a finished [`Snapshot`].
//!
//! A [`Data`] is cheap to clone: it shares the snapshot through an [`Arc`]
//! and only carries a cursor plus a few rendering options. Navigation never
//! recurses; children are looked up through stub positions, and references
//! are followed to the row of their definition.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::cloner::Limit;
use crate::snapshot::{Key, Row, Snapshot, Value};
use crate::stub::{Handle, Position, Stub, StubKind};

static NULL: Value = Value::Null;

/// Whether renderers print handles of shared composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefHandleMode {
    #[default]
    Shown,
    Hidden,
}

/// Rendering options carried along with a view.
///
/// These are limits for renderers, not echoes of the [`ClonerConfig`] that
/// produced the snapshot: the cloner's limits are already baked into the
/// snapshot as cut counts. A fresh view starts unlimited whatever the cloner
/// was configured with, and renderers read the options back through
/// [`Data::options`].
///
/// [`ClonerConfig`]: crate::ClonerConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataOptions {
    /// Levels below the cursor a renderer should descend into.
    pub max_depth: Limit,
    /// Entries a renderer should show per composite.
    pub max_items_per_depth: Limit,
    pub ref_handle_mode: RefHandleMode,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            max_depth: Limit::Unlimited,
            max_items_per_depth: Limit::Unlimited,
            ref_handle_mode: RefHandleMode::Shown,
        }
    }
}

/// A value materialized out of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Plain {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A truncated string: its kept prefix and the number of omitted chars.
    CutStr { prefix: String, cut: usize },
    Array(Vec<(Key, Plain)>),
    Object {
        class: String,
        properties: Vec<(Key, Plain)>,
    },
    Resource {
        type_name: String,
        properties: Vec<(Key, Plain)>,
    },
    /// An unexpanded composite, from a shallow read.
    Stub(Box<Stub>),
    /// A composite already materialized elsewhere in the same value.
    Ref(Handle),
}

impl Plain {
    /// The plain form of an entry, or `None` for composites.
    fn leaf(value: &Value) -> Option<Plain> {
        let plain = match value {
            Value::Null => Plain::Null,
            Value::Bool(b) => Plain::Bool(*b),
            Value::Int(i) => Plain::Int(*i),
            Value::Float(x) => Plain::Float(*x),
            Value::Str(s) => Plain::Str(s.clone()),
            Value::Stub(stub) if stub.kind == StubKind::CutString => Plain::CutStr {
                prefix: stub.inline_value.clone().unwrap_or_default(),
                cut: stub.cut_count,
            },
            Value::Stub(_) => return None,
        };
        Some(plain)
    }
}

impl From<serde_json::Value> for Plain {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Plain::Null,
            Json::Bool(b) => Plain::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Plain::Int(i),
                None => Plain::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Plain::Str(s),
            Json::Array(items) => Plain::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (Key::from(i), Plain::from(item)))
                    .collect(),
            ),
            Json::Object(fields) => Plain::Array(
                fields
                    .into_iter()
                    .map(|(k, v)| (Key::Name(k), Plain::from(v)))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Root,
    Entry {
        bucket: usize,
        row: usize,
        index: usize,
    },
}

/// A cursor into a snapshot.
#[derive(Debug, Clone)]
pub struct Data {
    snapshot: Arc<Snapshot>,
    cursor: Cursor,
    options: DataOptions,
}

impl Data {
    /// A view on the root of `snapshot`.
    ///
    /// The snapshot is trusted as is; run [`Snapshot::validate`] first on one
    /// that did not come from a cloner.
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            cursor: Cursor::Root,
            options: DataOptions::default(),
        }
    }

    pub fn with_max_depth(&self, max_depth: impl Into<Limit>) -> Self {
        let mut data = self.clone();
        data.options.max_depth = max_depth.into();
        data
    }

    pub fn with_max_items_per_depth(&self, max_items: impl Into<Limit>) -> Self {
        let mut data = self.clone();
        data.options.max_items_per_depth = max_items.into();
        data
    }

    pub fn with_ref_handles(&self, mode: RefHandleMode) -> Self {
        let mut data = self.clone();
        data.options.ref_handle_mode = mode;
        data
    }

    pub fn options(&self) -> &DataOptions {
        &self.options
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// The entry under the cursor.
    pub fn value(&self) -> &Value {
        match self.cursor {
            Cursor::Root => &self.snapshot.root,
            Cursor::Entry { bucket, row, index } => self
                .snapshot
                .row(Position::new(bucket, row))
                .and_then(|r| r.entry(index))
                .map_or(&NULL, |(_, v)| v),
        }
    }

    /// Key of the entry in its parent row; `None` at the root.
    pub fn key(&self) -> Option<&Key> {
        match self.cursor {
            Cursor::Root => None,
            Cursor::Entry { bucket, row, index } => self
                .snapshot
                .row(Position::new(bucket, row))
                .and_then(|r| r.entry(index))
                .map(|(k, _)| k),
        }
    }

    /// Nesting depth of the cursor; the root is at 0.
    pub fn depth(&self) -> usize {
        match self.cursor {
            Cursor::Root => 0,
            Cursor::Entry { bucket, .. } => bucket + 1,
        }
    }

    pub fn stub(&self) -> Option<&Stub> {
        self.value().as_stub()
    }

    pub fn get_type(&self) -> String {
        match self.value() {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Stub(stub) => match stub.kind {
                StubKind::Array => "array".to_string(),
                StubKind::Object => stub.type_name.clone(),
                StubKind::Resource => format!("resource ({})", stub.type_name),
                StubKind::CutString => "string".to_string(),
            },
        }
    }

    /// Read the value under the cursor.
    ///
    /// Without `hydrate`, composites come back as [`Plain::Stub`]. With it,
    /// the whole subtree is materialized. Each handle is expanded at most
    /// once, at its first encounter in depth-first order; every later stub
    /// carrying it becomes [`Plain::Ref`], so the result never outgrows the
    /// snapshot.
    pub fn get_value(&self, hydrate: bool) -> Plain {
        let value = self.value();
        if let Some(leaf) = Plain::leaf(value) {
            return leaf;
        }
        match value.as_stub() {
            Some(stub) if hydrate => self.hydrate(stub),
            Some(stub) => Plain::Stub(Box::new(stub.clone())),
            None => Plain::Null,
        }
    }

    fn hydrate(&self, root: &Stub) -> Plain {
        let snapshot = &*self.snapshot;
        let mut expanded: HashSet<Handle> = root.handle.into_iter().collect();
        let mut stack = vec![Frame::open(snapshot, root, None)];

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.next_entry(),
                None => return Plain::Null,
            };

            match next {
                Some((key, value)) => {
                    if let Some(leaf) = Plain::leaf(value) {
                        if let Some(frame) = stack.last_mut() {
                            frame.entries.push((key.clone(), leaf));
                        }
                        continue;
                    }
                    let Some(stub) = value.as_stub() else { continue };
                    let seen = stub.handle.filter(|h| !expanded.insert(*h));
                    match seen {
                        Some(handle) => {
                            if let Some(frame) = stack.last_mut() {
                                frame.entries.push((key.clone(), Plain::Ref(handle)));
                            }
                        }
                        None => stack.push(Frame::open(snapshot, stub, Some(key.clone()))),
                    }
                }
                None => {
                    let Some(done) = stack.pop() else {
                        return Plain::Null;
                    };
                    let (key, plain) = done.finish();
                    match (stack.last_mut(), key) {
                        (Some(parent), Some(key)) => parent.entries.push((key, plain)),
                        _ => return plain,
                    }
                }
            }
        }
    }

    /// Children row of the cursor, following references.
    fn row(&self) -> Option<(Position, &Row)> {
        let position = self.snapshot.children_of(self.stub()?)?;
        Some((position, self.snapshot.row(position)?))
    }

    /// Number of materialized children.
    pub fn len(&self) -> usize {
        self.row().map_or(0, |(_, row)| row.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th child, in row order.
    pub fn child_at(&self, index: usize) -> Option<Data> {
        let (position, row) = self.row()?;
        row.entry(index)?;
        Some(self.at(position, index))
    }

    /// The child stored under `key`, or `None` for scalars and missing keys.
    pub fn seek(&self, key: &Key) -> Option<Data> {
        let (position, row) = self.row()?;
        let index = row.index_of(key)?;
        Some(self.at(position, index))
    }

    pub fn children(&self) -> DataIter<'_> {
        DataIter {
            data: self,
            index: 0,
        }
    }

    fn at(&self, position: Position, index: usize) -> Data {
        Data {
            snapshot: Arc::clone(&self.snapshot),
            cursor: Cursor::Entry {
                bucket: position.bucket,
                row: position.row,
                index,
            },
            options: self.options,
        }
    }
}

/// Composite being materialized by [`Data::hydrate`].
struct Frame<'s> {
    key: Option<Key>,
    kind: StubKind,
    type_name: &'s str,
    row: Option<&'s Row>,
    next: usize,
    entries: Vec<(Key, Plain)>,
}

impl<'s> Frame<'s> {
    fn open(snapshot: &'s Snapshot, stub: &'s Stub, key: Option<Key>) -> Self {
        let row = snapshot
            .children_of(stub)
            .and_then(|position| snapshot.row(position));
        Self {
            key,
            kind: stub.kind,
            type_name: &stub.type_name,
            row,
            next: 0,
            entries: Vec::with_capacity(row.map_or(0, Row::len)),
        }
    }

    fn next_entry(&mut self) -> Option<(&'s Key, &'s Value)> {
        let entry = self.row?.entry(self.next)?;
        self.next += 1;
        Some(entry)
    }

    fn finish(self) -> (Option<Key>, Plain) {
        let plain = match self.kind {
            StubKind::Object => Plain::Object {
                class: self.type_name.to_string(),
                properties: self.entries,
            },
            StubKind::Resource => Plain::Resource {
                type_name: self.type_name.to_string(),
                properties: self.entries,
            },
            StubKind::Array | StubKind::CutString => Plain::Array(self.entries),
        };
        (self.key, plain)
    }
}

/// Iterator over the `(key, child)` pairs of a [`Data`].
pub struct DataIter<'a> {
    data: &'a Data,
    index: usize,
}

impl Iterator for DataIter<'_> {
    type Item = (Key, Data);

    fn next(&mut self) -> Option<Self::Item> {
        let child = self.data.child_at(self.index)?;
        self.index += 1;
        let key = child.key()?.clone();
        Some((key, child))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.data.len().saturating_sub(self.index);
        (left, Some(left))
    }
}

impl<'a> IntoIterator for &'a Data {
    type Item = (Key, Data);
    type IntoIter = DataIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.children()
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.get_value(true) == other.get_value(true)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Stub(stub) if stub.kind == StubKind::CutString => {
                write!(f, "{}…", stub.inline_value.as_deref().unwrap_or_default())
            }
            Value::Stub(_) => write!(f, "{} (count={})", self.get_type(), self.len()),
        }
    }
}
