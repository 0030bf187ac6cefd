//! Placeholders for composite and opaque values inside a snapshot.

use serde::{Deserialize, Serialize};

use crate::snapshot::Value;

/// Identifier of one distinct composite within one clone call.
///
/// Handles are assigned from 1 upward in discovery order. Two stubs with the
/// same handle stand for the same underlying value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u32);

impl Handle {
    pub(crate) fn slot(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a children row: `bucket` is the depth level, `row` the index
/// inside that bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub bucket: usize,
    pub row: usize,
}

impl Position {
    pub fn new(bucket: usize, row: usize) -> Self {
        Self { bucket, row }
    }
}

/// What a stub stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StubKind {
    Array,
    Object,
    Resource,
    /// A string longer than the configured maximum.
    CutString,
}

/// Ordered key/value annotations attached by casters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, keeping its original position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Placeholder for a composite, an opaque resource, or a cut string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stub {
    pub kind: StubKind,
    /// Class name, resource type, or array subtype ("indexed", "assoc").
    pub type_name: String,
    /// The kept prefix of a cut string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_value: Option<String>,
    /// Children (or characters, for cut strings) that were not materialized.
    #[serde(default)]
    pub cut_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    /// How many times the handle is referenced besides its definition.
    #[serde(default)]
    pub ref_count: u32,
    /// Set on stubs that point back at an earlier definition.
    #[serde(default)]
    pub is_reference: bool,
    /// Where the children row lives; always one bucket below the stub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Stub {
    pub fn new(kind: StubKind, type_name: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            inline_value: None,
            cut_count: 0,
            handle: None,
            ref_count: 0,
            is_reference: false,
            position: None,
            attributes: Attributes::new(),
        }
    }

    /// A cut-string marker keeping `prefix` and counting `cut` omitted chars.
    pub fn cut_string(prefix: String, cut: usize) -> Self {
        Self {
            inline_value: Some(prefix),
            cut_count: cut,
            ..Self::new(StubKind::CutString, "string")
        }
    }

    /// A reference stub pointing back at `definition`.
    pub(crate) fn reference_to(definition: &Stub) -> Self {
        Self {
            handle: definition.handle,
            is_reference: true,
            ..Self::new(definition.kind, definition.type_name.clone())
        }
    }

    pub fn is_array(&self) -> bool {
        self.kind == StubKind::Array
    }

    pub fn is_cut(&self) -> bool {
        self.cut_count > 0
    }

    /// True when the handle is shared with at least one other stub.
    pub fn is_shared(&self) -> bool {
        self.ref_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut attrs = Attributes::new();
        attrs.set("b", 1i64);
        attrs.set("a", true);
        attrs.set("b", 2i64);

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(attrs.get("b"), Some(&Value::Int(2)));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_cut_string_stub() {
        let stub = Stub::cut_string("abc".to_string(), 4);
        assert_eq!(stub.kind, StubKind::CutString);
        assert_eq!(stub.inline_value.as_deref(), Some("abc"));
        assert!(stub.is_cut());
        assert_eq!(stub.handle, None);
    }

    #[test]
    fn test_reference_copies_identity_not_children() {
        let mut def = Stub::new(StubKind::Object, "Foo");
        def.handle = Some(Handle(3));
        def.position = Some(Position::new(1, 0));
        def.attributes.set("x", 1i64);

        let r = Stub::reference_to(&def);
        assert_eq!(r.handle, Some(Handle(3)));
        assert!(r.is_reference);
        assert_eq!(r.position, None);
        assert!(r.attributes.is_empty());
        assert_eq!(r.type_name, "Foo");
    }
}
