//! Live value model handed to the cloner.
//!
//! Scalars are stored inline. Arrays and objects are shared behind
//! `Rc<RefCell<_>>` so the same composite can be reachable from several
//! places, including from inside itself. The address of that shared
//! allocation is the value's identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::snapshot::Key;

/// Shared, mutable composite storage.
pub type Shared<T> = Rc<RefCell<T>>;

/// Ordered child mapping, as produced by intrinsic expansion or by casters.
pub type Children = Vec<(Key, Var)>;

/// Subtype of an array, derived from its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// Keys are exactly `0, 1, .., n - 1` in order.
    Indexed,
    /// Anything else.
    Assoc,
}

impl ArrayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrayKind::Indexed => "indexed",
            ArrayKind::Assoc => "assoc",
        }
    }
}

/// An ordered container of keyed entries.
#[derive(Clone, Default)]
pub struct ArrayVar {
    entries: Vec<(Key, Var)>,
    next_index: i64,
}

impl ArrayVar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under the next free integer key.
    pub fn push(&mut self, value: Var) {
        let key = Key::Index(self.next_index);
        self.next_index += 1;
        self.entries.push((key, value));
    }

    /// Set `key` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, key: Key, value: Var) {
        if let Key::Index(i) = key {
            self.next_index = self.next_index.max(i.saturating_add(1));
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &Key) -> Option<&Var> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(Key, Var)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self) -> ArrayKind {
        let indexed = self
            .entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| *k == Key::Index(i as i64));
        if indexed {
            ArrayKind::Indexed
        } else {
            ArrayKind::Assoc
        }
    }
}

/// A record with a class name and ordered properties.
#[derive(Clone)]
pub struct ObjectVar {
    class: String,
    ancestors: Vec<String>,
    properties: Vec<(Key, Var)>,
}

impl ObjectVar {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ancestors: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Declare a parent class or implemented interface.
    ///
    /// Ancestors are matched by casters in the order they are declared, so
    /// declare the closest parent first.
    pub fn extends(mut self, ancestor: impl Into<String>) -> Self {
        self.ancestors.push(ancestor.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<Key>, value: impl Into<Var>) -> Self {
        self.set_property(name.into(), value.into());
        self
    }

    pub fn set_property(&mut self, name: Key, value: Var) {
        match self.properties.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name, value)),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    pub fn properties(&self) -> &[(Key, Var)] {
        &self.properties
    }
}

/// An opaque handle such as a stream or a connection.
///
/// Resources have no intrinsic children; only casters can give them any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceVar {
    type_name: String,
    id: u64,
}

impl ResourceVar {
    pub fn new(type_name: impl Into<String>, id: u64) -> Self {
        Self {
            type_name: type_name.into(),
            id,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Any value the cloner can snapshot.
#[derive(Clone)]
pub enum Var {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Shared<ArrayVar>),
    Object(Shared<ObjectVar>),
    Resource(Rc<ResourceVar>),
}

impl Var {
    /// A new, empty array.
    pub fn array() -> Self {
        Var::Array(Rc::new(RefCell::new(ArrayVar::new())))
    }

    /// An indexed array of `items`.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Var>,
    {
        let mut array = ArrayVar::new();
        for item in items {
            array.push(item.into());
        }
        Var::Array(Rc::new(RefCell::new(array)))
    }

    /// An array with explicit keys, in the given order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Var>,
    {
        let mut array = ArrayVar::new();
        for (k, v) in entries {
            array.insert(k.into(), v.into());
        }
        Var::Array(Rc::new(RefCell::new(array)))
    }

    pub fn object(object: ObjectVar) -> Self {
        Var::Object(Rc::new(RefCell::new(object)))
    }

    pub fn resource(type_name: impl Into<String>, id: u64) -> Self {
        Var::Resource(Rc::new(ResourceVar::new(type_name, id)))
    }

    /// Append to an array. Returns `false` if `self` is not an array.
    pub fn push(&self, value: impl Into<Var>) -> bool {
        match self {
            Var::Array(array) => {
                array.borrow_mut().push(value.into());
                true
            }
            _ => false,
        }
    }

    /// Set an array entry. Returns `false` if `self` is not an array.
    pub fn insert(&self, key: impl Into<Key>, value: impl Into<Var>) -> bool {
        match self {
            Var::Array(array) => {
                array.borrow_mut().insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    /// Set an object property. Returns `false` if `self` is not an object.
    pub fn set_property(&self, name: impl Into<Key>, value: impl Into<Var>) -> bool {
        match self {
            Var::Object(object) => {
                object.borrow_mut().set_property(name.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Var::Array(_) | Var::Object(_) | Var::Resource(_))
    }

    /// Address of the shared allocation, for composites.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Var::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Var::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Var::Resource(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// Class name for objects, resource type for resources.
    pub fn class_name(&self) -> Option<String> {
        match self {
            Var::Object(object) => object.try_borrow().ok().map(|o| o.class.clone()),
            Var::Resource(resource) => Some(resource.type_name.clone()),
            _ => None,
        }
    }

    /// The children the value exposes when no caster rewrites them.
    ///
    /// A composite that is mutably borrowed elsewhere yields no children
    /// rather than panicking.
    pub fn intrinsic_children(&self) -> Children {
        match self {
            Var::Array(array) => array
                .try_borrow()
                .map(|a| a.entries.clone())
                .unwrap_or_default(),
            Var::Object(object) => object
                .try_borrow()
                .map(|o| o.properties.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Var {
    // Shallow on purpose: a derived impl would never finish on a cycle.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Null => write!(f, "Null"),
            Var::Bool(b) => write!(f, "Bool({})", b),
            Var::Int(i) => write!(f, "Int({})", i),
            Var::Float(x) => write!(f, "Float({:?})", x),
            Var::Str(s) => write!(f, "Str({:?})", s),
            Var::Array(array) => match array.try_borrow() {
                Ok(a) => write!(f, "Array(len={})", a.len()),
                Err(_) => write!(f, "Array(<borrowed>)"),
            },
            Var::Object(object) => match object.try_borrow() {
                Ok(o) => write!(f, "Object({})", o.class),
                Err(_) => write!(f, "Object(<borrowed>)"),
            },
            Var::Resource(resource) => {
                write!(f, "Resource({} #{})", resource.type_name, resource.id)
            }
        }
    }
}

impl From<bool> for Var {
    fn from(b: bool) -> Self {
        Var::Bool(b)
    }
}

impl From<i64> for Var {
    fn from(i: i64) -> Self {
        Var::Int(i)
    }
}

impl From<i32> for Var {
    fn from(i: i32) -> Self {
        Var::Int(i64::from(i))
    }
}

impl From<u32> for Var {
    fn from(i: u32) -> Self {
        Var::Int(i64::from(i))
    }
}

impl From<f64> for Var {
    fn from(x: f64) -> Self {
        Var::Float(x)
    }
}

impl From<&str> for Var {
    fn from(s: &str) -> Self {
        Var::Str(s.to_string())
    }
}

impl From<String> for Var {
    fn from(s: String) -> Self {
        Var::Str(s)
    }
}

impl<T: Into<Var>> From<Option<T>> for Var {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Var::Null)
    }
}

impl<T: Into<Var>> From<Vec<T>> for Var {
    fn from(items: Vec<T>) -> Self {
        Var::list(items)
    }
}

impl From<serde_json::Value> for Var {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Var::Null,
            Json::Bool(b) => Var::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Var::Int(i),
                None => Var::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Var::Str(s),
            Json::Array(items) => Var::list(items),
            Json::Object(fields) => Var::map(fields),
        }
    }
}
