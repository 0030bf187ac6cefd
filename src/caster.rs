//! Caster registration and dispatch.
//!
//! A caster rewrites the children of a composite before the cloner flattens
//! them. Casters are keyed by a [`CasterTarget`]; for a given value every
//! matching target is visited from the most specific to the least specific
//! (class, ancestors in declared order, then the wildcard), and within one
//! target casters run in registration order. Each caster receives the output
//! of the previous one, starting from the value's intrinsic children.
//!
//! # Example
//!
//! ```
//! use varclone::{CasterRegistry, CasterTarget, Key, Var};
//!
//! let mut casters = CasterRegistry::new();
//! casters.register("App\\Secret", |_var, mut children, ctx| {
//!     children.retain(|(key, _)| *key != Key::from("token"));
//!     ctx.set_attribute("sensitive", true);
//!     Ok(children)
//! });
//! assert_eq!(casters.len(), 1);
//! assert!(casters.has_target(&CasterTarget::class("app\\secret")));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bitflags::bitflags;

use crate::errors::CasterError;
use crate::snapshot::Value;
use crate::stub::Attributes;
use crate::var::{Children, Var};

/// Signature of a caster transform.
pub type CasterFn =
    dyn Fn(&Var, Children, &mut CastContext) -> Result<Children, CasterError> + Send + Sync;

/// What a caster is registered for.
///
/// Parsed from strings the same way caster maps are usually written: `"*"`
/// is the wildcard, `":stream"` a resource type, `"array"` arrays, anything
/// else a class or interface name. Names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CasterTarget {
    /// An object's class, one of its ancestors, or an interface it declares.
    Class(String),
    Resource(String),
    Array,
    Wildcard,
}

impl CasterTarget {
    pub fn class(name: impl Into<String>) -> Self {
        CasterTarget::Class(name.into())
    }

    pub fn resource(type_name: impl Into<String>) -> Self {
        CasterTarget::Resource(type_name.into())
    }

    fn normalized(self) -> Self {
        match self {
            CasterTarget::Class(name) => CasterTarget::Class(name.to_lowercase()),
            CasterTarget::Resource(name) => CasterTarget::Resource(name.to_lowercase()),
            other => other,
        }
    }

    /// Targets matching `var`, most specific first.
    fn chain(var: &Var) -> Vec<CasterTarget> {
        let mut chain = Vec::new();
        match var {
            Var::Object(object) => {
                if let Ok(object) = object.try_borrow() {
                    chain.push(CasterTarget::Class(object.class().to_lowercase()));
                    chain.extend(
                        object
                            .ancestors()
                            .iter()
                            .map(|a| CasterTarget::Class(a.to_lowercase())),
                    );
                }
            }
            Var::Resource(resource) => {
                chain.push(CasterTarget::Resource(resource.type_name().to_lowercase()));
            }
            Var::Array(_) => chain.push(CasterTarget::Array),
            _ => return chain,
        }
        chain.push(CasterTarget::Wildcard);
        chain
    }
}

impl From<&str> for CasterTarget {
    fn from(tag: &str) -> Self {
        match tag {
            "*" => CasterTarget::Wildcard,
            "array" => CasterTarget::Array,
            _ => match tag.strip_prefix(':') {
                Some(resource) => CasterTarget::Resource(resource.to_string()),
                None => CasterTarget::Class(tag.to_string()),
            },
        }
    }
}

impl From<String> for CasterTarget {
    fn from(tag: String) -> Self {
        CasterTarget::from(tag.as_str())
    }
}

impl fmt::Display for CasterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasterTarget::Class(name) => write!(f, "{}", name),
            CasterTarget::Resource(name) => write!(f, ":{}", name),
            CasterTarget::Array => write!(f, "array"),
            CasterTarget::Wildcard => write!(f, "*"),
        }
    }
}

bitflags! {
    /// Exclusion hints passed to every caster of one clone call.
    ///
    /// The cloner never applies them itself; casters that understand a flag
    /// drop the matching children, see [`crate::casters::skip_excluded`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CasterFilter: u32 {
        /// Leave out details only useful when debugging the value's internals.
        const VERBOSE = 1 << 0;
        /// Leave out children a caster computes rather than reads.
        const VIRTUAL = 1 << 1;
        /// Leave out properties added at runtime.
        const DYNAMIC = 1 << 2;
        const PUBLIC = 1 << 3;
        const PROTECTED = 1 << 4;
        const PRIVATE = 1 << 5;
        /// Leave out null children.
        const NULL = 1 << 6;
        /// Leave out null, false, zero, empty strings and empty arrays.
        const EMPTY = 1 << 7;
        const NOT_IMPORTANT = 1 << 8;
        /// Invert the visibility flags: keep only what they name.
        const STRICT = 1 << 9;
    }
}

impl Default for CasterFilter {
    fn default() -> Self {
        Self::empty()
    }
}

/// Mutable view of the stub being built, handed to every caster.
#[derive(Debug, Clone)]
pub struct CastContext {
    attributes: Attributes,
    default_type_name: String,
    type_name: String,
    cut: usize,
    is_nested: bool,
    filter: CasterFilter,
}

impl CastContext {
    pub(crate) fn new(type_name: String, is_nested: bool) -> Self {
        Self {
            attributes: Attributes::new(),
            default_type_name: type_name.clone(),
            type_name,
            cut: 0,
            is_nested,
            filter: CasterFilter::empty(),
        }
    }

    pub(crate) fn with_filter(mut self, filter: CasterFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Attach an annotation to the eventual stub.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(name, value);
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Override the type name shown for the value.
    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Record children the caster dropped on purpose; they add to the stub's
    /// cut count.
    pub fn cut(&mut self, count: usize) {
        self.cut += count;
    }

    pub fn cut_count(&self) -> usize {
        self.cut
    }

    /// False only for the root value.
    pub fn is_nested(&self) -> bool {
        self.is_nested
    }

    /// Exclusions requested by the caller of the clone.
    pub fn filter(&self) -> CasterFilter {
        self.filter
    }

    pub(crate) fn into_parts(self) -> (Attributes, String, usize) {
        (self.attributes, self.type_name, self.cut)
    }
}

/// Lookup table from [`CasterTarget`] to transforms.
#[derive(Clone, Default)]
pub struct CasterRegistry {
    casters: HashMap<CasterTarget, Vec<Arc<CasterFn>>>,
}

impl CasterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `caster` for `target`, after any caster already registered
    /// for the same target.
    pub fn register<T, F>(&mut self, target: T, caster: F)
    where
        T: Into<CasterTarget>,
        F: Fn(&Var, Children, &mut CastContext) -> Result<Children, CasterError>
            + Send
            + Sync
            + 'static,
    {
        self.register_arc(target, Arc::new(caster));
    }

    /// Register an already shared caster.
    pub fn register_arc<T: Into<CasterTarget>>(&mut self, target: T, caster: Arc<CasterFn>) {
        self.casters
            .entry(target.into().normalized())
            .or_default()
            .push(caster);
    }

    /// Register a batch of casters, in iteration order.
    pub fn add_casters<I, T>(&mut self, casters: I)
    where
        I: IntoIterator<Item = (T, Arc<CasterFn>)>,
        T: Into<CasterTarget>,
    {
        for (target, caster) in casters {
            self.register_arc(target, caster);
        }
    }

    pub fn has_target(&self, target: &CasterTarget) -> bool {
        self.casters.contains_key(&target.clone().normalized())
    }

    /// Total number of registered casters.
    pub fn len(&self) -> usize {
        self.casters.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.casters.is_empty()
    }

    /// Compute the children of `var`, running every matching caster.
    ///
    /// A caster that fails or panics cancels the whole chain: the intrinsic
    /// children are returned, the context is reset, and the failing target is
    /// recorded in the `caster_failed` and `caster_error` attributes.
    pub fn cast(&self, var: &Var, ctx: &mut CastContext) -> Children {
        let mut children = var.intrinsic_children();
        if self.casters.is_empty() {
            return children;
        }

        for target in CasterTarget::chain(var) {
            let Some(casters) = self.casters.get(&target) else {
                continue;
            };
            for caster in casters {
                let input = std::mem::take(&mut children);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| (**caster)(var, input, &mut *ctx)));
                let error = match outcome {
                    Ok(Ok(output)) => {
                        children = output;
                        continue;
                    }
                    Ok(Err(error)) => error,
                    Err(payload) => CasterError::Panicked(panic_message(payload.as_ref())),
                };
                return Self::fall_back(var, &target, error, ctx);
            }
        }

        children
    }

    fn fall_back(
        var: &Var,
        target: &CasterTarget,
        error: CasterError,
        ctx: &mut CastContext,
    ) -> Children {
        tracing::warn!(target_tag = %target, value = ?var, %error, "caster failed, using intrinsic children");

        *ctx = CastContext::new(ctx.default_type_name.clone(), ctx.is_nested).with_filter(ctx.filter);
        ctx.set_attribute("caster_failed", target.to_string());
        ctx.set_attribute("caster_error", error.to_string());
        var.intrinsic_children()
    }
}

impl fmt::Debug for CasterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut targets: Vec<String> = self
            .casters
            .iter()
            .map(|(target, list)| format!("{} x{}", target, list.len()))
            .collect();
        targets.sort();
        f.debug_struct("CasterRegistry").field("targets", &targets).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
