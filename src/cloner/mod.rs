//! The cloner: turns a live value graph into a bounded [`Snapshot`].
//!
//! Values are flattened breadth-first with an explicit queue, so arbitrarily
//! deep or cyclic graphs never grow the call stack. Every composite gets a
//! handle the first time it is seen; later encounters become reference stubs
//! carrying the same handle.
//!
//! [`Snapshot`]: crate::Snapshot

mod config;
mod run;

use std::sync::Arc;

pub use config::{ClonerConfig, Limit};

use crate::caster::{CastContext, CasterFilter, CasterFn, CasterRegistry, CasterTarget};
use crate::data::Data;
use crate::errors::{CasterError, Result};
use crate::var::{Children, Var};

use self::run::CloneRun;

/// A reusable, thread-safe cloner.
///
/// Clone calls share nothing but the configuration and the casters; every
/// call gets its own identity table, queue and item budget.
#[derive(Debug, Clone, Default)]
pub struct Cloner {
    config: ClonerConfig,
    casters: CasterRegistry,
}

impl Cloner {
    /// A cloner with default limits and no casters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cloner with default limits and the given casters, registered in
    /// iteration order.
    pub fn with_casters<I, T>(casters: I) -> Self
    where
        I: IntoIterator<Item = (T, Arc<CasterFn>)>,
        T: Into<CasterTarget>,
    {
        let mut cloner = Self::new();
        cloner.casters.add_casters(casters);
        cloner
    }

    pub fn with_config(mut self, config: ClonerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ClonerConfig {
        &self.config
    }

    pub fn casters(&self) -> &CasterRegistry {
        &self.casters
    }

    pub fn casters_mut(&mut self) -> &mut CasterRegistry {
        &mut self.casters
    }

    /// Register one more caster. See [`CasterRegistry::register`].
    pub fn register<T, F>(&mut self, target: T, caster: F)
    where
        T: Into<CasterTarget>,
        F: Fn(&Var, Children, &mut CastContext) -> std::result::Result<Children, CasterError>
            + Send
            + Sync
            + 'static,
    {
        self.casters.register(target, caster);
    }

    /// Deepest bucket that may receive rows; `-1` for no limit.
    pub fn set_max_depth(&mut self, max_depth: i64) -> Result<()> {
        self.config.max_depth = Limit::parse("max_depth", max_depth)?;
        Ok(())
    }

    /// Depth up to which entries are never charged to the item budget;
    /// `-1` exempts every depth.
    pub fn set_min_depth(&mut self, min_depth: i64) -> Result<()> {
        self.config.min_depth = Limit::parse("min_depth", min_depth)?
            .get()
            .unwrap_or(usize::MAX);
        Ok(())
    }

    /// Budget of entries past `min_depth`; `-1` for no limit.
    pub fn set_max_items(&mut self, max_items: i64) -> Result<()> {
        self.config.max_items = Limit::parse("max_items", max_items)?;
        Ok(())
    }

    /// Longest string kept whole, in chars; `-1` for no limit.
    pub fn set_max_string(&mut self, max_string: i64) -> Result<()> {
        self.config.max_string = Limit::parse("max_string", max_string)?;
        Ok(())
    }

    /// Snapshot `var` under the current limits.
    ///
    /// Never fails: limits turn into cut counts and failing casters into stub
    /// attributes.
    pub fn clone_var(&self, var: &Var) -> Data {
        self.clone_var_with_filter(var, CasterFilter::empty())
    }

    /// Like [`Cloner::clone_var`], handing `filter` to every caster through
    /// [`CastContext::filter`].
    pub fn clone_var_with_filter(&self, var: &Var, filter: CasterFilter) -> Data {
        tracing::debug!(
            max_depth = %self.config.max_depth,
            min_depth = self.config.min_depth,
            max_items = %self.config.max_items,
            max_string = %self.config.max_string,
            filter = filter.bits(),
            value = ?var,
            "cloning value"
        );
        let snapshot = CloneRun::new(&self.config, &self.casters)
            .with_filter(filter)
            .run(var);
        Data::new(Arc::new(snapshot))
    }
}
