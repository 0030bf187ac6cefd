//! Cloner limits and their configuration.
//!
//! Limits are written as integers where `-1` means "unlimited", both in the
//! setters on [`Cloner`](crate::Cloner) and in TOML files:
//!
//! ```toml
//! max_depth = 10
//! min_depth = 1
//! max_items = 2500
//! max_string = -1
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, Result};

/// A non-negative bound, or no bound at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    Unlimited,
    At(usize),
}

impl Limit {
    /// Parse the integer form, naming the setting in the error.
    pub fn parse(name: &'static str, value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Limit::Unlimited),
            v if v < 0 => Err(ConfigError::NegativeLimit { name, value }),
            v => Ok(Limit::At(v as usize)),
        }
    }

    pub fn get(self) -> Option<usize> {
        match self {
            Limit::Unlimited => None,
            Limit::At(n) => Some(n),
        }
    }

    pub fn is_unlimited(self) -> bool {
        self == Limit::Unlimited
    }

    /// True when `value` goes past the bound.
    pub fn exceeded_by(self, value: usize) -> bool {
        match self {
            Limit::Unlimited => false,
            Limit::At(n) => value > n,
        }
    }
}

impl TryFrom<i64> for Limit {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self> {
        Limit::parse("limit", value)
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Unlimited => -1,
            Limit::At(n) => n as i64,
        }
    }
}

impl From<usize> for Limit {
    fn from(n: usize) -> Self {
        Limit::At(n)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => write!(f, "unlimited"),
            Limit::At(n) => write!(f, "{}", n),
        }
    }
}

/// Limits applied by one cloner to every value it clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClonerConfig {
    /// Deepest bucket that may receive rows. Composites whose children would
    /// go deeper are cut whole.
    pub max_depth: Limit,
    /// Entries at this depth or shallower never count against `max_items`.
    pub min_depth: usize,
    /// Budget of entries shared by every depth past `min_depth`.
    pub max_items: Limit,
    /// Longest string kept whole, in chars.
    pub max_string: Limit,
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            max_depth: Limit::At(20),
            min_depth: 1,
            max_items: Limit::Unlimited,
            max_string: Limit::Unlimited,
        }
    }
}

impl ClonerConfig {
    /// Create a config with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// No limit at all; only identity tracking bounds the snapshot.
    pub fn unbounded() -> Self {
        Self {
            max_depth: Limit::Unlimited,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: impl Into<Limit>) -> Self {
        self.max_depth = max_depth.into();
        self
    }

    pub fn with_min_depth(mut self, min_depth: usize) -> Self {
        self.min_depth = min_depth;
        self
    }

    pub fn with_max_items(mut self, max_items: impl Into<Limit>) -> Self {
        self.max_items = max_items.into();
        self
    }

    pub fn with_max_string(mut self, max_string: impl Into<Limit>) -> Self {
        self.max_string = max_string.into();
        self
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
