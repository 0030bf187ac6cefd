#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/varclone/main/assets/varclone.svg",
    issue_tracker_base_url = "https://github.com/storyscript/varclone/issues/"
)]

//! Bounded, cycle-safe snapshots of arbitrary value graphs.
//!
//! A [`Cloner`] takes a live [`Var`] graph (scalars, arrays, objects and
//! opaque resources, possibly shared or cyclic) and flattens it breadth-first
//! into a [`Snapshot`]: a list of depth buckets holding rows of entries, where
//! every composite is a [`Stub`] pointing one bucket deeper. The result is
//! finite whatever the input, and is navigated through a [`Data`] cursor.
//!
//! ```
//! use varclone::{Cloner, Key, Var};
//!
//! let list = Var::list(vec![1, 2]);
//! list.push(list.clone());
//!
//! let data = Cloner::new().clone_var(&list);
//! let inner = data.seek(&Key::Index(2)).unwrap();
//! assert_eq!(inner.stub().unwrap().handle, data.stub().unwrap().handle);
//! assert_eq!(data.to_string(), "array (count=3)");
//! ```
//!
//! ## Modules
//!
//! - [`var`] - The input value model
//! - [`stub`] - Placeholders for composites inside a snapshot
//! - [`snapshot`] - Buckets, rows and entries
//! - [`caster`] - Caster registration and dispatch
//! - [`casters`] - Generic casters
//! - [`cloner`] - Breadth-first flattening and its limits
//! - [`data`] - Read-only cursor over a snapshot
//! - [`errors`] - Error types

pub mod caster;
pub mod casters;
pub mod cloner;
pub mod data;
pub mod errors;
pub mod snapshot;
pub mod stub;
pub mod var;

pub use caster::{CastContext, CasterFilter, CasterFn, CasterRegistry, CasterTarget};
pub use cloner::{Cloner, ClonerConfig, Limit};
pub use data::{Data, DataIter, DataOptions, Plain, RefHandleMode};
pub use errors::{CasterError, ConfigError, SnapshotError};
pub use snapshot::{Key, Row, Snapshot, SnapshotStats, Value};
pub use stub::{Attributes, Handle, Position, Stub, StubKind};
pub use var::{ArrayKind, ArrayVar, Children, ObjectVar, ResourceVar, Var};
