#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/varclone/main/assets/varclone.svg",
    issue_tracker_base_url = "https://github.com/storyscript/varclone/issues/"
)]

//! Rendering and persistence for varclone snapshots.
//!
//! This crate only reads snapshots through the [`varclone::Data`] view; it
//! never touches the cloner.
//!
//! ```
//! use varclone::{Cloner, Var};
//! use varclone_dump::TextDump;
//!
//! let data = Cloner::new().clone_var(&Var::list(vec![1, 2]));
//! assert_eq!(TextDump::new(&data).to_string(), "array:2 [\n  0 => 1\n  1 => 2\n]\n");
//! ```
//!
//! ## Modules
//!
//! - [`text`] - Indented plain-text dumps
//! - [`ron`](mod@crate::ron) - RON storage of snapshots

pub mod ron;
pub mod text;

pub use crate::ron::{load_data, LoadError, SnapshotRon};
pub use crate::text::TextDump;
