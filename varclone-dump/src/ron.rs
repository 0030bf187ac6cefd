//! RON persistence for snapshots.
//!
//! A stored snapshot can be read back and wrapped in a fresh [`Data`] view,
//! so a dump can be rendered again long after the cloned value is gone.

use std::sync::Arc;

use ::ron::error::SpannedError;
use ::ron::ser::PrettyConfig;
use thiserror::Error;
use varclone::{Data, Snapshot, SnapshotError};

/// Errors raised while reading a stored snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] SpannedError),

    #[error("malformed snapshot: {0}")]
    Invalid(#[from] SnapshotError),
}

/// Serialization helpers for [`Snapshot`].
pub trait SnapshotRon: Sized {
    /// Serialize to a pretty-printed RON string.
    fn to_ron_string(&self) -> Result<String, ::ron::Error>;

    /// Deserialize from a RON string.
    fn from_ron_string(s: &str) -> Result<Self, SpannedError>;
}

impl SnapshotRon for Snapshot {
    fn to_ron_string(&self) -> Result<String, ::ron::Error> {
        let config = PrettyConfig::new()
            .depth_limit(6)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        ::ron::ser::to_string_pretty(self, config)
    }

    fn from_ron_string(s: &str) -> Result<Self, SpannedError> {
        ::ron::from_str(s)
    }
}

/// Read a stored snapshot and open a view on its root.
///
/// The snapshot is validated first, so a rendered or hydrated view of it
/// always terminates.
pub fn load_data(s: &str) -> Result<Data, LoadError> {
    let snapshot = Snapshot::from_ron_string(s)?;
    snapshot.validate()?;
    Ok(Data::new(Arc::new(snapshot)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextDump;
    use varclone::{Cloner, ClonerConfig, Key, ObjectVar, Plain, Position, Row, Value, Var};

    fn sample() -> Data {
        let node = Var::object(
            ObjectVar::new("Node")
                .with_property("label", "héllo wörld")
                .with_property("weight", 0.25),
        );
        node.set_property("self", node.clone());
        let root = Var::list(vec![node, Var::resource("stream", 2), Var::Null]);
        let config = ClonerConfig::new().with_max_string(5usize);
        Cloner::new().with_config(config).clone_var(&root)
    }

    #[test]
    fn ron_roundtrip() {
        let data = sample();
        let ron_str = data.snapshot().to_ron_string().expect("serialization failed");
        let parsed = Snapshot::from_ron_string(&ron_str).expect("deserialization failed");
        assert_eq!(&parsed, data.snapshot().as_ref());

        let ron_str2 = parsed.to_ron_string().expect("re-serialization failed");
        assert_eq!(ron_str, ron_str2);
    }

    #[test]
    fn reloaded_view_renders_the_same() {
        let data = sample();
        let ron_str = data.snapshot().to_ron_string().expect("serialization failed");
        let reloaded = load_data(&ron_str).expect("load failed");

        assert_eq!(reloaded, data);
        assert_eq!(
            TextDump::new(&reloaded).to_string(),
            TextDump::new(&data).to_string()
        );
        let label = reloaded
            .seek(&Key::Index(0))
            .and_then(|node| node.seek(&Key::from("label")))
            .expect("label");
        assert_eq!(
            label.get_value(false),
            Plain::CutStr {
                prefix: "héllo".into(),
                cut: 6
            }
        );
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(matches!(load_data("(root: Nul"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn forged_positions_are_rejected() {
        let inner = Var::list(vec![1]);
        let data = Cloner::new().clone_var(&Var::list(vec![inner]));
        let mut forged = data.snapshot().as_ref().clone();

        // Point the inner list back at its own bucket.
        let mut stub = forged.buckets[0][0]
            .entry(0)
            .and_then(|(_, v)| v.as_stub())
            .cloned()
            .expect("inner stub");
        assert_eq!(stub.position, Some(Position::new(1, 0)));
        stub.position = Some(Position::new(0, 0));
        forged.buckets[0][0] = Row::from_iter([(Key::Index(0), Value::from(stub))]);

        let ron_str = forged.to_ron_string().expect("serialization failed");
        let err = load_data(&ron_str).expect_err("forged snapshot loaded");
        assert!(matches!(
            err,
            LoadError::Invalid(SnapshotError::MisplacedRow { depth: 1, target: 0 })
        ));
    }
}
