//! Generic casters that apply to any kind of value.
//!
//! Type-specific casters belong to the application that knows the types;
//! these only reshape children without looking at what they are.

use regex::Regex;

use crate::caster::{CastContext, CasterFilter};
use crate::errors::CasterError;
use crate::snapshot::Key;
use crate::var::{Children, Var};

/// Replacement stored in place of redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Drop every child, recording them as cut.
///
/// Useful for heavy service objects (containers, connections, mocks) whose
/// internals are noise in a dump.
pub fn cut_internals(
) -> impl Fn(&Var, Children, &mut CastContext) -> Result<Children, CasterError> + Send + Sync + 'static
{
    |_var: &Var, children: Children, ctx: &mut CastContext| -> Result<Children, CasterError> {
        ctx.cut(children.len());
        Ok(Vec::new())
    }
}

/// Replace the value of every child whose key matches `pattern` with
/// [`REDACTED`], and count the replacements in the `redacted` attribute.
pub fn redact_keys(
    pattern: Regex,
) -> impl Fn(&Var, Children, &mut CastContext) -> Result<Children, CasterError> + Send + Sync + 'static
{
    move |_var: &Var, children: Children, ctx: &mut CastContext| -> Result<Children, CasterError> {
        let mut redacted = 0usize;
        let children: Children = children
            .into_iter()
            .map(|(key, value)| {
                if matches!(&key, Key::Name(name) if pattern.is_match(name)) {
                    redacted += 1;
                    (key, Var::from(REDACTED))
                } else {
                    (key, value)
                }
            })
            .collect();
        if redacted > 0 {
            ctx.set_attribute("redacted", redacted);
        }
        Ok(children)
    }
}

/// Drop the children the clone's [`CasterFilter`] asks to leave out.
///
/// Honors [`CasterFilter::NULL`] and [`CasterFilter::EMPTY`]; dropped children
/// count as cut.
pub fn skip_excluded(
) -> impl Fn(&Var, Children, &mut CastContext) -> Result<Children, CasterError> + Send + Sync + 'static
{
    |_var: &Var, children: Children, ctx: &mut CastContext| -> Result<Children, CasterError> {
        let filter = ctx.filter();
        if !filter.intersects(CasterFilter::NULL | CasterFilter::EMPTY) {
            return Ok(children);
        }
        let before = children.len();
        let kept: Children = children
            .into_iter()
            .filter(|(_, value)| {
                let excluded = match value {
                    Var::Null => true,
                    _ if filter.contains(CasterFilter::EMPTY) => is_empty(value),
                    _ => false,
                };
                !excluded
            })
            .collect();
        ctx.cut(before - kept.len());
        Ok(kept)
    }
}

fn is_empty(value: &Var) -> bool {
    match value {
        Var::Null | Var::Bool(false) | Var::Int(0) => true,
        Var::Float(x) => *x == 0.0,
        Var::Str(s) => s.is_empty() || s == "0",
        Var::Array(array) => array.try_borrow().map_or(false, |a| a.is_empty()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caster::CasterRegistry;
    use crate::snapshot::Value;
    use crate::var::ObjectVar;

    #[test]
    fn test_cut_internals() {
        let mut registry = CasterRegistry::new();
        registry.register("Container", cut_internals());

        let var = Var::object(
            ObjectVar::new("Container")
                .with_property("services", Var::list(vec![1, 2, 3]))
                .with_property("params", Var::array()),
        );
        let mut ctx = CastContext::new("Container".into(), true);
        assert!(registry.cast(&var, &mut ctx).is_empty());
        assert_eq!(ctx.cut_count(), 2);
    }

    #[test]
    fn test_redact_keys() {
        let mut registry = CasterRegistry::new();
        registry.register("*", redact_keys(Regex::new("(?i)password|token").expect("regex")));

        let var = Var::map(vec![("user", "ann"), ("Password", "hunter2"), ("api_token", "t")]);
        let mut ctx = CastContext::new("assoc".into(), true);
        let children = registry.cast(&var, &mut ctx);

        assert!(matches!(&children[0].1, Var::Str(s) if s == "ann"));
        assert!(matches!(&children[1].1, Var::Str(s) if s == REDACTED));
        assert!(matches!(&children[2].1, Var::Str(s) if s == REDACTED));
        assert_eq!(ctx.attributes().get("redacted"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_redact_leaves_index_keys_alone() {
        let mut registry = CasterRegistry::new();
        registry.register("array", redact_keys(Regex::new("0").expect("regex")));

        let var = Var::list(vec!["a"]);
        let mut ctx = CastContext::new("indexed".into(), true);
        let children = registry.cast(&var, &mut ctx);
        assert!(matches!(&children[0].1, Var::Str(s) if s == "a"));
        assert!(ctx.attributes().is_empty());
    }

    #[test]
    fn test_skip_excluded_follows_filter() {
        let mut registry = CasterRegistry::new();
        registry.register("*", skip_excluded());
        let var = Var::map(vec![
            ("a", Var::Null),
            ("b", Var::from(0)),
            ("c", Var::array()),
            ("d", Var::from("x")),
        ]);

        let mut ctx = CastContext::new("assoc".into(), true);
        assert_eq!(registry.cast(&var, &mut ctx).len(), 4);
        assert_eq!(ctx.cut_count(), 0);

        let mut ctx = CastContext::new("assoc".into(), true).with_filter(CasterFilter::NULL);
        let children = registry.cast(&var, &mut ctx);
        let keys: Vec<String> = children.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
        assert_eq!(ctx.cut_count(), 1);

        let mut ctx = CastContext::new("assoc".into(), true).with_filter(CasterFilter::EMPTY);
        let children = registry.cast(&var, &mut ctx);
        let keys: Vec<String> = children.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["d"]);
        assert_eq!(ctx.cut_count(), 3);
    }
}
