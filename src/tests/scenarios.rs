use crate::{Cloner, ClonerConfig, Handle, Key, Plain, Position, StubKind, Value, Var};

// ============ Scalars ============

#[test]
fn flat_scalar_list() {
    let var = Var::list(vec![
        Var::Int(1),
        Var::Float(4.5),
        Var::from("abc"),
        Var::Null,
        Var::Bool(false),
    ]);
    let data = Cloner::new().clone_var(&var);
    let snapshot = data.snapshot();

    assert_eq!(snapshot.buckets.len(), 1);
    let row = &snapshot.buckets[0][0];
    let values: Vec<&Value> = row.iter().map(|(_, v)| v).collect();
    assert_eq!(
        values,
        vec![
            &Value::Int(1),
            &Value::Float(4.5),
            &Value::Str("abc".into()),
            &Value::Null,
            &Value::Bool(false),
        ]
    );

    let types: Vec<String> = data.children().map(|(_, child)| child.get_type()).collect();
    assert_eq!(types, vec!["int", "float", "string", "null", "bool"]);
}

#[test]
fn scalar_root_gets_synthetic_row() {
    let data = Cloner::new().clone_var(&Var::Int(42));
    let snapshot = data.snapshot();

    assert_eq!(snapshot.root, Value::Int(42));
    assert_eq!(snapshot.buckets.len(), 1);
    assert_eq!(snapshot.buckets[0][0].get(&Key::Index(0)), Some(&Value::Int(42)));
    assert_eq!(data.get_value(true), Plain::Int(42));
    assert!(data.is_empty());
}

// ============ Self reference ============

#[test]
fn direct_self_reference() {
    let a = Var::array();
    a.push(a.clone());

    let data = Cloner::new().clone_var(&a);
    let outer = data.stub().expect("root stub");
    assert_eq!(outer.handle, Some(Handle(1)));
    assert_eq!(outer.ref_count, 1);
    assert!(!outer.is_reference);
    assert_eq!(outer.position, Some(Position::new(0, 0)));

    let inner = data.seek(&Key::Index(0)).expect("inner");
    let inner = inner.stub().expect("inner stub");
    assert_eq!(inner.handle, outer.handle);
    assert!(inner.is_reference);
    assert_eq!(inner.ref_count, 1);
    assert_eq!(inner.position, None);

    assert_eq!(data.snapshot().buckets.len(), 1);
}

// ============ Depth ============

#[test]
fn deep_nesting_is_cut_at_max_depth() {
    let mut var = Var::list(vec![1]);
    for _ in 0..24 {
        var = Var::list(vec![var]);
    }

    let data = Cloner::new().clone_var(&var);
    let snapshot = data.snapshot();

    assert_eq!(snapshot.buckets.len(), 21);
    let last_row = snapshot.buckets[20].last().expect("row in bucket 20");
    let (_, last) = last_row.entry(last_row.len() - 1).expect("entry");
    let stub = last.as_stub().expect("stub");
    assert_eq!(stub.kind, StubKind::Array);
    assert_eq!(stub.position, None);
    assert_eq!(stub.cut_count, 1);

    let parent = snapshot.buckets[19][0].entry(0).and_then(|(_, v)| v.as_stub()).expect("stub");
    assert_eq!(parent.position, Some(Position::new(20, 0)));
}

// ============ Item budget ============

#[test]
fn item_budget_on_large_list() {
    let var = Var::list(vec![Var::list(vec!["x"; 15_000])]);
    let config = ClonerConfig::new().with_max_items(5usize).with_min_depth(1);
    let data = Cloner::new().with_config(config).clone_var(&var);
    let snapshot = data.snapshot();

    assert_eq!(snapshot.buckets[0][0].len(), 1);
    assert_eq!(snapshot.buckets[1].len(), 1);
    assert_eq!(snapshot.buckets[1][0].len(), 5);
    assert_eq!(snapshot.stats.items, 5);

    let owner = data.seek(&Key::Index(0)).expect("inner list");
    let stub = owner.stub().expect("stub");
    assert_eq!(stub.cut_count, 14_995);
    assert_eq!(stub.position, Some(Position::new(1, 0)));
    assert_eq!(owner.len(), 5);
}

// ============ Strings ============

#[test]
fn long_string_root_is_truncated() {
    let mut cloner = Cloner::new();
    cloner.set_max_string(20).unwrap();
    let data = cloner.clone_var(&Var::from("ABCDEFGHIJKLMNOPQRSTUVWXYZ0123"));

    let stub = data.stub().expect("cut string");
    assert_eq!(stub.kind, StubKind::CutString);
    assert_eq!(stub.inline_value.as_deref(), Some("ABCDEFGHIJKLMNOPQRST"));
    assert_eq!(stub.cut_count, 10);
    assert_eq!(
        data.get_value(false),
        Plain::CutStr {
            prefix: "ABCDEFGHIJKLMNOPQRST".into(),
            cut: 10
        }
    );
    assert_eq!(data.get_type(), "string");
    assert_eq!(data.to_string(), "ABCDEFGHIJKLMNOPQRST…");
}
