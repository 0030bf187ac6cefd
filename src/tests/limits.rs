use crate::{Cloner, ClonerConfig, DataOptions, Key, Limit, Position, StubKind, Value, Var};

fn cloner(config: ClonerConfig) -> Cloner {
    Cloner::new().with_config(config)
}

// ============ max_depth ============

#[test]
fn zero_depth_keeps_root_row_only() {
    let var = Var::list(vec![Var::from(1), Var::list(vec![1, 2, 3])]);
    let data = cloner(ClonerConfig::new().with_max_depth(0usize)).clone_var(&var);

    assert_eq!(data.snapshot().buckets.len(), 1);
    let nested = data.child_at(1).expect("nested");
    let stub = nested.stub().expect("stub");
    assert_eq!(stub.position, None);
    assert_eq!(stub.cut_count, 3);
    assert_eq!(data.snapshot().stats.cut_entries, 3);
}

#[test]
fn empty_composite_is_not_cut() {
    let var = Var::list(vec![Var::array()]);
    let data = cloner(ClonerConfig::new().with_max_depth(0usize)).clone_var(&var);
    let stub = data.child_at(0).and_then(|d| d.stub().cloned()).expect("stub");
    assert_eq!(stub.cut_count, 0);
    assert_eq!(stub.position, None);
}

#[test]
fn no_bucket_past_max_depth() {
    let mut var = Var::list(vec!["leaf"]);
    for _ in 0..10 {
        var = Var::list(vec![var.clone(), Var::list(vec![var])]);
    }
    for max_depth in 0..6usize {
        let data = cloner(ClonerConfig::new().with_max_depth(max_depth)).clone_var(&var);
        assert!(data.snapshot().buckets.len() <= max_depth + 1);
        for stub in data.snapshot().stubs() {
            if let Some(position) = stub.position {
                assert!(position.bucket <= max_depth);
            }
        }
    }
}

// ============ max_items ============

#[test]
fn budget_spans_rows_of_one_bucket() {
    let var = Var::list(vec![
        Var::list(vec![1, 2, 3]),
        Var::list(vec![4, 5, 6]),
        Var::list(vec![7]),
    ]);
    let data = cloner(ClonerConfig::new().with_max_items(4usize)).clone_var(&var);
    let snapshot = data.snapshot();

    assert_eq!(snapshot.buckets[1].len(), 2);
    assert_eq!(snapshot.buckets[1][0].len(), 3);
    assert_eq!(snapshot.buckets[1][1].len(), 1);
    assert_eq!(snapshot.stats.items, 4);

    let cuts: Vec<(usize, Option<Position>)> = data
        .children()
        .filter_map(|(_, d)| d.stub().map(|s| (s.cut_count, s.position)))
        .collect();
    assert_eq!(
        cuts,
        vec![
            (0, Some(Position::new(1, 0))),
            (2, Some(Position::new(1, 1))),
            (1, None),
        ]
    );
}

#[test]
fn min_depth_zero_charges_root_children() {
    let var = Var::list(vec![1, 2, 3]);
    let config = ClonerConfig::new().with_max_items(2usize).with_min_depth(0);
    let data = cloner(config).clone_var(&var);

    assert_eq!(data.len(), 2);
    assert_eq!(data.stub().map(|s| s.cut_count), Some(1));
}

#[test]
fn exempt_depths_ignore_exhausted_budget() {
    let var = Var::list(vec![Var::list(vec![1]), Var::from(2), Var::from(3)]);
    let data = cloner(ClonerConfig::new().with_max_items(0usize)).clone_var(&var);

    assert_eq!(data.len(), 3);
    let inner = data.child_at(0).expect("inner");
    let stub = inner.stub().expect("stub");
    assert_eq!(stub.cut_count, 1);
    assert_eq!(stub.position, None);
    assert_eq!(data.snapshot().buckets.len(), 1);
}

#[test]
fn budget_never_exceeded() {
    let rows: Vec<Var> = (0..20).map(|i| Var::list(vec![i; 7])).collect();
    let var = Var::list(vec![Var::list(rows)]);
    for max_items in [0usize, 1, 6, 50, 139, 140, 1_000] {
        let data = cloner(ClonerConfig::new().with_max_items(max_items)).clone_var(&var);
        let snapshot = data.snapshot();
        let charged: usize = snapshot.buckets.iter().skip(1).flatten().map(|r| r.len()).sum();
        assert!(charged <= max_items, "{} > {}", charged, max_items);
        assert_eq!(charged, snapshot.stats.items);
        assert_eq!(charged, max_items.min(160));
    }
}

// ============ max_string ============

#[test]
fn strings_are_cut_by_chars() {
    let var = Var::map(vec![("latin", "héllo"), ("cjk", "短い文字列です"), ("short", "ok")]);
    let data = cloner(ClonerConfig::new().with_max_string(2usize)).clone_var(&var);

    let latin = data.seek(&Key::from("latin")).expect("latin");
    let stub = latin.stub().expect("stub");
    assert_eq!(stub.inline_value.as_deref(), Some("hé"));
    assert_eq!(stub.cut_count, 3);
    assert_eq!(latin.to_string(), "hé…");

    let cjk = data.seek(&Key::from("cjk")).and_then(|d| d.stub().cloned()).expect("stub");
    assert_eq!(cjk.kind, StubKind::CutString);
    assert_eq!(cjk.inline_value.as_deref(), Some("短い"));
    assert_eq!(cjk.cut_count, 5);
    assert_eq!(cjk.handle, None);

    let short = data.seek(&Key::from("short")).expect("short");
    assert_eq!(short.value(), &Value::Str("ok".into()));
}

#[test]
fn string_cut_applies_at_exempt_depth() {
    let var = Var::list(vec!["abcdef"]);
    let config = ClonerConfig::new().with_max_string(3usize).with_max_items(0usize);
    let data = cloner(config).clone_var(&var);

    let leaf = data.seek(&Key::Index(0)).expect("leaf");
    assert_eq!(leaf.stub().map(|s| s.cut_count), Some(3));
    assert_eq!(data.snapshot().stats.items, 0);
}

#[test]
fn view_options_do_not_inherit_cloner_limits() {
    let config = ClonerConfig::new()
        .with_max_depth(3usize)
        .with_max_items(5usize);
    let data = Cloner::new().with_config(config).clone_var(&Var::list(vec![1, 2]));
    assert_eq!(data.options(), &DataOptions::default());
    assert_eq!(data.options().max_depth, Limit::Unlimited);
    assert_eq!(data.options().max_items_per_depth, Limit::Unlimited);
}
