//! Per-call state of one clone operation.
//!
//! Everything here lives for exactly one [`Cloner::clone_var`] call: the work
//! queue, the identity table, the item budget and the buckets being filled.
//!
//! [`Cloner::clone_var`]: crate::Cloner::clone_var

use std::collections::{HashMap, VecDeque};

use crate::caster::{CastContext, CasterFilter, CasterRegistry};
use crate::snapshot::{Key, Row, Snapshot, SnapshotStats, Value};
use crate::stub::{Handle, Position, Stub, StubKind};
use crate::var::{Children, Var};

use super::config::{ClonerConfig, Limit};

/// Where a stub was written, so later tasks can fill in its position and
/// cut count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StubLocation {
    Root,
    Entry {
        bucket: usize,
        row: usize,
        index: usize,
    },
}

/// Children of one composite, waiting to be written as a row.
struct Task {
    bucket: usize,
    owner: StubLocation,
    children: Children,
}

/// A composite that received a handle.
struct Definition {
    location: StubLocation,
    /// Identity part of the definition stub, copied into references.
    template: Stub,
    refs: u32,
    // Holding the value keeps its address from being reused by a caster's
    // temporary while the identity table is alive.
    _value: Var,
}

/// Running count of entries still allowed past the minimum depth.
#[derive(Debug, Clone, Copy)]
struct ItemBudget {
    remaining: Option<usize>,
}

impl ItemBudget {
    fn new(limit: Limit) -> Self {
        Self {
            remaining: limit.get(),
        }
    }

    /// Charge one entry. Returns `false` once the budget is spent.
    fn take(&mut self) -> bool {
        match &mut self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

pub(crate) struct CloneRun<'a> {
    config: &'a ClonerConfig,
    casters: &'a CasterRegistry,
    filter: CasterFilter,
    root: Value,
    buckets: Vec<Vec<Row>>,
    queue: VecDeque<Task>,
    identities: HashMap<usize, Handle>,
    definitions: Vec<Definition>,
    budget: ItemBudget,
    stats: SnapshotStats,
}

impl<'a> CloneRun<'a> {
    pub(crate) fn new(config: &'a ClonerConfig, casters: &'a CasterRegistry) -> Self {
        Self {
            config,
            casters,
            filter: CasterFilter::empty(),
            root: Value::Null,
            buckets: Vec::new(),
            queue: VecDeque::new(),
            identities: HashMap::new(),
            definitions: Vec::new(),
            budget: ItemBudget::new(config.max_items),
            stats: SnapshotStats::default(),
        }
    }

    pub(crate) fn with_filter(mut self, filter: CasterFilter) -> Self {
        self.filter = filter;
        self
    }

    pub(crate) fn run(mut self, var: &Var) -> Snapshot {
        let (root, task) = self.flatten(var, 0, StubLocation::Root, false);
        if !var.is_composite() {
            let mut row = Row::with_capacity(1);
            row.push(Key::Index(0), root.clone());
            self.buckets.push(vec![row]);
        }
        self.root = root;
        if let Some(task) = task {
            self.queue.push_back(task);
        }

        while let Some(task) = self.queue.pop_front() {
            self.write_row(task);
        }

        self.finish()
    }

    /// Turn one value into a snapshot entry. Composites seen for the first
    /// time also yield the task that will write their children.
    fn flatten(
        &mut self,
        var: &Var,
        child_bucket: usize,
        location: StubLocation,
        is_nested: bool,
    ) -> (Value, Option<Task>) {
        let identity = match (var, var.identity()) {
            (Var::Null, _) => return (Value::Null, None),
            (Var::Bool(b), _) => return (Value::Bool(*b), None),
            (Var::Int(i), _) => return (Value::Int(*i), None),
            (Var::Float(x), _) => return (Value::Float(*x), None),
            (Var::Str(s), _) => return (self.string(s), None),
            (_, Some(identity)) => identity,
            (_, None) => return (Value::Null, None),
        };

        if let Some(&handle) = self.identities.get(&identity) {
            if let Some(def) = handle.slot().and_then(|slot| self.definitions.get_mut(slot)) {
                def.refs += 1;
                return (Stub::reference_to(&def.template).into(), None);
            }
        }

        let (kind, type_name) = describe(var);
        let handle = Handle(self.definitions.len() as u32 + 1);
        self.identities.insert(identity, handle);

        let mut ctx = CastContext::new(type_name, is_nested).with_filter(self.filter);
        let children = self.casters.cast(var, &mut ctx);
        let (attributes, type_name, pre_cut) = ctx.into_parts();

        let mut stub = Stub::new(kind, type_name);
        stub.handle = Some(handle);
        self.definitions.push(Definition {
            location,
            template: stub.clone(),
            refs: 0,
            _value: var.clone(),
        });

        stub.cut_count = pre_cut;
        stub.attributes = attributes;

        if children.is_empty() {
            return (stub.into(), None);
        }
        if self.config.max_depth.exceeded_by(child_bucket) {
            tracing::trace!(%handle, cut = children.len(), bucket = child_bucket, "depth limit reached");
            stub.cut_count += children.len();
            self.stats.cut_entries += children.len();
            return (stub.into(), None);
        }

        let task = Task {
            bucket: child_bucket,
            owner: location,
            children,
        };
        (stub.into(), Some(task))
    }

    fn string(&self, s: &str) -> Value {
        let Limit::At(max) = self.config.max_string else {
            return Value::Str(s.to_string());
        };
        match s.char_indices().nth(max) {
            Some((split, _)) => {
                let cut = s[split..].chars().count();
                Stub::cut_string(s[..split].to_string(), cut).into()
            }
            None => Value::Str(s.to_string()),
        }
    }

    /// Write the children of one composite as a row of `task.bucket`.
    fn write_row(&mut self, task: Task) {
        let Task {
            bucket,
            owner,
            children,
        } = task;

        // Entries of bucket `d` are at depth `d + 1`.
        let exempt = bucket + 1 <= self.config.min_depth;
        let row_index = self.buckets.get(bucket).map_or(0, Vec::len);
        let total = children.len();
        let mut row = Row::with_capacity(total);
        let mut cut = 0;

        for (index, (key, child)) in children.into_iter().enumerate() {
            if !exempt {
                if !self.budget.take() {
                    cut = total - index;
                    break;
                }
                self.stats.items += 1;
            }
            let location = StubLocation::Entry {
                bucket,
                row: row_index,
                index: row.len(),
            };
            let (value, task) = self.flatten(&child, bucket + 1, location, true);
            row.push(key, value);
            if let Some(task) = task {
                self.queue.push_back(task);
            }
        }

        let position = if row.is_empty() {
            None
        } else {
            if self.buckets.len() == bucket {
                self.buckets.push(Vec::new());
            }
            self.buckets[bucket].push(row);
            Some(Position::new(bucket, row_index))
        };

        if cut > 0 {
            tracing::trace!(bucket, row = row_index, cut, "item budget exhausted");
            self.stats.cut_entries += cut;
        }
        if let Some(stub) = self.stub_mut(owner) {
            stub.position = position;
            stub.cut_count += cut;
        }
    }

    fn stub_mut(&mut self, location: StubLocation) -> Option<&mut Stub> {
        match location {
            StubLocation::Root => self.root.as_stub_mut(),
            StubLocation::Entry { bucket, row, index } => self
                .buckets
                .get_mut(bucket)?
                .get_mut(row)?
                .value_mut(index)?
                .as_stub_mut(),
        }
    }

    fn finish(mut self) -> Snapshot {
        let refs: Vec<u32> = self.definitions.iter().map(|d| d.refs).collect();
        let share = |stub: &mut Stub| {
            if let Some(slot) = stub.handle.and_then(Handle::slot) {
                stub.ref_count = refs.get(slot).copied().unwrap_or(0);
            }
        };
        if let Some(stub) = self.root.as_stub_mut() {
            share(stub);
        }
        for row in self.buckets.iter_mut().flat_map(|b| b.iter_mut()) {
            for index in 0..row.len() {
                if let Some(stub) = row.value_mut(index).and_then(Value::as_stub_mut) {
                    share(stub);
                }
            }
        }

        let locations: Vec<StubLocation> = self.definitions.iter().map(|d| d.location).collect();
        let definitions = locations
            .into_iter()
            .map(|location| self.stub_mut(location).and_then(|stub| stub.position))
            .collect();

        self.stats.handles = self.definitions.len();
        tracing::debug!(
            handles = self.stats.handles,
            items = self.stats.items,
            cut_entries = self.stats.cut_entries,
            buckets = self.buckets.len(),
            "clone finished"
        );

        Snapshot {
            root: self.root,
            buckets: self.buckets,
            definitions,
            stats: self.stats,
        }
    }
}

fn describe(var: &Var) -> (StubKind, String) {
    match var {
        Var::Array(array) => {
            let subtype = array
                .try_borrow()
                .map(|a| a.kind().as_str())
                .unwrap_or("assoc");
            (StubKind::Array, subtype.to_string())
        }
        Var::Object(_) => (StubKind::Object, var.class_name().unwrap_or_default()),
        _ => (StubKind::Resource, var.class_name().unwrap_or_default()),
    }
}
