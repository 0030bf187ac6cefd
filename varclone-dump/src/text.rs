//! Plain-text dump of a [`Data`] view.
//!
//! `TextDump` renders one entry per line, nesting composites by indentation:
//!
//! ```text
//! array:2 [
//!   0 => 1
//!   1 => Foo {#2
//!     name: "x…3"
//!   }
//! ]
//! ```
//!
//! Objects carry their handle as `#H`, resources as `@H`, and references to
//! an already dumped array as `&H`. A `…N` marks `N` entries that were not
//! materialized, either by the cloner or by the view's own limits. Counts
//! after `array:` include those entries, for references too.

use std::collections::HashMap;
use std::fmt::{self, Write};

use varclone::{Data, Handle, Key, RefHandleMode, Stub, StubKind, Value};

/// Configuration and state for rendering a text dump.
pub struct TextDump<'a> {
    data: &'a Data,
    indent: usize,
    show_handles: bool,
}

/// A composite whose body is being written.
struct Frame {
    data: Data,
    level: usize,
    next: usize,
    shown: usize,
    rest: usize,
    keyed_as_array: bool,
    closer: char,
}

impl<'a> TextDump<'a> {
    /// Create a new dump of the given view.
    pub fn new(data: &'a Data) -> Self {
        Self {
            data,
            indent: 2,
            show_handles: data.options().ref_handle_mode == RefHandleMode::Shown,
        }
    }

    /// Spaces per nesting level.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Hide handles.
    pub fn without_handles(mut self) -> Self {
        self.show_handles = false;
        self
    }

    fn pad(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = level * self.indent)
    }

    fn handle(&self, stub: &Stub) -> String {
        match stub.handle {
            Some(handle) if self.show_handles => handle.to_string(),
            _ => String::new(),
        }
    }

    fn tag(&self, sigil: char, stub: &Stub) -> String {
        match self.handle(stub) {
            handle if handle.is_empty() => handle,
            handle => format!("{}{}", sigil, handle),
        }
    }

    /// Write one entry after its key. Composites that open a body push a
    /// frame instead of closing the line.
    fn write_entry(
        &self,
        f: &mut fmt::Formatter<'_>,
        stack: &mut Vec<Frame>,
        cuts: &HashMap<Handle, usize>,
        data: Data,
        level: usize,
    ) -> fmt::Result {
        let stub = match data.value() {
            Value::Stub(stub) if stub.kind != StubKind::CutString => stub.as_ref().clone(),
            value => {
                write_scalar(f, value)?;
                return f.write_char('\n');
            }
        };

        let len = data.len();
        let count = len + stub.cut_count;
        let collapsed = data.options().max_depth.exceeded_by(level + 1);

        let (head, keyed_as_array, closer) = match stub.kind {
            StubKind::Array => {
                if stub.is_reference {
                    let cut = stub.handle.and_then(|h| cuts.get(&h)).copied().unwrap_or(0);
                    return writeln!(f, "array:{} [{}]", len + cut, self.tag('&', &stub));
                }
                if count == 0 {
                    return writeln!(f, "[]");
                }
                if len == 0 || collapsed {
                    return writeln!(f, "array:{} […{}]", count, count);
                }
                (format!("array:{} [", count), true, ']')
            }
            kind => {
                let (name, tag) = match kind {
                    StubKind::Resource => {
                        (format!("{} resource", stub.type_name), self.tag('@', &stub))
                    }
                    _ => (stub.type_name.clone(), self.tag('#', &stub)),
                };
                if stub.is_reference || count == 0 {
                    return writeln!(f, "{} {{{}}}", name, tag);
                }
                if len == 0 || collapsed {
                    let sep = if tag.is_empty() { "" } else { " " };
                    return writeln!(f, "{} {{{}{}…{}}}", name, tag, sep, count);
                }
                (format!("{} {{{}", name, tag), false, '}')
            }
        };

        writeln!(f, "{}", head)?;
        let shown = data
            .options()
            .max_items_per_depth
            .get()
            .map_or(len, |max| max.min(len));
        stack.push(Frame {
            data,
            level,
            next: 0,
            shown,
            rest: len - shown + stub.cut_count,
            keyed_as_array,
            closer,
        });
        Ok(())
    }
}

fn write_scalar(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(i) => write!(f, "{}", i),
        Value::Float(x) => write!(f, "{:?}", x),
        Value::Str(s) => write!(f, "{:?}", s),
        Value::Stub(stub) => {
            let quoted = format!("{:?}", stub.inline_value.as_deref().unwrap_or_default());
            let open = &quoted[..quoted.len() - 1];
            write!(f, "{}…{}\"", open, stub.cut_count)
        }
    }
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &Key, keyed_as_array: bool) -> fmt::Result {
    match (key, keyed_as_array) {
        (Key::Index(i), true) => write!(f, "{} => ", i),
        (Key::Name(name), true) => write!(f, "{:?} => ", name),
        (key, false) => write!(f, "{}: ", key),
    }
}

impl<'a> fmt::Display for TextDump<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Cut counts live on definitions only; references borrow them.
        let cuts: HashMap<Handle, usize> = self
            .data
            .snapshot()
            .stubs()
            .filter(|stub| !stub.is_reference && stub.is_cut())
            .filter_map(|stub| Some((stub.handle?, stub.cut_count)))
            .collect();
        let mut stack = Vec::new();
        self.write_entry(f, &mut stack, &cuts, self.data.clone(), 0)?;

        loop {
            let next = match stack.last_mut() {
                None => return Ok(()),
                Some(frame) if frame.next < frame.shown => {
                    let child = frame.data.child_at(frame.next);
                    frame.next += 1;
                    child.map(|child| (child, frame.level + 1, frame.keyed_as_array))
                }
                Some(_) => None,
            };

            match next {
                Some((child, level, keyed_as_array)) => {
                    self.pad(f, level)?;
                    if let Some(key) = child.key() {
                        write_key(f, key, keyed_as_array)?;
                    }
                    self.write_entry(f, &mut stack, &cuts, child, level)?;
                }
                None => {
                    let Some(frame) = stack.pop() else {
                        return Ok(());
                    };
                    if frame.rest > 0 {
                        self.pad(f, frame.level + 1)?;
                        writeln!(f, "…{}", frame.rest)?;
                    }
                    self.pad(f, frame.level)?;
                    f.write_char(frame.closer)?;
                    f.write_char('\n')?;
                }
            }
        }
    }
}
