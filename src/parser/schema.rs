//! Data model shared by both dump parsers and the aggregator.
//!
//! Call sites are interned: two sites with the same (name, file, line)
//! are always the same `CallSiteId`. Traces refer to sites by id, so a
//! `TraceSet` owns both the site table and the traces built on it.
//!
//! The binary decoder's entities (classes, frames, stack traces) and the
//! JSON heap report schema live here as well.

use crate::utils::config::UNKNOWN_LINE;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// A unique (method name, source file, line number) location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSite {
    /// Fully qualified method name, e.g. `java.lang.Thread.run`
    pub name: String,

    /// Source filename as recorded by the JVM
    pub filename: String,

    /// Line number, or a negative sentinel (`-1` is "unknown")
    pub line_number: i32,
}

impl CallSite {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, line_number: i32) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            line_number,
        }
    }

    /// Call site whose line is not known
    pub fn unknown_line(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::new(name, filename, UNKNOWN_LINE)
    }

    /// True when the line number is a real source line
    pub fn has_line(&self) -> bool {
        self.line_number > 0
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_line() {
            write!(f, "{}[{}:{}]", self.name, self.filename, self.line_number)
        } else {
            write!(f, "{}[{}:???]", self.name, self.filename)
        }
    }
}

/// Index of an interned call site inside its `CallSiteTable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(usize);

/// Arena of deduplicated call sites
#[derive(Debug, Clone, Default)]
pub struct CallSiteTable {
    sites: Vec<CallSite>,
    index: HashMap<CallSite, CallSiteId>,
}

impl CallSiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `site`, adding it to the table on first sight
    pub fn intern(&mut self, site: CallSite) -> CallSiteId {
        if let Some(&id) = self.index.get(&site) {
            return id;
        }
        let id = CallSiteId(self.sites.len());
        self.index.insert(site.clone(), id);
        self.sites.push(site);
        id
    }

    /// Look up an interned site
    ///
    /// Ids are only handed out by `intern`, so an id from this table is always valid.
    pub fn get(&self, id: CallSiteId) -> &CallSite {
        &self.sites[id.0]
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// One sampled call stack, leaf first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// Trace id (text dump) or stack trace serial (binary dump)
    pub id: u32,

    /// Call sites from the sampled leaf (index 0) toward the root
    pub stack: Vec<CallSiteId>,

    /// Number of samples (or retained bytes) attributed to this stack
    pub count: u64,
}

impl Trace {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            stack: Vec::new(),
            count: 0,
        }
    }

    /// The topmost (currently executing) call site
    pub fn leaf(&self) -> Option<CallSiteId> {
        self.stack.first().copied()
    }
}

/// Traces keyed by id, together with the call sites they reference
#[derive(Debug, Clone, Default)]
pub struct TraceSet {
    pub call_sites: CallSiteTable,
    pub traces: BTreeMap<u32, Trace>,

    /// Sample total announced by the dump itself, when it has one
    pub declared_total: Option<u64>,
}

impl TraceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a trace, interning its call sites
    pub fn insert_trace(&mut self, id: u32, stack: Vec<CallSite>, count: u64) {
        let stack = stack
            .into_iter()
            .map(|site| self.call_sites.intern(site))
            .collect();
        self.traces.insert(id, Trace { id, stack, count });
    }

    /// Sum of all trace counts
    pub fn total_count(&self) -> u64 {
        self.traces.values().map(|t| t.count).sum()
    }

    /// The leaf call site of a trace, if its stack is not empty
    pub fn leaf_site(&self, trace: &Trace) -> Option<&CallSite> {
        trace.leaf().map(|id| self.call_sites.get(id))
    }

    /// Resolve a trace's stack to call sites
    pub fn resolve<'a>(&'a self, trace: &'a Trace) -> impl Iterator<Item = &'a CallSite> + 'a {
        trace.stack.iter().map(move |id| self.call_sites.get(*id))
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

/// A class defined by a LOAD CLASS record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub serial: u32,
    pub id: u64,
    pub stack_trace_serial: u32,

    /// Internal JVM name, e.g. `java/lang/String`
    pub name: String,
}

impl Class {
    /// Dotted source-level name, e.g. `java.lang.String`
    pub fn dotted_name(&self) -> String {
        self.name.replace('/', ".")
    }
}

/// A stack frame defined by a STACK FRAME record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u64,
    pub method_name: String,
    pub method_signature: String,
    pub filename: String,
    pub class: Rc<Class>,
    pub line_number: i32,
}

impl Frame {
    /// `<class>.<method>` with a dotted class name
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class.dotted_name(), self.method_name)
    }

    pub fn to_call_site(&self) -> CallSite {
        CallSite::new(self.qualified_name(), self.filename.clone(), self.line_number)
    }
}

/// A stack trace defined by a STACK TRACE record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTrace {
    pub serial: u32,
    pub thread_serial: u32,

    /// Resolved frames in encoded order (leaf first)
    pub frames: Vec<Rc<Frame>>,
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trace {}", self.serial)?;
        for frame in &self.frames {
            writeln!(
                f,
                "  {} [{}] | {}:{}",
                frame.method_name, frame.method_signature, frame.filename, frame.line_number
            )?;
        }
        Ok(())
    }
}

/// Top-level heap report structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Dump file the report was produced from
    pub source: String,

    pub strings: usize,
    pub classes: usize,
    pub stack_traces: usize,

    /// Total decoded heap size in bytes
    pub total_size: u64,

    pub overhead: OverheadSummary,

    /// Largest stack traces by retained bytes, descending
    pub top_stacks: Vec<StackSize>,

    /// Record tag histogram, keyed by tag in hex
    pub tags: BTreeMap<String, u64>,

    /// Heap dump sub-tag histogram, keyed by sub-tag in hex
    pub sub_tags: BTreeMap<String, u64>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

/// Estimated object header overhead, in bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverheadSummary {
    pub instance: u64,
    pub object_array: u64,
    pub primitive_array: u64,
    pub total: u64,
}

/// One stack trace and the bytes allocated under it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSize {
    pub serial: u32,
    pub size: u64,

    /// Frames rendered as `method [signature] | file:line`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,
}
