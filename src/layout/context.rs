// Mon Oct 12 2026 - Alex

use crate::layout::node::{Location, Node};
use crate::source::SourceLocation;
use indexmap::{IndexMap, IndexSet};

/// Deduplicated list of source files referenced by node locations.
#[derive(Debug, Default)]
pub struct FileTable {
    files: IndexSet<String>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, file: &str) -> i32 {
        let (index, _) = self.files.insert_full(file.to_string());
        index as i32
    }

    pub fn location(&mut self, location: Option<&SourceLocation>) -> Location {
        match location {
            Some(loc) => Location::new(self.intern(&loc.file), loc.line, loc.column),
            None => Location::invalid(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.files.into_iter().collect()
    }
}

/// State owned by a single layout request. Dropped when the request ends so
/// nothing carries over into the next one.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub files: FileTable,
    virtual_bases: IndexMap<String, Node>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a virtual base once, keyed by type name, in first-seen order.
    /// Returns false when it was already known.
    pub fn register_virtual_base(&mut self, node: Node) -> bool {
        if self.virtual_bases.contains_key(&node.type_name) {
            return false;
        }
        log::debug!("Registered virtual base {}", node.type_name);
        self.virtual_bases.insert(node.type_name.clone(), node);
        true
    }

    pub fn has_virtual_base(&self, type_name: &str) -> bool {
        self.virtual_bases.contains_key(type_name)
    }

    pub fn virtual_base_count(&self) -> usize {
        self.virtual_bases.len()
    }

    /// Starts a fresh virtual base list for a complete object, handing back the
    /// enclosing object's list so it can be restored afterwards.
    pub fn begin_object(&mut self) -> IndexMap<String, Node> {
        std::mem::take(&mut self.virtual_bases)
    }

    /// Takes the virtual bases collected for the current object and restores the
    /// enclosing object's list.
    pub fn end_object(&mut self, saved: IndexMap<String, Node>) -> Vec<Node> {
        let collected = std::mem::replace(&mut self.virtual_bases, saved);
        collected.into_values().collect()
    }

    pub fn into_files(self) -> Vec<String> {
        self.files.into_vec()
    }
}
