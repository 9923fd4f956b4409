// Tue Oct 13 2026 - Alex

use crate::layout::alignment::{align_to, AlignmentInferencer};
use crate::layout::node::{Category, Node};
use crate::layout::LayoutError;
use crate::source::{SymbolSource, TypeKind};

/// Rebuilds the vbtable pointer and virtual base placement for sources that
/// only list which virtual bases a type has.
pub struct VirtualBaseResolver<'a> {
    inferencer: AlignmentInferencer<'a>,
    pointer_size: i64,
    pointer_align: i64,
}

impl<'a> VirtualBaseResolver<'a> {
    pub fn new(source: &'a dyn SymbolSource) -> Self {
        Self {
            inferencer: AlignmentInferencer::new(source),
            pointer_size: source.pointer_size(),
            pointer_align: source.pointer_align(),
        }
    }

    /// Bytes the virtual bases occupy at the tail of a complete object,
    /// including alignment padding.
    pub fn cumulative_size(&self, virtual_bases: &[Node]) -> i64 {
        let total = virtual_bases
            .iter()
            .fold(0, |running, vbase| align_to(running, vbase.align) + vbase.size);
        align_to(total, self.pointer_size)
    }

    /// Size of the record without its virtual bases, never below what its
    /// already placed children cover.
    pub fn tentative_size(&self, node: &Node, virtual_bases: &[Node]) -> i64 {
        (node.size - self.cumulative_size(virtual_bases)).max(node.children_end())
    }

    /// Places a vbtable pointer right after the non-virtual region of `node`.
    ///
    /// `node` must only hold its table pointer and non-virtual bases so far.
    /// `prefix_end` extends that region over leading vtable pointer members,
    /// and `pending` are the `(offset, size)` ranges of members still to come.
    /// Nothing is injected when a non-virtual base already carries a vbtable
    /// pointer, since the derived record reuses it, or when the slot is taken.
    pub fn inject_table_pointer(&self, node: &mut Node, prefix_end: i64, pending: &[(i64, i64)]) -> bool {
        let shared = node
            .children
            .iter()
            .filter(|c| c.category.is_base())
            .any(|base| base.children.iter().any(|c| c.category == Category::VBTablePointer));
        if shared {
            log::debug!("{} shares the vbtable pointer of a base", node.type_name);
            return false;
        }

        let offset = align_to(node.children_end().max(prefix_end), self.pointer_size);
        let taken = node.children.iter().any(|c| c.overlaps(offset, self.pointer_size))
            || pending
                .iter()
                .any(|&(start, size)| start < offset + self.pointer_size && offset < start + size);
        if taken {
            log::debug!("No room for a vbtable pointer in {} at offset {}", node.type_name, offset);
            return false;
        }

        let mut pointer = Node::table_pointer(Category::VBTablePointer, offset, self.pointer_size, self.pointer_align);
        self.inferencer.apply(&mut pointer, TypeKind::Pointer { pointee: None });
        log::debug!("Injected vbtable pointer into {} at offset {}", node.type_name, offset);
        node.push(pointer);
        true
    }

    /// Appends the collected virtual bases to a complete object, in discovery
    /// order, after all of its non-virtual content.
    ///
    /// The size the source reports for the object wins over the computed one;
    /// a disagreement is only logged.
    pub fn place(&self, node: &mut Node, virtual_bases: Vec<Node>, primary: Option<&str>) {
        if virtual_bases.is_empty() {
            return;
        }

        let mut running = node.children_end();
        for mut vbase in virtual_bases {
            running = align_to(running, vbase.align);
            vbase.offset = running;
            vbase.category = if primary == Some(vbase.type_name.as_str()) {
                Category::VirtualPrimaryBase
            } else {
                Category::VirtualBase
            };
            self.inferencer.apply(&mut vbase, TypeKind::UserDefined);
            running += vbase.size;
            log::debug!("Placed virtual base {} at offset {}", vbase.type_name, vbase.offset);
            node.push(vbase);
        }

        let computed = align_to(running, self.pointer_size);
        if computed != node.size {
            let mismatch = LayoutError::SizeMismatch {
                type_name: node.type_name.clone(),
                computed,
                reported: node.size,
            };
            log::warn!("{}", mismatch);
        }

        node.sort_children();
        self.inferencer.apply(node, TypeKind::UserDefined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SymbolDatabase, SymbolSession};
    use serde_json::json;

    fn session() -> SymbolSession {
        let database: SymbolDatabase = serde_json::from_value(json!({
            "pointer_size": 8,
            "symbols": []
        }))
        .unwrap();
        SymbolSession::from_database(database)
    }

    fn record(name: &str, offset: i64, size: i64, align: i64, category: Category) -> Node {
        let mut node = Node::new(category);
        node.type_name = name.to_string();
        node.offset = offset;
        node.size = size;
        node.align = align;
        node
    }

    #[test]
    fn test_cumulative_size_is_padded() {
        let session = session();
        let resolver = VirtualBaseResolver::new(&session);
        let vbases = vec![record("A", 0, 4, 4, Category::VirtualBase)];
        assert_eq!(resolver.cumulative_size(&vbases), 8);

        let vbases = vec![
            record("A", 0, 1, 1, Category::VirtualBase),
            record("B", 0, 8, 8, Category::VirtualBase),
        ];
        assert_eq!(resolver.cumulative_size(&vbases), 16);
        assert_eq!(resolver.cumulative_size(&[]), 0);
    }

    #[test]
    fn test_vbtable_pointer_after_base_and_appended_vbase() {
        let session = session();
        let resolver = VirtualBaseResolver::new(&session);
        let mut derived = record("Derived", 0, 24, 1, Category::Root);
        derived.push(record("Base", 0, 8, 8, Category::NonVirtualBase));
        let vbases = vec![record("Shared", 0, 4, 4, Category::VirtualBase)];

        assert_eq!(resolver.tentative_size(&derived, &vbases), 16);
        assert!(resolver.inject_table_pointer(&mut derived, 0, &[]));
        resolver.place(&mut derived, vbases, None);

        let layout: Vec<(Category, i64, i64)> =
            derived.children.iter().map(|c| (c.category, c.offset, c.size)).collect();
        assert_eq!(
            layout,
            vec![
                (Category::NonVirtualBase, 0, 8),
                (Category::VBTablePointer, 8, 8),
                (Category::VirtualBase, 16, 4),
            ]
        );
        assert_eq!(derived.size, 24);
        assert_eq!(derived.align, 8);
    }

    #[test]
    fn test_reported_size_wins_on_mismatch() {
        let session = session();
        let resolver = VirtualBaseResolver::new(&session);
        let mut derived = record("Derived", 0, 40, 1, Category::Root);
        derived.push(record("Base", 0, 8, 8, Category::NonVirtualBase));

        resolver.place(&mut derived, vec![record("Shared", 0, 4, 4, Category::VirtualBase)], Some("Shared"));

        assert_eq!(derived.size, 40);
        assert_eq!(derived.children[1].offset, 8);
        assert_eq!(derived.children[1].category, Category::VirtualPrimaryBase);
    }

    #[test]
    fn test_no_injection_when_slot_taken() {
        let session = session();
        let resolver = VirtualBaseResolver::new(&session);
        let mut derived = record("Derived", 0, 32, 1, Category::Root);
        derived.push(record("Base", 0, 8, 8, Category::NonVirtualBase));
        assert!(!resolver.inject_table_pointer(&mut derived, 0, &[(8, 4)]));
        assert_eq!(derived.children.len(), 1);
    }

    #[test]
    fn test_injection_after_leading_vtable_pointer() {
        let session = session();
        let resolver = VirtualBaseResolver::new(&session);
        let mut derived = record("Dispatcher", 0, 32, 1, Category::Root);
        assert!(resolver.inject_table_pointer(&mut derived, 8, &[(0, 8), (16, 4)]));
        assert_eq!(derived.children[0].category, Category::VBTablePointer);
        assert_eq!(derived.children[0].offset, 8);
    }

    #[test]
    fn test_shared_vbtable_pointer_not_duplicated() {
        let session = session();
        let resolver = VirtualBaseResolver::new(&session);
        let mut base = record("Middle", 0, 16, 8, Category::NonVirtualBase);
        base.push(Node::table_pointer(Category::VBTablePointer, 0, 8, 8));
        let mut derived = record("Derived", 0, 32, 1, Category::Root);
        derived.push(base);
        assert!(!resolver.inject_table_pointer(&mut derived, 0, &[]));
    }
}
