// Mon Oct 12 2026 - Alex

use crate::layout::node::Node;
use crate::source::{SymbolSource, TypeHandle, TypeKind};

/// Ceiling used for nodes at offset 0, where the offset says nothing.
pub const MAX_OFFSET_ALIGNMENT: i64 = 1024;

const MAX_NESTING: usize = 64;

/// Rounds `value` up to the next multiple of `align`.
pub fn align_to(value: i64, align: i64) -> i64 {
    if align <= 1 {
        return value;
    }
    (value + align - 1) / align * align
}

/// Largest power of two dividing `offset`.
pub fn max_offset_alignment(offset: i64) -> i64 {
    if offset == 0 {
        return MAX_OFFSET_ALIGNMENT;
    }
    let shift = offset.trailing_zeros().min(MAX_OFFSET_ALIGNMENT.trailing_zeros());
    1i64 << shift
}

/// Largest power of two not above `value`, at least 1.
pub fn floor_power_of_two(value: i64) -> i64 {
    if value <= 1 {
        return 1;
    }
    1i64 << (63 - value.leading_zeros())
}

/// Best-effort alignment for sources that do not report it. A node is no more
/// aligned than its offset allows, nor than its contents suggest.
pub struct AlignmentInferencer<'a> {
    source: &'a dyn SymbolSource,
}

impl<'a> AlignmentInferencer<'a> {
    pub fn new(source: &'a dyn SymbolSource) -> Self {
        Self { source }
    }

    /// Alignment of a finished node. Children must already carry their own
    /// inferred alignment.
    pub fn infer(&self, node: &Node, kind: TypeKind) -> i64 {
        let candidate = match kind {
            TypeKind::UserDefined => node.max_child_align().unwrap_or(1).min(node.size).max(1),
            TypeKind::Array { element: Some(element) } => self.natural_alignment(element, 0),
            _ => node.size.max(1),
        };
        floor_power_of_two(candidate).min(max_offset_alignment(node.offset))
    }

    pub fn apply(&self, node: &mut Node, kind: TypeKind) {
        node.align = self.infer(node, kind);
    }

    /// Alignment a type would have at an unconstrained offset.
    pub fn natural_alignment(&self, ty: TypeHandle, depth: usize) -> i64 {
        let size = self.source.type_size(ty).max(1);
        if depth > MAX_NESTING {
            log::warn!("Type nesting too deep while inferring alignment of {}", self.source.type_name(ty));
            return 1;
        }
        let candidate = match self.source.type_kind(ty) {
            TypeKind::Array { element: Some(element) } => self.natural_alignment(element, depth + 1),
            TypeKind::UserDefined => {
                let mut align = 1;
                if !self.source.virtual_bases(ty).is_empty() {
                    align = self.source.pointer_size();
                }
                for base in self.source.bases(ty) {
                    align = align.max(self.natural_alignment(base.ty, depth + 1));
                }
                for member in self.source.members(ty) {
                    let member_align = match self.source.type_kind(member.ty) {
                        TypeKind::Pointer { .. } => self.source.pointer_size(),
                        _ => self.natural_alignment(member.ty, depth + 1),
                    };
                    align = align.max(member_align);
                }
                align.min(size)
            }
            _ => size,
        };
        floor_power_of_two(candidate)
    }
}
