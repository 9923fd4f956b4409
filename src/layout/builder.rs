// Tue Oct 13 2026 - Alex

use crate::layout::alignment::AlignmentInferencer;
use crate::layout::context::RequestContext;
use crate::layout::node::{Category, LayoutResult, Node};
use crate::layout::vbase::VirtualBaseResolver;
use crate::source::{Capabilities, MemberInfo, SymbolSource, TypeHandle, TypeKind};
use itertools::Itertools;

const MAX_DEPTH: usize = 64;
const VTORDISP_SIZE: i64 = 4;

/// Turns a type of a symbol source into a layout tree.
///
/// Written once against `SymbolSource`. When the source does not report
/// alignment or virtual base layout, the builder fills those in with an
/// `AlignmentInferencer` and a `VirtualBaseResolver`.
pub struct LayoutBuilder<'a> {
    source: &'a dyn SymbolSource,
    ctx: RequestContext,
    inferencer: Option<AlignmentInferencer<'a>>,
    resolver: Option<VirtualBaseResolver<'a>>,
    capabilities: Capabilities,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(source: &'a dyn SymbolSource) -> Self {
        let capabilities = source.capabilities();
        let inferencer = (!capabilities.contains(Capabilities::ALIGNMENT)).then(|| AlignmentInferencer::new(source));
        let resolver = (!capabilities.contains(Capabilities::VBASE_LAYOUT)).then(|| VirtualBaseResolver::new(source));
        Self {
            source,
            ctx: RequestContext::new(),
            inferencer,
            resolver,
            capabilities,
        }
    }

    /// Builds the layout of `ty`. Returns `None` for a handle the source does
    /// not know.
    pub fn build(&mut self, ty: TypeHandle, include_virtual_bases: bool) -> Option<Node> {
        if !self.source.contains(ty) {
            log::debug!("Type handle {} is not part of the source", ty);
            return None;
        }
        let mut root = self.build_record(ty, include_virtual_bases, 0);
        root.category = Category::Root;
        Some(root)
    }

    /// Builds `ty` as a complete object and hands back the request result.
    pub fn build_result(mut self, ty: TypeHandle) -> LayoutResult {
        match self.build(ty, true) {
            Some(root) => LayoutResult::new(root, self.ctx.into_files()),
            None => LayoutResult::empty(),
        }
    }

    fn build_record(&mut self, ty: TypeHandle, include_virtual_bases: bool, depth: usize) -> Node {
        let mut node = self.leaf(ty, Category::Root);
        if depth > MAX_DEPTH {
            log::warn!("Nesting too deep at {}, children dropped", node.type_name);
            return node;
        }
        log::debug!("Building {} ({} bytes)", node.type_name, node.size);

        let saved = (include_virtual_bases && self.resolver.is_some()).then(|| self.ctx.begin_object());
        let primary = self.source.primary_base(ty);
        let table_pointers = self.capabilities.contains(Capabilities::TABLE_POINTERS);

        if table_pointers {
            if self.source.has_own_vfptr(ty) {
                node.push(self.table_pointer(Category::VFTablePointer, 0));
            } else if self.source.is_dynamic(ty) && primary.is_none() {
                node.push(self.table_pointer(Category::VTablePointer, 0));
            }
        }

        let mut bases: Vec<_> = self.source.bases(ty).into_iter().filter(|b| !b.is_virtual).collect();
        bases.sort_by_key(|b| b.offset);
        for base in bases {
            let mut child = self.build_record(base.ty, false, depth + 1);
            if self.resolver.is_none() {
                if let Some(size) = self.source.non_virtual_size(base.ty) {
                    child.size = size;
                }
            }
            child.offset = base.offset;
            child.category = if primary == Some(base.ty) {
                Category::NonVirtualPrimaryBase
            } else {
                Category::NonVirtualBase
            };
            self.infer_alignment(&mut child, TypeKind::UserDefined);
            node.push(child);
        }

        if let Some(offset) = self.source.vbptr_offset(ty).filter(|_| table_pointers) {
            node.push(self.table_pointer(Category::VBTablePointer, offset));
        }

        let members = self.source.members(ty);
        if self.resolver.is_some() {
            self.resolve_local_virtual_bases(&mut node, ty, &members, include_virtual_bases, depth);
        }

        for member in &members {
            let child = self.build_member(member, depth);
            node.push(child);
        }

        if include_virtual_bases {
            match saved {
                Some(saved) => {
                    let collected = self.ctx.end_object(saved);
                    let primary_name = primary.map(|p| self.source.type_name(p));
                    node.sort_children();
                    if let Some(resolver) = &self.resolver {
                        resolver.place(&mut node, collected, primary_name.as_deref());
                    }
                }
                None => self.push_reported_virtual_bases(&mut node, ty, primary, depth),
            }
        } else if self.resolver.is_some() {
            node.size = node.size.max(node.children_end());
        }

        node.sort_children();
        self.infer_alignment(&mut node, TypeKind::UserDefined);
        node
    }

    /// Builds and registers the virtual bases reachable from `ty`, shrinks a
    /// base sub-object to its non-virtual part and injects its vbtable pointer.
    fn resolve_local_virtual_bases(
        &mut self,
        node: &mut Node,
        ty: TypeHandle,
        members: &[MemberInfo],
        complete: bool,
        depth: usize,
    ) {
        let reachable = self.source.virtual_bases(ty);
        if reachable.is_empty() {
            return;
        }

        let mut vbases = Vec::with_capacity(reachable.len());
        for info in reachable {
            let mut vbase = self.build_record(info.ty, false, depth + 1);
            vbase.category = Category::VirtualBase;
            self.ctx.register_virtual_base(vbase.clone());
            vbases.push(vbase);
        }

        let Some(resolver) = &self.resolver else {
            return;
        };
        let tentative = resolver.tentative_size(node, &vbases);
        if !complete {
            node.size = tentative;
        }
        let mut prefix_end = node.children_end();
        for member in members.iter().sorted_by_key(|m| m.offset) {
            if member.offset > prefix_end || !self.is_vtable_pointer(member) {
                break;
            }
            prefix_end = prefix_end.max(member.offset + self.source.type_size(member.ty));
        }
        let pending: Vec<(i64, i64)> = members
            .iter()
            .map(|m| (m.offset, self.source.type_size(m.ty)))
            .collect();
        resolver.inject_table_pointer(node, prefix_end, &pending);
    }

    /// Member holding the vtable pointer, as symbol databases report it.
    fn is_vtable_pointer(&self, member: &MemberInfo) -> bool {
        match self.source.type_kind(member.ty) {
            TypeKind::Pointer { pointee: Some(pointee) } => {
                member.bitfield.is_none() && self.source.type_kind(pointee) == TypeKind::VTableShape
            }
            _ => false,
        }
    }

    fn push_reported_virtual_bases(&mut self, node: &mut Node, ty: TypeHandle, primary: Option<TypeHandle>, depth: usize) {
        for info in self.source.virtual_bases(ty) {
            let mut vbase = self.build_record(info.ty, false, depth + 1);
            vbase.offset = info.offset.unwrap_or(0);
            vbase.category = if primary == Some(info.ty) {
                Category::VirtualPrimaryBase
            } else {
                Category::VirtualBase
            };
            if info.has_vtor_disp && self.capabilities.contains(Capabilities::VTOR_DISP) {
                let mut vtordisp = Node::new(Category::VtorDisplacement);
                vtordisp.offset = vbase.offset - VTORDISP_SIZE;
                vtordisp.size = VTORDISP_SIZE;
                vtordisp.align = VTORDISP_SIZE;
                node.push(vtordisp);
            }
            node.push(vbase);
        }
    }

    fn build_member(&mut self, member: &MemberInfo, depth: usize) -> Node {
        let kind = self.source.type_kind(member.ty);
        let mut node = match (member.bitfield, kind) {
            (Some(bits), _) => {
                let mut node = self.leaf(member.ty, Category::Bitfield);
                node.push(Node::bitfield_extra(bits.position, bits.width));
                node
            }
            (None, TypeKind::UserDefined) => {
                let mut node = self.build_record(member.ty, true, depth + 1);
                node.category = Category::ComplexField;
                node
            }
            (None, TypeKind::Pointer { .. }) if self.is_vtable_pointer(member) => {
                let mut node = self.leaf(member.ty, Category::VTablePointer);
                node.type_name.clear();
                node
            }
            _ => self.leaf(member.ty, Category::SimpleField),
        };
        node.member_name = member.name.clone();
        node.offset = member.offset;
        node.field_location = self.ctx.files.location(member.location.as_ref());
        self.infer_alignment(&mut node, kind);
        node
    }

    /// Node carrying what the source reports about `ty` itself.
    fn leaf(&mut self, ty: TypeHandle, category: Category) -> Node {
        let mut node = Node::new(category);
        node.type_name = self.source.type_name(ty);
        node.size = self.source.type_size(ty);
        node.align = self.source.type_align(ty).unwrap_or(1);
        node.type_location = self.ctx.files.location(self.source.type_location(ty).as_ref());
        node
    }

    fn table_pointer(&self, category: Category, offset: i64) -> Node {
        let mut node = Node::table_pointer(category, offset, self.source.pointer_size(), self.source.pointer_align());
        self.infer_alignment(&mut node, TypeKind::Pointer { pointee: None });
        node
    }

    fn infer_alignment(&self, node: &mut Node, kind: TypeKind) {
        if let Some(inferencer) = &self.inferencer {
            inferencer.apply(node, kind);
        }
    }
}
