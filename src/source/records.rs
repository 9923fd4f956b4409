// Tue Oct 13 2026 - Alex

use crate::layout::location::{Declaration, Position};
use crate::layout::LayoutError;
use crate::source::{
    read_document, BaseInfo, BitfieldInfo, Capabilities, MemberInfo, SourceLocation, SymbolSource, TypeHandle,
    TypeKind, VirtualBaseInfo,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_pointer_size() -> i64 {
    8
}

fn default_true() -> bool {
    true
}

/// Export of what a compiler front end knows after laying out each record:
/// exact sizes, alignments, base and field offsets, primary bases, table
/// pointer placement and virtual base offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDatabase {
    #[serde(default = "default_pointer_size")]
    pub pointer_size: i64,
    #[serde(default)]
    pub pointer_align: Option<i64>,
    pub types: Vec<RecordType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordType {
    Builtin { name: String, size: i64, align: i64 },
    Enum { name: String, size: i64, align: i64 },
    Pointer { name: String, pointee: Option<String> },
    Array { name: String, element: String, count: i64 },
    Record(RecordDecl),
}

impl RecordType {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin { name, .. }
            | Self::Enum { name, .. }
            | Self::Pointer { name, .. }
            | Self::Array { name, .. } => name,
            Self::Record(decl) => &decl.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    pub size: i64,
    pub align: i64,
    /// Size without virtual bases, when it differs from `size`.
    #[serde(default)]
    pub non_virtual_size: Option<i64>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_column: u32,
    #[serde(default = "default_true")]
    pub complete: bool,
    #[serde(default)]
    pub dependent: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub primary_base: Option<String>,
    #[serde(default)]
    pub has_own_vfptr: bool,
    #[serde(default)]
    pub vbptr_offset: Option<i64>,
    #[serde(default)]
    pub bases: Vec<RecordBase>,
    #[serde(default)]
    pub virtual_bases: Vec<RecordVirtualBase>,
    #[serde(default)]
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordBase {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVirtualBase {
    #[serde(rename = "type")]
    pub ty: String,
    pub offset: i64,
    #[serde(default)]
    pub vtordisp: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub offset_bits: i64,
    #[serde(default)]
    pub bit_width: Option<i64>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// Open record layout document.
pub struct RecordSession {
    pointer_size: i64,
    pointer_align: i64,
    types: IndexMap<String, RecordType>,
}

impl RecordSession {
    pub fn open(path: &Path) -> Result<Self, LayoutError> {
        let database: RecordDatabase = read_document(path)?;
        Ok(Self::from_database(database))
    }

    pub fn from_database(database: RecordDatabase) -> Self {
        let mut types = IndexMap::with_capacity(database.types.len());
        for ty in database.types {
            let name = ty.name().to_string();
            if types.contains_key(&name) {
                log::warn!("Duplicate record type {}, keeping the first definition", name);
                continue;
            }
            types.insert(name, ty);
        }
        log::debug!("Loaded {} record types", types.len());
        Self {
            pointer_size: database.pointer_size,
            pointer_align: database.pointer_align.unwrap_or(database.pointer_size),
            types,
        }
    }

    pub fn handle(&self, name: &str) -> Option<TypeHandle> {
        self.types.get_index_of(name).map(TypeHandle)
    }

    fn get(&self, ty: TypeHandle) -> Option<&RecordType> {
        self.types.get_index(ty.index()).map(|(_, t)| t)
    }

    fn record(&self, ty: TypeHandle) -> Option<&RecordDecl> {
        match self.get(ty) {
            Some(RecordType::Record(decl)) => Some(decl),
            _ => None,
        }
    }

    fn resolve(&self, name: &str) -> Option<TypeHandle> {
        let handle = self.handle(name);
        if handle.is_none() {
            log::warn!("Record layout references unknown type {}", name);
        }
        handle
    }
}

impl Drop for RecordSession {
    fn drop(&mut self) {
        log::debug!("Closed record session ({} types)", self.types.len());
    }
}

impl SymbolSource for RecordSession {
    fn capabilities(&self) -> Capabilities {
        Capabilities::precise()
    }

    fn pointer_size(&self) -> i64 {
        self.pointer_size
    }

    fn pointer_align(&self) -> i64 {
        self.pointer_align
    }

    fn contains(&self, ty: TypeHandle) -> bool {
        self.get(ty).is_some()
    }

    fn type_name(&self, ty: TypeHandle) -> String {
        self.get(ty).map(|t| t.name().to_string()).unwrap_or_default()
    }

    fn type_size(&self, ty: TypeHandle) -> i64 {
        match self.get(ty) {
            Some(RecordType::Builtin { size, .. }) | Some(RecordType::Enum { size, .. }) => *size,
            Some(RecordType::Pointer { .. }) => self.pointer_size,
            Some(RecordType::Array { element, count, .. }) => {
                self.handle(element).map(|e| self.type_size(e)).unwrap_or(0) * count
            }
            Some(RecordType::Record(decl)) => decl.size,
            None => 0,
        }
    }

    fn type_align(&self, ty: TypeHandle) -> Option<i64> {
        match self.get(ty)? {
            RecordType::Builtin { align, .. } | RecordType::Enum { align, .. } => Some(*align),
            RecordType::Pointer { .. } => Some(self.pointer_align),
            RecordType::Array { element, .. } => self.handle(element).and_then(|e| self.type_align(e)),
            RecordType::Record(decl) => Some(decl.align),
        }
    }

    fn type_kind(&self, ty: TypeHandle) -> TypeKind {
        match self.get(ty) {
            Some(RecordType::Enum { .. }) => TypeKind::Enum,
            Some(RecordType::Pointer { pointee, .. }) => TypeKind::Pointer {
                pointee: pointee.as_deref().and_then(|p| self.handle(p)),
            },
            Some(RecordType::Array { element, .. }) => TypeKind::Array {
                element: self.handle(element),
            },
            Some(RecordType::Record(_)) => TypeKind::UserDefined,
            Some(RecordType::Builtin { .. }) | None => TypeKind::Base,
        }
    }

    fn type_location(&self, ty: TypeHandle) -> Option<SourceLocation> {
        let decl = self.record(ty)?;
        let file = decl.file.as_deref()?;
        Some(SourceLocation::new(file, decl.line, decl.column))
    }

    fn is_dynamic(&self, ty: TypeHandle) -> bool {
        self.record(ty).map_or(false, |d| d.dynamic)
    }

    fn primary_base(&self, ty: TypeHandle) -> Option<TypeHandle> {
        let name = self.record(ty)?.primary_base.as_deref()?;
        self.resolve(name)
    }

    fn has_own_vfptr(&self, ty: TypeHandle) -> bool {
        self.record(ty).map_or(false, |d| d.has_own_vfptr)
    }

    fn vbptr_offset(&self, ty: TypeHandle) -> Option<i64> {
        self.record(ty)?.vbptr_offset
    }

    fn non_virtual_size(&self, ty: TypeHandle) -> Option<i64> {
        self.record(ty)?.non_virtual_size
    }

    fn bases(&self, ty: TypeHandle) -> Vec<BaseInfo> {
        let Some(decl) = self.record(ty) else {
            return Vec::new();
        };
        decl.bases
            .iter()
            .filter_map(|b| {
                Some(BaseInfo {
                    ty: self.resolve(&b.ty)?,
                    offset: b.offset,
                    is_virtual: b.is_virtual,
                })
            })
            .collect()
    }

    fn members(&self, ty: TypeHandle) -> Vec<MemberInfo> {
        let Some(decl) = self.record(ty) else {
            return Vec::new();
        };
        decl.fields
            .iter()
            .filter_map(|field| {
                let field_ty = self.resolve(&field.ty)?;
                let location = decl
                    .file
                    .as_deref()
                    .map(|file| SourceLocation::new(file, field.line, field.column));
                let (offset, bitfield) = match field.bit_width {
                    Some(width) => {
                        let unit = self.type_size(field_ty).max(1);
                        let storage = (field.offset_bits / (unit * 8)) * unit;
                        let position = field.offset_bits - storage * 8;
                        (storage, Some(BitfieldInfo { position, width }))
                    }
                    None => (field.offset_bits / 8, None),
                };
                Some(MemberInfo {
                    name: field.name.clone(),
                    ty: field_ty,
                    offset,
                    bitfield,
                    location,
                })
            })
            .collect()
    }

    fn virtual_bases(&self, ty: TypeHandle) -> Vec<VirtualBaseInfo> {
        let Some(decl) = self.record(ty) else {
            return Vec::new();
        };
        decl.virtual_bases
            .iter()
            .filter_map(|vb| {
                Some(VirtualBaseInfo {
                    ty: self.resolve(&vb.ty)?,
                    offset: Some(vb.offset),
                    has_vtor_disp: vb.vtordisp,
                })
            })
            .collect()
    }

    fn declarations(&self) -> Vec<Declaration> {
        self.types
            .values()
            .enumerate()
            .filter_map(|(index, ty)| {
                let RecordType::Record(decl) = ty else {
                    return None;
                };
                let file = decl.file.as_deref()?;
                // No end position reported: the definition spans its start line.
                let end = if decl.end_line == 0 {
                    Position::new(decl.line, u32::MAX)
                } else {
                    Position::new(decl.end_line, decl.end_column)
                };
                let mut declaration =
                    Declaration::new(TypeHandle(index), file, Position::new(decl.line, decl.column), end);
                declaration.complete = decl.complete;
                declaration.dependent = decl.dependent;
                declaration.invalid = decl.invalid;
                Some(declaration)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::location::LocationFilter;
    use serde_json::json;

    fn session() -> RecordSession {
        let database: RecordDatabase = serde_json::from_value(json!({
            "pointer_size": 8,
            "types": [
                { "kind": "builtin", "name": "int", "size": 4, "align": 4 },
                { "kind": "builtin", "name": "unsigned int", "size": 4, "align": 4 },
                { "kind": "array", "name": "int[3]", "element": "int", "count": 3 },
                { "kind": "record", "name": "Outer", "size": 16, "align": 4,
                  "file": "src/outer.h", "line": 10, "column": 1, "end_line": 20, "end_column": 2,
                  "fields": [
                      { "name": "values", "type": "int[3]", "offset_bits": 0, "line": 11, "column": 5 },
                      { "name": "flags", "type": "unsigned int", "offset_bits": 101, "bit_width": 3, "line": 12, "column": 5 }
                  ] },
                { "kind": "record", "name": "Outer::Inner", "size": 4, "align": 4,
                  "file": "src/outer.h", "line": 13, "column": 5, "end_line": 16, "end_column": 6 },
                { "kind": "record", "name": "Template<T>", "size": 1, "align": 1, "dependent": true,
                  "file": "src/outer.h", "line": 14, "column": 1, "end_line": 14, "end_column": 40 },
                { "kind": "record", "name": "Tag", "size": 1, "align": 1,
                  "file": "src/tag.h", "line": 3, "column": 8 }
            ]
        }))
        .unwrap();
        RecordSession::from_database(database)
    }

    #[test]
    fn test_sizes_and_alignment() {
        let session = session();
        let array = session.handle("int[3]").unwrap();
        assert_eq!(session.type_size(array), 12);
        assert_eq!(session.type_align(array), Some(4));
        assert_eq!(session.type_kind(array), TypeKind::Array { element: session.handle("int") });
    }

    #[test]
    fn test_bitfield_storage_unit() {
        let session = session();
        let outer = session.handle("Outer").unwrap();
        let members = session.members(outer);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].offset, 0);
        assert_eq!(members[0].bitfield, None);
        assert_eq!(members[1].offset, 12);
        assert_eq!(members[1].bitfield, Some(BitfieldInfo { position: 5, width: 3 }));
        assert_eq!(members[1].location, Some(SourceLocation::new("src/outer.h", 12, 5)));
    }

    #[test]
    fn test_find_nested_type() {
        let session = session();
        let inner = session.find_type_at(&LocationFilter::new("src\\outer.h", 14, 10));
        assert_eq!(inner, session.handle("Outer::Inner"));
        let outer = session.find_type_at(&LocationFilter::new("src/outer.h", 18, 1));
        assert_eq!(outer, session.handle("Outer"));
        assert_eq!(session.find_type_at(&LocationFilter::new("src/other.h", 14, 10)), None);
    }

    #[test]
    fn test_declaration_without_end_spans_its_line() {
        let session = session();
        let tag = session.handle("Tag");
        assert_eq!(session.find_type_at(&LocationFilter::new("src/tag.h", 3, 8)), tag);
        assert_eq!(session.find_type_at(&LocationFilter::new("src/tag.h", 3, 30)), tag);
        assert_eq!(session.find_type_at(&LocationFilter::new("src/tag.h", 3, 2)), None);
        assert_eq!(session.find_type_at(&LocationFilter::new("src/tag.h", 4, 1)), None);
    }

    #[test]
    fn test_unknown_handle_is_empty() {
        let session = session();
        let missing = TypeHandle(99);
        assert!(!session.contains(missing));
        assert_eq!(session.type_size(missing), 0);
        assert!(session.members(missing).is_empty());
        assert!(session.bases(missing).is_empty());
    }
}
