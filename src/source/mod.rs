// Tue Oct 13 2026 - Alex

pub mod records;
pub mod symbols;

pub use records::{RecordDatabase, RecordSession};
pub use symbols::{SymbolDatabase, SymbolSession};

use crate::layout::location::{same_file, Declaration, LocationFilter, LocationMatcher};
use crate::layout::LayoutError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque reference to a type inside one symbol source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(pub usize);

impl TypeHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Facts a source reports authoritatively. Anything missing is inferred.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const ALIGNMENT = 0b0001;
        const VBASE_LAYOUT = 0b0010;
        const VTOR_DISP = 0b0100;
        const TABLE_POINTERS = 0b1000;
    }
}

impl Capabilities {
    pub fn precise() -> Self {
        Self::all()
    }

    pub fn structural() -> Self {
        Self::empty()
    }
}

/// Shape of a type as far as layout is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Base,
    Enum,
    Pointer { pointee: Option<TypeHandle> },
    Array { element: Option<TypeHandle> },
    UserDefined,
    VTableShape,
}

/// File position as the source reports it, before file table interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldInfo {
    pub position: i64,
    pub width: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseInfo {
    pub ty: TypeHandle,
    pub offset: i64,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualBaseInfo {
    pub ty: TypeHandle,
    /// Only known when the source reports virtual base layout.
    pub offset: Option<i64>,
    pub has_vtor_disp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub ty: TypeHandle,
    /// Byte offset of the member, or of its storage unit for bitfields.
    pub offset: i64,
    pub bitfield: Option<BitfieldInfo>,
    pub location: Option<SourceLocation>,
}

/// Which backend a request reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Source-level record layouts with exact offsets and alignment
    Records,
    /// Debug symbol database without alignment or virtual base layout
    Symbols,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Records => write!(f, "records"),
            Self::Symbols => write!(f, "symbols"),
        }
    }
}

/// Query surface the layout builder is written against.
///
/// Handles are only meaningful for the source that produced them. Queries on
/// a handle the source does not know return empty values rather than failing.
pub trait SymbolSource {
    fn capabilities(&self) -> Capabilities;

    fn pointer_size(&self) -> i64;

    fn pointer_align(&self) -> i64 {
        self.pointer_size()
    }

    fn contains(&self, ty: TypeHandle) -> bool;

    fn type_name(&self, ty: TypeHandle) -> String;

    fn type_size(&self, ty: TypeHandle) -> i64;

    /// Alignment, when the source knows it.
    fn type_align(&self, ty: TypeHandle) -> Option<i64>;

    fn type_kind(&self, ty: TypeHandle) -> TypeKind;

    fn type_location(&self, ty: TypeHandle) -> Option<SourceLocation>;

    /// Has virtual functions
    fn is_dynamic(&self, _ty: TypeHandle) -> bool {
        false
    }

    fn primary_base(&self, _ty: TypeHandle) -> Option<TypeHandle> {
        None
    }

    fn has_own_vfptr(&self, _ty: TypeHandle) -> bool {
        false
    }

    fn vbptr_offset(&self, _ty: TypeHandle) -> Option<i64> {
        None
    }

    /// Size of the type as a base sub-object, without its virtual bases.
    fn non_virtual_size(&self, _ty: TypeHandle) -> Option<i64> {
        None
    }

    /// Direct bases in declaration order.
    fn bases(&self, ty: TypeHandle) -> Vec<BaseInfo>;

    /// Instance data members in declaration order.
    fn members(&self, ty: TypeHandle) -> Vec<MemberInfo>;

    /// Every virtual base of the type, direct or indirect.
    fn virtual_bases(&self, ty: TypeHandle) -> Vec<VirtualBaseInfo>;

    /// Type definitions a cursor can land on.
    fn declarations(&self) -> Vec<Declaration>;

    fn find_type_at(&self, filter: &LocationFilter) -> Option<TypeHandle> {
        let candidates: Vec<Declaration> = self
            .declarations()
            .into_iter()
            .filter(|d| same_file(&d.file, &filter.file))
            .collect();
        LocationMatcher::new(filter.line, filter.column)
            .find(&candidates)
            .map(|d| d.handle)
    }
}

/// Opens the symbol source of the requested kind. The session is released when
/// the returned box is dropped.
pub fn open_session(kind: BackendKind, path: &Path) -> Result<Box<dyn SymbolSource>, LayoutError> {
    let session: Box<dyn SymbolSource> = match kind {
        BackendKind::Records => Box::new(RecordSession::open(path)?),
        BackendKind::Symbols => Box::new(SymbolSession::open(path)?),
    };
    log::info!("Opened {} session: {}", kind, path.display());
    Ok(session)
}

pub(crate) fn read_document<T>(path: &Path) -> Result<T, LayoutError>
where
    T: for<'de> Deserialize<'de>,
{
    let unavailable = |reason: String| LayoutError::SessionUnavailable {
        path: path.to_path_buf(),
        reason,
    };
    let text = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| unavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        assert!(Capabilities::precise().contains(Capabilities::ALIGNMENT | Capabilities::VBASE_LAYOUT));
        assert!(!Capabilities::structural().contains(Capabilities::ALIGNMENT));
    }

    #[test]
    fn test_open_missing_session() {
        let path = std::env::temp_dir().join("struct_layout_missing_session.json");
        let _ = std::fs::remove_file(&path);
        let result = open_session(BackendKind::Symbols, &path);
        assert!(matches!(result, Err(LayoutError::SessionUnavailable { .. })));
    }

    #[test]
    fn test_open_unparsable_session() {
        let path = std::env::temp_dir().join("struct_layout_bad_session.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = open_session(BackendKind::Records, &path);
        assert!(matches!(result, Err(LayoutError::SessionUnavailable { .. })));
        let _ = std::fs::remove_file(&path);
    }
}
