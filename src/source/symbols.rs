// Tue Oct 13 2026 - Alex

use crate::layout::location::Declaration;
use crate::layout::LayoutError;
use crate::source::{
    read_document, BaseInfo, BitfieldInfo, Capabilities, MemberInfo, SourceLocation, SymbolSource, TypeHandle,
    TypeKind, VirtualBaseInfo,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_NAME_DEPTH: usize = 64;

fn default_pointer_size() -> i64 {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDatabase {
    #[serde(default = "default_pointer_size")]
    pub pointer_size: i64,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicType {
    NoType,
    Void,
    Char,
    #[serde(rename = "wchar")]
    WChar,
    Int,
    #[serde(rename = "uint")]
    UInt,
    Float,
    Bcd,
    Bool,
    Long,
    #[serde(rename = "ulong")]
    ULong,
    Currency,
    Date,
    Variant,
    Complex,
    Bit,
    Bstr,
    Hresult,
    Char16,
    Char32,
    Char8,
}

impl BasicType {
    pub fn name(self, length: i64) -> &'static str {
        match self {
            Self::NoType => "",
            Self::Void => "void",
            Self::Char => "char",
            Self::WChar => "wchar_t",
            Self::Int => match length {
                1 => "int8",
                2 => "int16",
                4 => "int32",
                8 => "int64",
                16 => "int128",
                _ => "int???",
            },
            Self::UInt => match length {
                1 => "uint8",
                2 => "uint16",
                4 => "uint32",
                8 => "uint64",
                16 => "uint128",
                _ => "uint???",
            },
            Self::Float => match length {
                2 => "half",
                4 => "float",
                8 => "double",
                _ => "float???",
            },
            Self::Bcd => "bcd",
            Self::Bool => "bool",
            Self::Long => "long",
            Self::ULong => "unsigned long",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::Variant => "variant",
            Self::Complex => "complex",
            Self::Bit => "bit",
            Self::Bstr => "BSTR",
            Self::Hresult => "HRESULT",
            Self::Char16 => "char16_t",
            Self::Char32 => "char32_t",
            Self::Char8 => "char8_t",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Symbol {
    BaseType {
        id: String,
        base: BasicType,
        length: i64,
    },
    Pointer {
        id: String,
        #[serde(default)]
        pointee: Option<String>,
        #[serde(default)]
        length: Option<i64>,
        #[serde(default)]
        reference: bool,
        #[serde(default, rename = "const")]
        is_const: bool,
        #[serde(default, rename = "volatile")]
        is_volatile: bool,
        #[serde(default, rename = "unaligned")]
        is_unaligned: bool,
    },
    Array {
        id: String,
        element: String,
        #[serde(default)]
        count: Option<i64>,
        length: i64,
    },
    Enum {
        id: String,
        name: String,
        length: i64,
    },
    VtableShape {
        id: String,
    },
    Udt(UdtSymbol),
}

impl Symbol {
    pub fn id(&self) -> &str {
        match self {
            Self::BaseType { id, .. }
            | Self::Pointer { id, .. }
            | Self::Array { id, .. }
            | Self::Enum { id, .. }
            | Self::VtableShape { id } => id,
            Self::Udt(udt) => &udt.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdtSymbol {
    pub name: String,
    pub length: i64,
    #[serde(default)]
    pub union: bool,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub children: Vec<UdtChild>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum UdtChild {
    BaseClass {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        offset: i64,
        #[serde(default, rename = "virtual")]
        is_virtual: bool,
        #[serde(default)]
        indirect: bool,
    },
    Data {
        name: String,
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        offset: i64,
        #[serde(default, rename = "static")]
        is_static: bool,
        #[serde(default)]
        bit_position: Option<i64>,
        #[serde(default)]
        bit_length: Option<i64>,
        #[serde(default)]
        line: u32,
    },
}

/// Open symbol database.
///
/// Carries member and base lists, byte offsets, raw lengths and bitfield
/// positions, but no alignment, and virtual bases come without offsets.
pub struct SymbolSession {
    pointer_size: i64,
    symbols: IndexMap<String, Symbol>,
}

impl SymbolSession {
    pub fn open(path: &Path) -> Result<Self, LayoutError> {
        let database: SymbolDatabase = read_document(path)?;
        Ok(Self::from_database(database))
    }

    pub fn from_database(database: SymbolDatabase) -> Self {
        let mut symbols = IndexMap::with_capacity(database.symbols.len());
        for symbol in database.symbols {
            let id = symbol.id().to_string();
            if symbols.contains_key(&id) {
                log::warn!("Duplicate symbol {}, keeping the first definition", id);
                continue;
            }
            symbols.insert(id, symbol);
        }
        log::debug!("Loaded {} symbols", symbols.len());
        Self {
            pointer_size: database.pointer_size,
            symbols,
        }
    }

    pub fn handle(&self, id: &str) -> Option<TypeHandle> {
        self.symbols.get_index_of(id).map(TypeHandle)
    }

    fn get(&self, ty: TypeHandle) -> Option<&Symbol> {
        self.symbols.get_index(ty.index()).map(|(_, s)| s)
    }

    fn udt(&self, ty: TypeHandle) -> Option<&UdtSymbol> {
        match self.get(ty) {
            Some(Symbol::Udt(udt)) => Some(udt),
            _ => None,
        }
    }

    fn resolve(&self, id: &str) -> Option<TypeHandle> {
        let handle = self.handle(id);
        if handle.is_none() {
            log::warn!("Symbol database references unknown symbol {}", id);
        }
        handle
    }

    fn name_at(&self, ty: TypeHandle, depth: usize) -> String {
        if depth > MAX_NAME_DEPTH {
            log::warn!("Type name of {} nests too deep", ty);
            return "???".to_string();
        }
        match self.get(ty) {
            Some(Symbol::BaseType { base, length, .. }) => base.name(*length).to_string(),
            Some(Symbol::Pointer {
                pointee,
                reference,
                is_const,
                is_volatile,
                is_unaligned,
                ..
            }) => {
                let inner = pointee
                    .as_deref()
                    .and_then(|p| self.handle(p))
                    .map(|p| self.name_at(p, depth + 1))
                    .unwrap_or_default();
                let mut name = format!("{}{}", inner, if *reference { "&" } else { "*" });
                if *is_unaligned {
                    name = format!("__unaligned {}", name);
                }
                if *is_volatile {
                    name = format!("volatile {}", name);
                }
                if *is_const {
                    name = format!("const {}", name);
                }
                name
            }
            Some(Symbol::Array {
                element, count, length, ..
            }) => self.array_name(element, *count, *length, depth),
            Some(Symbol::Enum { name, .. }) => format!("enum {}", name),
            Some(Symbol::Udt(udt)) if udt.union => format!("union {}", udt.name),
            Some(Symbol::Udt(udt)) => udt.name.clone(),
            Some(Symbol::VtableShape { .. }) | None => String::new(),
        }
    }

    fn array_name(&self, element: &str, count: Option<i64>, length: i64, depth: usize) -> String {
        let Some(element) = self.handle(element) else {
            return "???[]".to_string();
        };
        let count = match count {
            Some(count) if count > 0 => count,
            _ => {
                let element_size = self.type_size(element);
                if element_size == 0 {
                    return "???[]".to_string();
                }
                length / element_size
            }
        };
        format!("{}[{}]", self.name_at(element, depth + 1), count)
    }

    fn base_classes(&self, ty: TypeHandle) -> impl Iterator<Item = (&str, i64, bool, bool)> + '_ {
        self.udt(ty)
            .into_iter()
            .flat_map(|udt| udt.children.iter())
            .filter_map(|child| match child {
                UdtChild::BaseClass {
                    ty,
                    offset,
                    is_virtual,
                    indirect,
                } => Some((ty.as_str(), *offset, *is_virtual, *indirect)),
                UdtChild::Data { .. } => None,
            })
    }
}

impl Drop for SymbolSession {
    fn drop(&mut self) {
        log::debug!("Closed symbol session ({} symbols)", self.symbols.len());
    }
}

impl SymbolSource for SymbolSession {
    fn capabilities(&self) -> Capabilities {
        Capabilities::structural()
    }

    fn pointer_size(&self) -> i64 {
        self.pointer_size
    }

    fn contains(&self, ty: TypeHandle) -> bool {
        self.get(ty).is_some()
    }

    fn type_name(&self, ty: TypeHandle) -> String {
        self.name_at(ty, 0)
    }

    fn type_size(&self, ty: TypeHandle) -> i64 {
        match self.get(ty) {
            Some(Symbol::BaseType { length, .. })
            | Some(Symbol::Array { length, .. })
            | Some(Symbol::Enum { length, .. }) => *length,
            Some(Symbol::Pointer { length, .. }) => length.unwrap_or(self.pointer_size),
            Some(Symbol::Udt(udt)) => udt.length,
            Some(Symbol::VtableShape { .. }) | None => 0,
        }
    }

    fn type_align(&self, _ty: TypeHandle) -> Option<i64> {
        None
    }

    fn type_kind(&self, ty: TypeHandle) -> TypeKind {
        match self.get(ty) {
            Some(Symbol::Pointer { pointee, .. }) => TypeKind::Pointer {
                pointee: pointee.as_deref().and_then(|p| self.handle(p)),
            },
            Some(Symbol::Array { element, .. }) => TypeKind::Array {
                element: self.handle(element),
            },
            Some(Symbol::Enum { .. }) => TypeKind::Enum,
            Some(Symbol::VtableShape { .. }) => TypeKind::VTableShape,
            Some(Symbol::Udt(_)) => TypeKind::UserDefined,
            Some(Symbol::BaseType { .. }) | None => TypeKind::Base,
        }
    }

    fn type_location(&self, ty: TypeHandle) -> Option<SourceLocation> {
        let udt = self.udt(ty)?;
        let file = udt.file.as_deref()?;
        Some(SourceLocation::new(file, udt.line, 0))
    }

    fn bases(&self, ty: TypeHandle) -> Vec<BaseInfo> {
        self.base_classes(ty)
            .filter(|(_, _, _, indirect)| !indirect)
            .filter_map(|(name, offset, is_virtual, _)| {
                Some(BaseInfo {
                    ty: self.resolve(name)?,
                    offset,
                    is_virtual,
                })
            })
            .collect()
    }

    fn members(&self, ty: TypeHandle) -> Vec<MemberInfo> {
        let Some(udt) = self.udt(ty) else {
            return Vec::new();
        };
        udt.children
            .iter()
            .filter_map(|child| match child {
                UdtChild::Data {
                    name,
                    ty,
                    offset,
                    is_static: false,
                    bit_position,
                    bit_length,
                    line,
                } => {
                    let bitfield = bit_length.map(|width| BitfieldInfo {
                        position: bit_position.unwrap_or(0),
                        width,
                    });
                    let location = match (&udt.file, *line) {
                        (Some(file), line) if line > 0 => Some(SourceLocation::new(file, line, 0)),
                        _ => None,
                    };
                    Some(MemberInfo {
                        name: name.clone(),
                        ty: self.resolve(ty)?,
                        offset: *offset,
                        bitfield,
                        location,
                    })
                }
                _ => None,
            })
            .collect()
    }

    fn virtual_bases(&self, ty: TypeHandle) -> Vec<VirtualBaseInfo> {
        self.base_classes(ty)
            .filter(|(_, _, is_virtual, _)| *is_virtual)
            .filter_map(|(name, _, _, _)| {
                Some(VirtualBaseInfo {
                    ty: self.resolve(name)?,
                    offset: None,
                    has_vtor_disp: false,
                })
            })
            .collect()
    }

    fn declarations(&self) -> Vec<Declaration> {
        self.symbols
            .values()
            .enumerate()
            .filter_map(|(index, symbol)| match symbol {
                Symbol::Udt(udt) if udt.line > 0 => {
                    let file = udt.file.as_deref()?;
                    Some(Declaration::single_line(TypeHandle(index), file, udt.line))
                }
                _ => None,
            })
            .collect()
    }
}
