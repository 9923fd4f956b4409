// Mon Oct 12 2026 - Alex

use std::fmt;

/// Sentinel file index for a location that could not be resolved.
pub const INVALID_FILE_INDEX: i32 = -1;

/// What a node represents inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    Root = 0,
    SimpleField,
    Bitfield,
    ComplexField,
    VirtualPrimaryBase,
    VirtualBase,
    NonVirtualPrimaryBase,
    NonVirtualBase,
    VTablePointer,
    VFTablePointer,
    VBTablePointer,
    VtorDisplacement,
}

impl Category {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        let category = match value {
            0 => Self::Root,
            1 => Self::SimpleField,
            2 => Self::Bitfield,
            3 => Self::ComplexField,
            4 => Self::VirtualPrimaryBase,
            5 => Self::VirtualBase,
            6 => Self::NonVirtualPrimaryBase,
            7 => Self::NonVirtualBase,
            8 => Self::VTablePointer,
            9 => Self::VFTablePointer,
            10 => Self::VBTablePointer,
            11 => Self::VtorDisplacement,
            _ => return None,
        };
        Some(category)
    }

    pub fn is_base(self) -> bool {
        matches!(
            self,
            Self::VirtualPrimaryBase | Self::VirtualBase | Self::NonVirtualPrimaryBase | Self::NonVirtualBase
        )
    }

    pub fn is_virtual_base(self) -> bool {
        matches!(self, Self::VirtualPrimaryBase | Self::VirtualBase)
    }

    pub fn is_table_pointer(self) -> bool {
        matches!(self, Self::VTablePointer | Self::VFTablePointer | Self::VBTablePointer)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::SimpleField => "field",
            Self::Bitfield => "bitfield",
            Self::ComplexField => "complex field",
            Self::VirtualPrimaryBase => "virtual primary base",
            Self::VirtualBase => "virtual base",
            Self::NonVirtualPrimaryBase => "primary base",
            Self::NonVirtualBase => "base",
            Self::VTablePointer => "vtable pointer",
            Self::VFTablePointer => "vftable pointer",
            Self::VBTablePointer => "vbtable pointer",
            Self::VtorDisplacement => "vtorDisp",
        };
        write!(f, "{}", name)
    }
}

/// Position inside a file of the request's file table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub file_index: i32,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file_index: i32, line: u32, column: u32) -> Self {
        Self { file_index, line, column }
    }

    pub fn invalid() -> Self {
        Self {
            file_index: INVALID_FILE_INDEX,
            line: 0,
            column: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.file_index >= 0
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::invalid()
    }
}

/// One element of a reconstructed layout tree.
///
/// Offsets are relative to the parent node. Children are owned by their
/// parent and kept sorted by offset once a node is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub type_name: String,
    pub member_name: String,
    pub offset: i64,
    pub size: i64,
    pub align: i64,
    pub category: Category,
    pub type_location: Location,
    pub field_location: Location,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    /// Hidden pointer-sized slot (vtable, vftable or vbtable pointer).
    pub fn table_pointer(category: Category, offset: i64, pointer_size: i64, pointer_align: i64) -> Self {
        Self {
            offset,
            size: pointer_size,
            align: pointer_align,
            category,
            ..Self::default()
        }
    }

    /// Bit position and width of a bitfield inside its storage unit.
    pub fn bitfield_extra(bit_position: i64, bit_width: i64) -> Self {
        Self {
            offset: bit_position,
            size: bit_width,
            category: Category::Root,
            ..Self::default()
        }
    }

    pub fn end(&self) -> i64 {
        self.offset + self.size
    }

    pub fn overlaps(&self, offset: i64, size: i64) -> bool {
        self.offset < offset + size && offset < self.end()
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Stable sort, ties keep discovery order.
    pub fn sort_children(&mut self) {
        self.children.sort_by_key(|c| c.offset);
    }

    pub fn max_child_align(&self) -> Option<i64> {
        self.children.iter().map(|c| c.align).max()
    }

    pub fn children_end(&self) -> i64 {
        self.children.iter().map(Node::end).max().unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Bitfield children are bit ranges, not sub-objects.
    pub fn has_extra_data(&self) -> bool {
        self.category == Category::Bitfield
    }
}

impl Default for Node {
    fn default() -> Self {
        Self {
            type_name: String::new(),
            member_name: String::new(),
            offset: 0,
            size: 1,
            align: 1,
            category: Category::Root,
            type_location: Location::invalid(),
            field_location: Location::invalid(),
            children: Vec::new(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            Category::VTablePointer
            | Category::VFTablePointer
            | Category::VBTablePointer
            | Category::VtorDisplacement => write!(f, "{}", self.category)?,
            _ => write!(f, "{} {}", self.type_name, self.member_name)?,
        }
        write!(f, " ( size: {} | align: {})", self.size, self.align)
    }
}

/// Outcome of one layout request: the root node, if anything matched, and the
/// files its locations point into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutResult {
    pub root: Option<Node>,
    pub files: Vec<String>,
}

impl LayoutResult {
    pub fn new(root: Node, files: Vec<String>) -> Self {
        Self { root: Some(root), files }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn file(&self, location: &Location) -> Option<&str> {
        if !location.is_valid() {
            return None;
        }
        self.files.get(location.file_index as usize).map(String::as_str)
    }
}
