// Mon Oct 12 2026 - Alex

pub mod node;
pub mod error;
pub mod location;
pub mod context;
pub mod alignment;
pub mod vbase;
pub mod builder;
pub mod validator;
pub mod serializer;
pub mod printer;

pub use node::{Category, LayoutResult, Location, Node, INVALID_FILE_INDEX};
pub use error::LayoutError;
pub use location::{Declaration, LocationFilter, LocationMatcher, Position};
pub use context::{FileTable, RequestContext};
pub use alignment::AlignmentInferencer;
pub use vbase::VirtualBaseResolver;
pub use builder::LayoutBuilder;
pub use validator::{StructureValidator, ValidationReport};
pub use serializer::{LayoutSerializer, ARTIFACT_VERSION};
pub use printer::LayoutPrinter;
