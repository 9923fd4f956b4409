// Mon Oct 12 2026 - Alex

pub mod config;
pub mod layout;
pub mod source;
pub mod engine;
pub mod utils;

pub use config::Config;
pub use engine::LayoutEngine;
pub use layout::{LayoutBuilder, LayoutError, LayoutResult, Node};
pub use source::{open_session, BackendKind, SymbolSource};
