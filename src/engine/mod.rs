// Wed Oct 14 2026 - Alex

pub mod core;

pub use self::core::{resolve_in, EngineState, LayoutEngine};
