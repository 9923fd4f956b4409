// Wed Oct 14 2026 - Alex

use crate::config::Config;
use crate::layout::{LayoutBuilder, LayoutError, LayoutResult, LocationFilter, StructureValidator};
use crate::source::{open_session, BackendKind, SymbolSource};
use crate::utils::logging::ScopedTimer;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Runs layout requests against one symbol database.
///
/// Every request opens its own session and builds with a fresh request
/// context, so nothing from one request is visible to the next.
pub struct LayoutEngine {
    backend: BackendKind,
    input: PathBuf,
    validate: bool,
    state: EngineState,
}

impl LayoutEngine {
    pub fn new(backend: BackendKind, input: &Path) -> Self {
        Self {
            backend,
            input: input.to_path_buf(),
            validate: true,
            state: EngineState::Idle,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, LayoutError> {
        let input = config.input.as_deref().ok_or_else(|| LayoutError::SessionUnavailable {
            path: PathBuf::new(),
            reason: "no input database configured".to_string(),
        })?;
        Ok(Self::new(config.backend, input).with_validation(config.validate_layout))
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Resolves the type under `filter`. Only a session that cannot be opened
    /// is an error; a location without a type yields an empty result.
    pub fn resolve(&mut self, filter: &LocationFilter) -> Result<LayoutResult, LayoutError> {
        self.state = EngineState::Running;
        let _timer = ScopedTimer::new(&format!("resolve {}", filter));

        let session = match open_session(self.backend, &self.input) {
            Ok(session) => session,
            Err(e) => {
                log::error!("{}", e);
                self.state = EngineState::Failed;
                return Err(e);
            }
        };
        let result = resolve_in(session.as_ref(), filter, self.validate);

        self.state = EngineState::Completed;
        Ok(result)
    }

    /// Like `resolve`, but any failure is logged and turned into an empty
    /// result.
    pub fn resolve_or_empty(&mut self, filter: &LocationFilter) -> LayoutResult {
        self.resolve(filter).unwrap_or_else(|_| LayoutResult::empty())
    }
}

/// Finds the type under `filter` in an already opened source and builds it.
pub fn resolve_in(source: &dyn SymbolSource, filter: &LocationFilter, validate: bool) -> LayoutResult {
    let Some(handle) = source.find_type_at(filter) else {
        let unresolved = LayoutError::SourceUnresolved {
            file: filter.file.clone(),
            line: filter.line,
            column: filter.column,
        };
        log::warn!("{}", unresolved);
        return LayoutResult::empty();
    };

    let type_name = source.type_name(handle);
    log::info!("Building layout of {} found at {}", type_name, filter);
    let result = LayoutBuilder::new(source).build_result(handle);
    let Some(root) = &result.root else {
        log::warn!("{}", LayoutError::SymbolNotFound(type_name));
        return result;
    };

    if validate {
        let report = StructureValidator::new().validate(root);
        for issue in &report.issues {
            log::debug!("Layout check: {}", issue);
        }
        log::debug!(
            "Checked {} nodes of {}, {} issues",
            report.nodes_checked,
            root.type_name,
            report.issues.len()
        );
    }
    log::info!("{} has {} nodes across {} files", root.type_name, root.count(), result.files.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Category;
    use serde_json::json;

    fn write_fixture(name: &str, document: serde_json::Value) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, document.to_string()).unwrap();
        path
    }

    fn symbol_fixture(name: &str) -> PathBuf {
        write_fixture(
            name,
            json!({
                "pointer_size": 8,
                "symbols": [
                    { "tag": "base_type", "id": "int", "base": "int", "length": 4 },
                    { "tag": "udt", "name": "Point", "length": 8, "file": "geo\\point.h", "line": 4, "children": [
                        { "tag": "data", "name": "x", "type": "int", "offset": 0, "line": 5 },
                        { "tag": "data", "name": "y", "type": "int", "offset": 4, "line": 6 }
                    ] },
                    { "tag": "udt", "name": "Size", "length": 4, "file": "geo/size.h", "line": 2, "children": [
                        { "tag": "data", "name": "w", "type": "int", "offset": 0, "line": 3 }
                    ] }
                ]
            }),
        )
    }

    #[test]
    fn test_resolve_symbols() {
        let path = symbol_fixture("struct_layout_engine_symbols.json");
        let mut engine = LayoutEngine::new(BackendKind::Symbols, &path);
        let result = engine.resolve(&LocationFilter::new("geo/point.h", 4, 1)).unwrap();
        let root = result.root.as_ref().unwrap();
        assert_eq!(root.type_name, "Point");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].category, Category::SimpleField);
        assert_eq!(result.files, vec!["geo\\point.h".to_string()]);
        assert_eq!(engine.state(), EngineState::Completed);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_requests_do_not_share_state() {
        let path = symbol_fixture("struct_layout_engine_isolation.json");
        let mut engine = LayoutEngine::new(BackendKind::Symbols, &path);
        let first = engine.resolve(&LocationFilter::new("geo/point.h", 4, 1)).unwrap();
        let second = engine.resolve(&LocationFilter::new("geo/size.h", 2, 1)).unwrap();
        assert_eq!(first.files.len(), 1);
        assert_eq!(second.files, vec!["geo/size.h".to_string()]);
        assert_eq!(second.root.as_ref().map(|r| r.type_name.as_str()), Some("Size"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unresolved_location_is_empty() {
        let path = symbol_fixture("struct_layout_engine_unresolved.json");
        let mut engine = LayoutEngine::new(BackendKind::Symbols, &path);
        let result = engine.resolve(&LocationFilter::new("geo/point.h", 40, 1)).unwrap();
        assert!(result.is_empty());
        assert!(result.files.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_session_fails_without_poisoning() {
        let missing = std::env::temp_dir().join("struct_layout_engine_missing.json");
        let _ = std::fs::remove_file(&missing);
        let mut engine = LayoutEngine::new(BackendKind::Records, &missing);
        let filter = LocationFilter::new("a.h", 1, 1);
        assert!(matches!(engine.resolve(&filter), Err(LayoutError::SessionUnavailable { .. })));
        assert_eq!(engine.state(), EngineState::Failed);
        assert!(engine.resolve_or_empty(&filter).is_empty());
    }

    #[test]
    fn test_resolve_records() {
        let path = write_fixture(
            "struct_layout_engine_records.json",
            json!({
                "types": [
                    { "kind": "builtin", "name": "short", "size": 2, "align": 2 },
                    { "kind": "record", "name": "Pair", "size": 4, "align": 2,
                      "file": "pair.h", "line": 1, "column": 1, "end_line": 4, "end_column": 2,
                      "fields": [
                          { "name": "a", "type": "short", "offset_bits": 0, "line": 2, "column": 5 },
                          { "name": "b", "type": "short", "offset_bits": 16, "line": 3, "column": 5 }
                      ] }
                ]
            }),
        );
        let config = Config::new()
            .with_backend(BackendKind::Records)
            .with_input(path.clone())
            .with_location(LocationFilter::new("pair.h", 2, 9));
        let mut engine = LayoutEngine::from_config(&config).unwrap();
        let result = engine.resolve(&config.location).unwrap();
        let root = result.root.as_ref().unwrap();
        assert_eq!((root.size, root.align), (4, 2));
        assert_eq!(root.children[1].offset, 2);
        assert_eq!(root.children[1].field_location.line, 3);
        let _ = std::fs::remove_file(&path);
    }
}
