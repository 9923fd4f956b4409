// Wed Oct 14 2026 - Alex

use crate::layout::LocationFilter;
use crate::source::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_FILE: &str = "output.slbin";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub input: Option<PathBuf>,
    pub output_file: PathBuf,
    pub location: LocationFilter,
    pub verbosity: usize,
    pub show_layout: bool,
    pub validate_layout: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Records,
            input: None,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            location: LocationFilter::default(),
            verbosity: 0,
            show_layout: false,
            validate_layout: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, crate::layout::LayoutError> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_input(mut self, input: PathBuf) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output_file(mut self, output: PathBuf) -> Self {
        self.output_file = output;
        self
    }

    pub fn with_location(mut self, location: LocationFilter) -> Self {
        self.location = location;
        self
    }

    pub fn with_verbosity(mut self, verbosity: usize) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_show_layout(mut self, show: bool) -> Self {
        self.show_layout = show;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input.is_none() {
            return Err("An input symbol database must be set".to_string());
        }
        if self.location.file.is_empty() {
            return Err("A source file to search must be set".to_string());
        }
        if self.location.line == 0 {
            return Err("Source lines start at 1".to_string());
        }
        if self.output_file.as_os_str().is_empty() {
            return Err("output_file must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        Config::new()
            .with_input(PathBuf::from("layouts.json"))
            .with_location(LocationFilter::new("src/a.h", 12, 4))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Records);
        assert_eq!(config.output_file, PathBuf::from("output.slbin"));
        assert!(!config.show_layout);
    }

    #[test]
    fn test_validate() {
        assert!(complete().validate().is_ok());
        assert!(Config::new().validate().is_err());

        let mut config = complete();
        config.location.line = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join("struct_layout_config.json");
        std::fs::write(&path, r#"{ "backend": "symbols", "location": { "file": "a.h", "line": 3, "column": 1 } }"#)
            .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Symbols);
        assert_eq!(config.location, LocationFilter::new("a.h", 3, 1));
        assert_eq!(config.output_file, PathBuf::from(DEFAULT_OUTPUT_FILE));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let path = std::env::temp_dir().join("struct_layout_config_overrides.json");
        std::fs::write(&path, r#"{ "output_file": "from_file.slbin", "verbosity": 1, "show_layout": true }"#).unwrap();
        let config = Config::load(&path)
            .unwrap()
            .with_output_file(PathBuf::from("cli.slbin"))
            .with_verbosity(3)
            .with_show_layout(false);
        assert_eq!(config.output_file, PathBuf::from("cli.slbin"));
        assert_eq!(config.verbosity, 3);
        assert!(!config.show_layout);
        let _ = std::fs::remove_file(&path);
    }
}
