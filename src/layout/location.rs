// Mon Oct 12 2026 - Alex

use crate::source::TypeHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cursor position a request asks about
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationFilter {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl LocationFilter {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
            column,
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Line/column pair, ordered lexically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A type definition the cursor may land on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub handle: TypeHandle,
    pub file: String,
    pub start: Position,
    pub end: Position,
    pub complete: bool,
    pub dependent: bool,
    pub invalid: bool,
}

impl Declaration {
    pub fn new(handle: TypeHandle, file: &str, start: Position, end: Position) -> Self {
        Self {
            handle,
            file: file.to_string(),
            start,
            end,
            complete: true,
            dependent: false,
            invalid: false,
        }
    }

    /// Only known by the line its definition starts on.
    pub fn single_line(handle: TypeHandle, file: &str, line: u32) -> Self {
        Self::new(handle, file, Position::new(line, 0), Position::new(line, u32::MAX))
    }

    pub fn is_eligible(&self) -> bool {
        self.complete && !self.dependent && !self.invalid
    }

    pub fn contains(&self, cursor: Position) -> bool {
        self.start <= cursor && cursor <= self.end
    }
}

/// Picks the innermost declaration enclosing a cursor: among all eligible
/// candidates containing it, the one that starts last.
pub struct LocationMatcher {
    cursor: Position,
}

impl LocationMatcher {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            cursor: Position::new(line, column),
        }
    }

    pub fn find<'a>(&self, candidates: &'a [Declaration]) -> Option<&'a Declaration> {
        let mut best: Option<&Declaration> = None;
        for candidate in candidates {
            if !candidate.is_eligible() || !candidate.contains(self.cursor) {
                continue;
            }
            if best.map_or(true, |b| candidate.start > b.start) {
                best = Some(candidate);
            }
        }
        if let Some(found) = best {
            log::debug!(
                "Cursor {}:{} matched declaration {} starting at {}:{}",
                self.cursor.line,
                self.cursor.column,
                found.handle,
                found.start.line,
                found.start.column
            );
        }
        best
    }
}

/// Path equality with `/` and `\` treated as the same separator.
pub fn same_file(a: &str, b: &str) -> bool {
    let normalize = |c: char| if c == '\\' { '/' } else { c };
    a.len() == b.len() && a.chars().map(normalize).eq(b.chars().map(normalize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Vec<Declaration> {
        vec![
            Declaration::new(TypeHandle(0), "a.h", Position::new(10, 1), Position::new(20, 2)),
            Declaration::new(TypeHandle(1), "a.h", Position::new(12, 5), Position::new(15, 6)),
        ]
    }

    #[test]
    fn test_innermost_declaration_wins() {
        let candidates = nested();
        let found = LocationMatcher::new(13, 5).find(&candidates);
        assert_eq!(found.map(|d| d.handle), Some(TypeHandle(1)));
    }

    #[test]
    fn test_outer_declaration_outside_inner_range() {
        let candidates = nested();
        let found = LocationMatcher::new(11, 1).find(&candidates);
        assert_eq!(found.map(|d| d.handle), Some(TypeHandle(0)));
    }

    #[test]
    fn test_same_line_greater_column_wins() {
        let candidates = vec![
            Declaration::new(TypeHandle(0), "a.h", Position::new(3, 1), Position::new(3, 80)),
            Declaration::new(TypeHandle(1), "a.h", Position::new(3, 20), Position::new(3, 60)),
        ];
        let found = LocationMatcher::new(3, 30).find(&candidates);
        assert_eq!(found.map(|d| d.handle), Some(TypeHandle(1)));

        let found = LocationMatcher::new(3, 10).find(&candidates);
        assert_eq!(found.map(|d| d.handle), Some(TypeHandle(0)));
    }

    #[test]
    fn test_ineligible_declarations_are_skipped() {
        let mut candidates = nested();
        candidates[1].dependent = true;
        let found = LocationMatcher::new(13, 5).find(&candidates);
        assert_eq!(found.map(|d| d.handle), Some(TypeHandle(0)));

        candidates[0].complete = false;
        assert!(LocationMatcher::new(13, 5).find(&candidates).is_none());
    }

    #[test]
    fn test_no_match() {
        let candidates = nested();
        assert!(LocationMatcher::new(25, 1).find(&candidates).is_none());
        assert!(LocationMatcher::new(20, 3).find(&candidates).is_none());
    }

    #[test]
    fn test_single_line_declaration() {
        let decl = Declaration::single_line(TypeHandle(3), "b.h", 7);
        assert!(decl.contains(Position::new(7, 0)));
        assert!(decl.contains(Position::new(7, 400)));
        assert!(!decl.contains(Position::new(8, 0)));
    }

    #[test]
    fn test_same_file_separators() {
        assert!(same_file("src\\core\\a.h", "src/core/a.h"));
        assert!(same_file("a.h", "a.h"));
        assert!(!same_file("src/a.h", "src/b.h"));
        assert!(!same_file("src/a.h", "src/a.hpp"));
    }
}
