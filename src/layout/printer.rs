// Wed Oct 14 2026 - Alex

use crate::layout::node::{LayoutResult, Node};
use colored::Colorize;
use std::fmt::Write;

pub const NOTHING_FOUND: &str = "Nothing Found!";

const OFFSET_WIDTH: usize = 4;

/// Human readable dump of a layout tree, one line per node:
/// absolute offset, a `| ` gutter, two spaces per depth level, then the node.
pub struct LayoutPrinter {
    colored: bool,
}

impl LayoutPrinter {
    pub fn new() -> Self {
        Self { colored: false }
    }

    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn render(&self, result: &LayoutResult) -> String {
        let mut output = String::new();
        match &result.root {
            Some(root) => self.append(&mut output, root, 0, 0),
            None => {
                output.push_str(NOTHING_FOUND);
                output.push('\n');
            }
        }
        output
    }

    fn append(&self, output: &mut String, node: &Node, base: i64, depth: usize) {
        let offset = base + node.offset;
        let gutter = format!("{:<width$}| ", offset, width = OFFSET_WIDTH);
        let indent = "  ".repeat(depth);
        let line = node.to_string();

        if self.colored {
            let line = if node.category.is_table_pointer() || node.type_name.is_empty() {
                line.dimmed().to_string()
            } else if node.category.is_base() {
                line.cyan().to_string()
            } else {
                line
            };
            let _ = writeln!(output, "{}{}{}", gutter.yellow(), indent, line);
        } else {
            let _ = writeln!(output, "{}{}{}", gutter, indent, line);
        }

        for child in &node.children {
            self.append(output, child, offset, depth + 1);
        }
    }
}

impl Default for LayoutPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::node::Category;

    #[test]
    fn test_empty_result() {
        let text = LayoutPrinter::new().render(&LayoutResult::empty());
        assert_eq!(text, "Nothing Found!\n");
    }

    #[test]
    fn test_absolute_offsets_and_indent() {
        let mut inner = Node::new(Category::ComplexField);
        inner.type_name = "Vec2".to_string();
        inner.member_name = "pos".to_string();
        inner.offset = 8;
        inner.size = 8;
        inner.align = 4;
        let mut y = Node::new(Category::SimpleField);
        y.type_name = "float".to_string();
        y.member_name = "y".to_string();
        y.offset = 4;
        y.size = 4;
        y.align = 4;
        inner.push(y);

        let mut root = Node::new(Category::Root);
        root.type_name = "Entity".to_string();
        root.size = 16;
        root.align = 8;
        root.push(Node::table_pointer(Category::VTablePointer, 0, 8, 8));
        root.push(inner);

        let text = LayoutPrinter::new().render(&LayoutResult::new(root, Vec::new()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "0   | Entity  ( size: 16 | align: 8)",
                "0   |   vtable pointer ( size: 8 | align: 8)",
                "8   |   Vec2 pos ( size: 8 | align: 4)",
                "12  |     float y ( size: 4 | align: 4)",
            ]
        );
    }
}
