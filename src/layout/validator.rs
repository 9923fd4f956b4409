// Wed Oct 14 2026 - Alex

use crate::layout::node::{Category, Node};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Overlap { other: String, other_offset: i64 },
    Misaligned { align: i64 },
}

/// A broken invariant found in a layout tree, anchored by the path of member
/// or type names leading to the offending node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutIssue {
    pub path: String,
    pub offset: i64,
    pub kind: IssueKind,
}

impl fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Overlap { other, other_offset } => write!(
                f,
                "{} at offset {} overlaps {} at offset {}",
                self.path, self.offset, other, other_offset
            ),
            IssueKind::Misaligned { align } => {
                write!(f, "{} at offset {} is not aligned to {}", self.path, self.offset, align)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<LayoutIssue>,
    pub nodes_checked: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn overlaps(&self) -> impl Iterator<Item = &LayoutIssue> {
        self.issues.iter().filter(|i| matches!(i.kind, IssueKind::Overlap { .. }))
    }

    pub fn misaligned(&self) -> impl Iterator<Item = &LayoutIssue> {
        self.issues.iter().filter(|i| matches!(i.kind, IssueKind::Misaligned { .. }))
    }
}

/// Checks that siblings do not overlap and that offsets respect alignment.
///
/// Union members and bitfields sharing one storage unit overlap by nature and
/// are not reported. Bit ranges under a bitfield are not sub-objects and are
/// skipped.
pub struct StructureValidator;

impl StructureValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, root: &Node) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.visit(root, &label(root), &mut report);
        report
    }

    fn visit(&self, node: &Node, path: &str, report: &mut ValidationReport) {
        report.nodes_checked += 1;

        if node.offset > 0 && node.align > 0 && node.offset % node.align != 0 {
            report.issues.push(LayoutIssue {
                path: path.to_string(),
                offset: node.offset,
                kind: IssueKind::Misaligned { align: node.align },
            });
        }

        if node.has_extra_data() {
            return;
        }

        if !node.type_name.starts_with("union ") {
            self.check_overlaps(node, path, report);
        }

        for child in &node.children {
            self.visit(child, &format!("{}.{}", path, label(child)), report);
        }
    }

    fn check_overlaps(&self, node: &Node, path: &str, report: &mut ValidationReport) {
        let mut widest: Option<&Node> = None;
        for child in node.children.iter().filter(|c| c.size > 0).sorted_by_key(|c| c.offset) {
            if let Some(previous) = widest {
                let shared_unit = previous.category == Category::Bitfield
                    && child.category == Category::Bitfield
                    && previous.offset == child.offset;
                if child.offset < previous.end() && !shared_unit {
                    report.issues.push(LayoutIssue {
                        path: format!("{}.{}", path, label(child)),
                        offset: child.offset,
                        kind: IssueKind::Overlap {
                            other: label(previous),
                            other_offset: previous.offset,
                        },
                    });
                }
            }
            if widest.map_or(true, |w| child.end() > w.end()) {
                widest = Some(child);
            }
        }
    }
}

impl Default for StructureValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn label(node: &Node) -> String {
    if !node.member_name.is_empty() {
        node.member_name.clone()
    } else if !node.type_name.is_empty() {
        node.type_name.clone()
    } else {
        node.category.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str, category: Category, offset: i64, size: i64, align: i64) -> Node {
        let mut node = Node::new(category);
        node.member_name = name.to_string();
        node.offset = offset;
        node.size = size;
        node.align = align;
        node
    }

    fn root(children: Vec<Node>) -> Node {
        let mut node = Node::new(Category::Root);
        node.type_name = "Sample".to_string();
        node.size = 32;
        node.children = children;
        node
    }

    #[test]
    fn test_clean_layout() {
        let node = root(vec![
            child("a", Category::SimpleField, 0, 4, 4),
            child("b", Category::SimpleField, 8, 8, 8),
        ]);
        let report = StructureValidator::new().validate(&node);
        assert!(report.is_valid());
        assert_eq!(report.nodes_checked, 3);
    }

    #[test]
    fn test_detects_overlap_with_non_adjacent_sibling() {
        let node = root(vec![
            child("wide", Category::SimpleField, 0, 16, 8),
            child("a", Category::SimpleField, 4, 4, 4),
            child("b", Category::SimpleField, 8, 4, 4),
        ]);
        let report = StructureValidator::new().validate(&node);
        let overlaps: Vec<_> = report.overlaps().collect();
        assert_eq!(overlaps.len(), 2);
        assert_eq!(overlaps[1].path, "Sample.b");
        assert_eq!(
            overlaps[1].kind,
            IssueKind::Overlap {
                other: "wide".to_string(),
                other_offset: 0
            }
        );
    }

    #[test]
    fn test_detects_misalignment() {
        let node = root(vec![child("x", Category::SimpleField, 6, 4, 4)]);
        let report = StructureValidator::new().validate(&node);
        let misaligned: Vec<_> = report.misaligned().collect();
        assert_eq!(misaligned.len(), 1);
        assert_eq!(misaligned[0].to_string(), "Sample.x at offset 6 is not aligned to 4");
    }

    #[test]
    fn test_bitfields_in_one_unit_and_bit_ranges_are_skipped() {
        let mut low = child("low", Category::Bitfield, 4, 4, 4);
        low.push(Node::bitfield_extra(0, 3));
        let mut high = child("high", Category::Bitfield, 4, 4, 4);
        high.push(Node::bitfield_extra(3, 5));
        let node = root(vec![low, high]);
        assert!(StructureValidator::new().validate(&node).is_valid());
    }

    #[test]
    fn test_union_members_may_overlap() {
        let mut node = root(vec![
            child("i", Category::SimpleField, 0, 4, 4),
            child("d", Category::SimpleField, 0, 8, 8),
        ]);
        node.type_name = "union Value".to_string();
        assert!(StructureValidator::new().validate(&node).is_valid());
    }
}
