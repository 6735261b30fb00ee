//! Pattern AST

use super::class::CharClass;
use super::SyntaxFlags;

/// Zero-width assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assertion {
    /// `^`
    Start,
    /// `$`
    End,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
}

/// A node of the parsed pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Matches the empty string
    Empty,
    Literal(char),
    /// `.`: any character except line terminators
    Any,
    Class(CharClass),
    Assert(Assertion),
    /// Capture group `( ... )`, numbered from 1
    Capture { index: u32, node: Box<Node> },
    Concat(Vec<Node>),
    /// Alternatives tried left to right
    Alternate(Vec<Node>),
    Repeat {
        node: Box<Node>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    },
    /// `\n` backreference to group `n`
    Backref(u32),
    /// `(?= ... )` or `(?! ... )`
    Look { negate: bool, node: Box<Node> },
}

impl Node {
    /// Walk the tree depth first, stopping as soon as `pred` returns true.
    pub fn any(&self, pred: &mut dyn FnMut(&Node) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Node::Capture { node, .. } | Node::Repeat { node, .. } | Node::Look { node, .. } => {
                node.any(pred)
            }
            Node::Concat(nodes) | Node::Alternate(nodes) => nodes.iter().any(|n| n.any(pred)),
            _ => false,
        }
    }

    /// Capture indices defined inside this node, as an inclusive-exclusive
    /// range. `None` if the node contains no groups.
    pub fn capture_range(&self) -> Option<(u32, u32)> {
        let mut lo = u32::MAX;
        let mut hi = 0u32;
        self.any(&mut |n| {
            if let Node::Capture { index, .. } = n {
                lo = lo.min(*index);
                hi = hi.max(*index + 1);
            }
            false
        });
        (lo < hi).then_some((lo, hi))
    }

    /// Upper estimate of the number of instructions this node lowers to.
    pub fn lowered_size(&self) -> usize {
        match self {
            Node::Empty => 0,
            Node::Literal(_) | Node::Any | Node::Class(_) | Node::Assert(_) | Node::Backref(_) => 1,
            Node::Capture { node, .. } => node.lowered_size().saturating_add(2),
            Node::Concat(nodes) => nodes
                .iter()
                .fold(0usize, |acc, n| acc.saturating_add(n.lowered_size())),
            Node::Alternate(nodes) => nodes
                .iter()
                .fold(0usize, |acc, n| acc.saturating_add(n.lowered_size().saturating_add(2))),
            Node::Repeat { node, min, max, .. } => {
                let body = node.lowered_size().saturating_add(4);
                let copies = match max {
                    Some(max) => *max as usize,
                    None => *min as usize + 1,
                };
                body.saturating_mul(copies.max(1))
            }
            Node::Look { node, .. } => node.lowered_size().saturating_add(2),
        }
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    pub root: Node,
    /// Number of capture groups, not counting the implicit group 0
    pub capture_count: u32,
    pub flags: SyntaxFlags,
}

impl ParsedPattern {
    pub fn has_backreferences(&self) -> bool {
        self.root.any(&mut |n| matches!(n, Node::Backref(_)))
    }

    pub fn has_lookaround(&self) -> bool {
        self.root.any(&mut |n| matches!(n, Node::Look { .. }))
    }

    /// Number of capture slots: two per group including group 0
    pub fn slot_count(&self) -> usize {
        2 * (self.capture_count as usize + 1)
    }

    #[inline]
    pub fn ignore_case(&self) -> bool {
        self.flags.contains(SyntaxFlags::IGNORE_CASE)
    }

    #[inline]
    pub fn multiline(&self) -> bool {
        self.flags.contains(SyntaxFlags::MULTILINE)
    }

    #[inline]
    pub fn sticky(&self) -> bool {
        self.flags.contains(SyntaxFlags::STICKY)
    }
}
