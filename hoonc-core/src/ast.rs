//! Abstract syntax tree shared by the parser, reducer, printer and
//! code generator.
//!
//! The same node type describes both the raw tree the parser produces
//! and the canonical tree the reducer leaves behind; the difference is
//! only in which runes appear.

use crate::span::Span;

/// A node with the source span it was parsed (or rewritten) from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `$`: the "any" mold, or the enclosing gate when used as a value.
    Buc,
    /// `@`: the atom mold.
    Pat,
    /// `.`: the whole subject.
    Dot,
    /// A named reference.
    Face(String),
    /// `name=value`, used for typed faces and sample molds.
    FacedValue { face: String, value: Box<Node> },
    /// Numeral literal, digits kept verbatim (grouping dots included).
    Num(String),
    Rune { rune: &'static str, args: Vec<Node> },
    /// Head/tail pair; sequences nest to the right.
    Cell { head: Box<Node>, tail: Box<Node> },
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn face(name: impl Into<String>, span: Span) -> Self {
        Node::new(NodeKind::Face(name.into()), span)
    }

    pub fn num(digits: impl Into<String>, span: Span) -> Self {
        Node::new(NodeKind::Num(digits.into()), span)
    }

    pub fn rune(rune: &'static str, args: Vec<Node>, span: Span) -> Self {
        Node::new(NodeKind::Rune { rune, args }, span)
    }

    pub fn cell(head: Node, tail: Node, span: Span) -> Self {
        Node::new(
            NodeKind::Cell {
                head: Box::new(head),
                tail: Box::new(tail),
            },
            span,
        )
    }

    pub fn faced(face: impl Into<String>, value: Node, span: Span) -> Self {
        Node::new(
            NodeKind::FacedValue {
                face: face.into(),
                value: Box::new(value),
            },
            span,
        )
    }

    /// Name of a bare face, if this node is one.
    pub fn as_face(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Face(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_bare_faces_are_faces() {
        let span = Span::default();
        let typed = Node::faced("acc", Node::new(NodeKind::Pat, span), span);
        assert_eq!(typed.as_face(), None);
        assert_eq!(Node::face("n", span).as_face(), Some("n"));
        assert_eq!(Node::num("1", span).as_face(), None);
    }
}
