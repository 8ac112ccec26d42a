//! Canonical text rendering of AST nodes.
//!
//! Rune applications always print in wide form, so printing a parsed
//! tall-form program yields its one-line equivalent.

use std::fmt;

use crate::ast::{Node, NodeKind};
use crate::grammar::{self, Tail};

pub fn print(node: &Node) -> String {
    node.to_string()
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Buc => f.write_str("$"),
            NodeKind::Pat => f.write_str("@"),
            NodeKind::Dot => f.write_str("."),
            NodeKind::Face(name) => f.write_str(name),
            NodeKind::FacedValue { face, value } => write!(f, "{face}={value}"),
            NodeKind::Num(digits) => f.write_str(digits),
            NodeKind::Cell { head, tail } => write!(f, "[{head} {tail}]"),
            NodeKind::Rune { rune: "%-", args } => {
                f.write_str("(")?;
                write_spaced(f, args)?;
                f.write_str(")")
            }
            NodeKind::Rune { rune, args } => {
                f.write_str(rune)?;
                f.write_str("(")?;
                match grammar::lookup(rune) {
                    Some(entry) if entry.tail == Tail::Pairs => {
                        write_pairs(f, args, entry.args, entry.post)?
                    }
                    _ => write_spaced(f, args)?,
                }
                f.write_str(")")
            }
        }
    }
}

fn write_spaced(f: &mut fmt::Formatter<'_>, args: &[Node]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// `fixed... name value, name value post...`
fn write_pairs(
    f: &mut fmt::Formatter<'_>,
    args: &[Node],
    fixed: usize,
    post: usize,
) -> fmt::Result {
    let fixed = fixed.min(args.len());
    let post_start = args.len().saturating_sub(post).max(fixed);
    let (head, rest) = args.split_at(fixed);
    let (pairs, tail) = rest.split_at(post_start - fixed);

    write_spaced(f, head)?;
    for (i, pair) in pairs.chunks(2).enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        if i > 0 || !head.is_empty() {
            f.write_str(" ")?;
        }
        write_spaced(f, pair)?;
    }
    for arg in tail {
        write!(f, " {arg}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn face(name: &str) -> Node {
        Node::face(name, Span::default())
    }

    fn num(digits: &str) -> Node {
        Node::num(digits, Span::default())
    }

    fn rune(name: &'static str, args: Vec<Node>) -> Node {
        Node::rune(name, args, Span::default())
    }

    #[test]
    fn prints_leaves() {
        assert_eq!(print(&Node::new(NodeKind::Buc, Span::default())), "$");
        assert_eq!(print(&Node::new(NodeKind::Pat, Span::default())), "@");
        assert_eq!(print(&Node::new(NodeKind::Dot, Span::default())), ".");
        assert_eq!(print(&num("1.000")), "1.000");
        let typed = Node::faced("a", Node::new(NodeKind::Pat, Span::default()), Span::default());
        assert_eq!(print(&typed), "a=@");
    }

    #[test]
    fn prints_cells_right_nested() {
        let cell = Node::cell(
            num("1"),
            Node::cell(num("2"), num("3"), Span::default()),
            Span::default(),
        );
        assert_eq!(print(&cell), "[1 [2 3]]");
    }

    #[test]
    fn prints_generic_runes_wide() {
        let node = rune("=/", vec![face("n"), num("1"), face("n")]);
        assert_eq!(print(&node), "=/(n 1 n)");
    }

    #[test]
    fn prints_calls_without_rune() {
        let node = rune("%-", vec![face("dec"), face("n")]);
        assert_eq!(print(&node), "(dec n)");
    }

    #[test]
    fn prints_jogging_pairs() {
        let node = rune(
            "%=",
            vec![
                Node::new(NodeKind::Buc, Span::default()),
                face("n"),
                num("1"),
                face("acc"),
                num("2"),
            ],
        );
        assert_eq!(print(&node), "%=($ n 1, acc 2)");

        let empty = rune("%=", vec![face("f")]);
        assert_eq!(print(&empty), "%=(f)");
    }

    #[test]
    fn prints_post_arguments_after_pairs() {
        let node = rune("=:", vec![face("a"), num("1"), face("b"), num("2"), face("a")]);
        assert_eq!(print(&node), "=:(a 1, b 2 a)");
    }
}
