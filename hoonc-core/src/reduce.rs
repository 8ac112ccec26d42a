//! Syntax reduction: rewrite surface runes into the canonical core.
//!
//! The structural primitives are `=/` (push a named value onto the
//! subject), `%=` (rewrite named fields and re-enter a gate) and `?:`
//! (branch). Alongside them the generator lowers a few forms directly:
//! `.+` and `.=` (nock increment and equality), `%-` (positional call),
//! `|-` (a one-armed core whose `$` arm is entered at once) and `|=`
//! (a gate). Every other supported rune is an exact rewrite into those,
//! possibly through other reducible runes. Reduction is idempotent.

use crate::ast::{Node, NodeKind};
use crate::error::CoreError;
use crate::span::Span;

/// Runes the generator lowers directly.
pub const CANONICAL: &[&str] = &["=/", "%=", "?:", ".+", ".=", "%-", "|-", "|="];

/// Face for a value pushed onto the subject without a name. `^` never
/// lexes as part of a face, so user code cannot collide with it.
pub const ANONYMOUS_SLOT: &str = "^";

/// Reserved face holding the value a face had before a batch rebinding.
pub fn previous_slot(face: &str) -> String {
    format!("{ANONYMOUS_SLOT}{face}")
}

pub fn is_canonical(rune: &str) -> bool {
    CANONICAL.contains(&rune)
}

pub fn reduce(node: Node) -> Result<Node, CoreError> {
    let span = node.span;
    match node.kind {
        NodeKind::Buc | NodeKind::Pat | NodeKind::Dot | NodeKind::Face(_) | NodeKind::Num(_) => {
            Ok(Node { kind: node.kind, span })
        }
        NodeKind::FacedValue { face, value } => Ok(Node::faced(face, reduce(*value)?, span)),
        NodeKind::Cell { head, tail } => Ok(Node::cell(reduce(*head)?, reduce(*tail)?, span)),
        NodeKind::Rune { rune, args } => reduce_rune(rune, args, span),
    }
}

fn reduce_rune(rune: &'static str, args: Vec<Node>, span: Span) -> Result<Node, CoreError> {
    if rune == "=/" {
        // Molds are erased: `=/(acc=@ 1 body)` binds `acc`.
        let [name, value, body] = take::<3>(rune, args, span)?;
        let name = match name.kind {
            NodeKind::FacedValue { face, .. } => Node::face(face, name.span),
            _ => name,
        };
        return Ok(Node::rune(
            "=/",
            vec![name, reduce(value)?, reduce(body)?],
            span,
        ));
    }
    if is_canonical(rune) {
        let args = args.into_iter().map(reduce).collect::<Result<_, _>>()?;
        return Ok(Node::rune(rune, args, span));
    }
    let rewritten = rewrite(rune, args, span)?;
    reduce(rewritten)
}

/// One rewrite step. The result may itself need further reduction.
fn rewrite(rune: &'static str, args: Vec<Node>, span: Span) -> Result<Node, CoreError> {
    let node = match rune {
        // ---------------------------------------------------------------
        // tis: subject
        // ---------------------------------------------------------------
        "=+" => {
            let [pin, body] = take::<2>(rune, args, span)?;
            match pin.kind {
                NodeKind::FacedValue { face, value } => {
                    let name = Node::face(face, pin.span);
                    Node::rune("=/", vec![name, *value, body], span)
                }
                kind => {
                    let pin = Node::new(kind, pin.span);
                    Node::rune("=/", vec![anonymous(span), pin, body], span)
                }
            }
        }
        "=-" => {
            let [body, pin] = take::<2>(rune, args, span)?;
            Node::rune("=+", vec![pin, body], span)
        }
        "=;" => {
            let [name, body, value] = take::<3>(rune, args, span)?;
            Node::rune("=/", vec![name, value, body], span)
        }
        "=|" => {
            let [mold, body] = take::<2>(rune, args, span)?;
            match mold.kind {
                NodeKind::FacedValue { face, value } => {
                    let name = Node::face(face, mold.span);
                    Node::rune("=/", vec![name, bunt(*value)?, body], span)
                }
                kind => {
                    let value = bunt(Node::new(kind, mold.span))?;
                    Node::rune("=/", vec![anonymous(span), value, body], span)
                }
            }
        }
        "=." | "=*" => {
            let [name, value, body] = take::<3>(rune, args, span)?;
            let name = expect_face(rune, name)?;
            Node::rune("=/", vec![name, value, body], span)
        }
        "=:" => rebind_many(args, span)?,
        "=?" => {
            // The branch goes outside so it stays in tail position.
            let [name, test, then, body] = take::<4>(rune, args, span)?;
            let name = expect_face(rune, name)?;
            let unchanged = body.clone();
            let changed = Node::rune("=.", vec![name, then, body], span);
            Node::rune("?:", vec![test, changed, unchanged], span)
        }

        // ---------------------------------------------------------------
        // wut: conditionals
        // ---------------------------------------------------------------
        "?." => {
            let [test, no, yes] = take::<3>(rune, args, span)?;
            Node::rune("?:", vec![test, yes, no], span)
        }

        // ---------------------------------------------------------------
        // bar: gates and traps
        // ---------------------------------------------------------------
        "|*" => {
            let [sample, body] = take::<2>(rune, args, span)?;
            Node::rune("|=", vec![sample, body], span)
        }
        "|~" => {
            let [sample, body] = take::<2>(rune, args, span)?;
            let gate = Node::rune("|=", vec![sample, body], span);
            Node::rune("^|", vec![gate], span)
        }
        "|^" => {
            if args.len() != 1 {
                return Err(CoreError::reduce(
                    span,
                    "cannot reduce |^ with additional arms",
                ));
            }
            Node::rune("|-", args, span)
        }

        // ---------------------------------------------------------------
        // cen: calls
        // ---------------------------------------------------------------
        "%+" | "%^" | "%:" => Node::rune("%-", args, span),
        "%." => {
            let [sample, gate] = take::<2>(rune, args, span)?;
            Node::rune("%-", vec![gate, sample], span)
        }
        "%_" => Node::rune("%=", args, span),
        "%~" => {
            let [arm, door, sample] = take::<3>(rune, args, span)?;
            expect_buc_arm(rune, &arm)?;
            Node::rune("%-", vec![door, sample], span)
        }
        "%*" => {
            let mut args = args.into_iter();
            let (Some(arm), Some(door)) = (args.next(), args.next()) else {
                return Err(arity_error(rune, 2, span));
            };
            expect_buc_arm(rune, &arm)?;
            let mut call = vec![anonymous(span)];
            call.extend(args);
            let call = Node::rune("%=", call, span);
            Node::rune("=/", vec![anonymous(span), door, call], span)
        }

        // ---------------------------------------------------------------
        // col: cells
        // ---------------------------------------------------------------
        ":-" | ":+" | ":^" | ":*" => {
            if args.is_empty() {
                return Err(arity_error(rune, 1, span));
            }
            nest_cells(args, span)
        }
        ":_" => {
            let [tail, head] = take::<2>(rune, args, span)?;
            Node::rune(":-", vec![head, tail], span)
        }

        // ---------------------------------------------------------------
        // ket: casts are erased
        // ---------------------------------------------------------------
        "^-" | "^+" => {
            let [_, value] = take::<2>(rune, args, span)?;
            value
        }
        "^|" | "^&" | "^?" | "^~" => {
            let [value] = take::<1>(rune, args, span)?;
            value
        }
        "^*" => {
            let [mold] = take::<1>(rune, args, span)?;
            bunt(mold)?
        }
        "^=" => {
            let [name, value] = take::<2>(rune, args, span)?;
            let name = expect_face(rune, name)?;
            let face = name.as_face().unwrap_or_default().to_string();
            Node::faced(face, value, span)
        }

        // ---------------------------------------------------------------
        // sig: hints are dropped
        // ---------------------------------------------------------------
        "~&" | "~|" | "~_" | "~$" | "~<" | "~>" | "~/" | "~!" => {
            let [_, body] = take::<2>(rune, args, span)?;
            body
        }
        "~+" => {
            let [body] = take::<1>(rune, args, span)?;
            body
        }
        "~?" => {
            let [_, _, body] = take::<3>(rune, args, span)?;
            body
        }

        // ---------------------------------------------------------------
        // zap: debugging toggles
        // ---------------------------------------------------------------
        "!:" | "!." => {
            let [body] = take::<1>(rune, args, span)?;
            body
        }

        other => {
            return Err(CoreError::reduce(
                span,
                format!("no reduction for rune {other}"),
            ));
        }
    };
    Ok(node)
}

/// `=:(a x, b y body)`: every value is computed against the old subject,
/// so each is parked in a reserved slot before any face is rebound.
fn rebind_many(mut args: Vec<Node>, span: Span) -> Result<Node, CoreError> {
    let Some(body) = args.pop() else {
        return Err(arity_error("=:", 1, span));
    };
    if args.len() % 2 != 0 {
        return Err(CoreError::reduce(span, "=: needs name/value pairs"));
    }
    let mut pairs = Vec::with_capacity(args.len() / 2);
    let mut iter = args.into_iter();
    while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((expect_face("=:", name)?, value));
    }

    match pairs.len() {
        0 => Ok(body),
        1 => {
            let (name, value) = pairs.remove(0);
            Ok(Node::rune("=.", vec![name, value, body], span))
        }
        _ => {
            let faces: Vec<(String, Span)> = pairs
                .iter()
                .map(|(name, _)| (name.as_face().unwrap_or_default().to_string(), name.span))
                .collect();
            let mut node = body;
            for (face, face_span) in faces.iter().rev() {
                let restore = Node::face(previous_slot(face), *face_span);
                node = Node::rune(
                    "=/",
                    vec![Node::face(face.clone(), *face_span), restore, node],
                    span,
                );
            }
            for (name, value) in pairs.into_iter().rev() {
                let slot = previous_slot(name.as_face().unwrap_or_default());
                node = Node::rune("=/", vec![Node::face(slot, name.span), value, node], span);
            }
            Ok(node)
        }
    }
}

/// Default value of a mold.
fn bunt(mold: Node) -> Result<Node, CoreError> {
    let span = mold.span;
    match mold.kind {
        NodeKind::Pat | NodeKind::Buc => Ok(Node::num("0", span)),
        NodeKind::FacedValue { face, value } => Ok(Node::faced(face, bunt(*value)?, span)),
        NodeKind::Cell { head, tail } => Ok(Node::cell(bunt(*head)?, bunt(*tail)?, span)),
        kind => Err(CoreError::reduce(
            span,
            format!("cannot take the default value of {}", Node::new(kind, span)),
        )),
    }
}

fn nest_cells(mut items: Vec<Node>, span: Span) -> Node {
    let mut node = items.pop().unwrap_or_else(|| Node::num("0", span));
    while let Some(head) = items.pop() {
        node = Node::cell(head, node, span);
    }
    node
}

fn anonymous(span: Span) -> Node {
    Node::face(ANONYMOUS_SLOT, span)
}

fn expect_face(rune: &str, node: Node) -> Result<Node, CoreError> {
    match node.kind {
        NodeKind::Face(_) => Ok(node),
        NodeKind::FacedValue { face, .. } => Ok(Node::face(face, node.span)),
        _ => Err(CoreError::reduce(
            node.span,
            format!("{rune} expects a face, found {node}"),
        )),
    }
}

fn expect_buc_arm(rune: &str, arm: &Node) -> Result<(), CoreError> {
    if matches!(arm.kind, NodeKind::Buc) {
        return Ok(());
    }
    Err(CoreError::reduce(
        arm.span,
        format!("{rune} can only reduce calls to the $ arm, found {arm}"),
    ))
}

fn arity_error(rune: &str, expected: usize, span: Span) -> CoreError {
    CoreError::reduce(
        span,
        format!("{rune} expects at least {expected} arguments"),
    )
}

fn take<const N: usize>(
    rune: &str,
    args: Vec<Node>,
    span: Span,
) -> Result<[Node; N], CoreError> {
    let found = args.len();
    args.try_into().map_err(|_| {
        CoreError::reduce(
            span,
            format!("{rune} expects {N} arguments, found {found}"),
        )
    })
}
