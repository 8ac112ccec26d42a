//! Recursive-descent parser for wide and tall Hoon forms.
//!
//! The parser pulls tokens from the lexer one at a time. Comments and
//! runs of separators are folded into a single separator token before
//! the grammar sees them, so a comment anywhere a gap is allowed
//! behaves like a gap. Any mismatch is fatal: there is no recovery.

use crate::ast::{Node, NodeKind};
use crate::error::CoreError;
use crate::grammar::{self, LOWEST_PRECEDENCE, RuneEntry, Tail};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parse exactly one expression, with optional surrounding separators.
pub fn parse(source: &str) -> Result<Node, CoreError> {
    let mut parser = Parser::new(source)?;
    parser.skip_separators()?;
    let node = parser.parse_expr()?;
    parser.skip_separators()?;
    if parser.current.kind != TokenKind::Eof {
        return Err(CoreError::parse(
            parser.current.span,
            format!("unexpected trailing input {:?}", parser.current.text),
        ));
    }
    Ok(node)
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    /// Raw token read past the end of a separator run.
    pending: Option<Token<'src>>,
    /// End offset of the last consumed token.
    prev_end: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self, CoreError> {
        let mut lexer = Lexer::new(source);
        let first = lexer.next_token();
        let mut parser = Parser {
            lexer,
            current: first,
            pending: None,
            prev_end: 0,
        };
        parser.current = parser.fold(first)?;
        Ok(parser)
    }

    fn raw(&mut self) -> Token<'src> {
        self.pending
            .take()
            .unwrap_or_else(|| self.lexer.next_token())
    }

    /// Merge a run of separators and comments starting at `first` into
    /// one separator. A lone single space stays an `Ace`.
    fn fold(&mut self, first: Token<'src>) -> Result<Token<'src>, CoreError> {
        match first.kind {
            TokenKind::Illegal => Err(CoreError::LexError {
                span: first.span,
                literal: first.text.to_string(),
            }),
            TokenKind::Ace | TokenKind::Gap | TokenKind::Comment => {
                let mut folded = first;
                let mut count = 1;
                loop {
                    let next = self.raw();
                    if matches!(
                        next.kind,
                        TokenKind::Ace | TokenKind::Gap | TokenKind::Comment
                    ) {
                        folded.span = folded.span.merge(next.span);
                        count += 1;
                    } else {
                        self.pending = Some(next);
                        break;
                    }
                }
                if count > 1 || first.kind == TokenKind::Comment {
                    folded.kind = TokenKind::Gap;
                }
                Ok(folded)
            }
            _ => Ok(first),
        }
    }

    fn bump(&mut self) -> Result<Token<'src>, CoreError> {
        let token = self.current;
        self.prev_end = token.span.end;
        let next = self.raw();
        self.current = self.fold(next)?;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, CoreError> {
        if self.current.kind == kind {
            return self.bump();
        }
        Err(CoreError::parse(
            self.current.span,
            format!("expected {}, found {}", kind, self.describe_current()),
        ))
    }

    fn expect_gap(&mut self) -> Result<(), CoreError> {
        match self.current.kind {
            TokenKind::Gap => self.bump().map(|_| ()),
            TokenKind::Ace => Err(CoreError::parse(
                self.current.span,
                "expected a gap (two spaces or a newline), found a single space",
            )),
            _ => self.expect(TokenKind::Gap).map(|_| ()),
        }
    }

    fn skip_separators(&mut self) -> Result<(), CoreError> {
        while self.current.kind.is_separator() {
            self.bump()?;
        }
        Ok(())
    }

    fn describe_current(&self) -> String {
        match self.current.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Face | TokenKind::Num | TokenKind::Rune => {
                format!("{} {:?}", self.current.kind, self.current.text)
            }
            kind => kind.to_string(),
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end)
    }

    pub fn parse_expr(&mut self) -> Result<Node, CoreError> {
        self.parse_binary(LOWEST_PRECEDENCE)
    }

    /// Precedence climbing over the `:` and `=` infix operators. The right
    /// operand binds at a strictly higher level, so both associate left.
    fn parse_binary(&mut self, min: u8) -> Result<Node, CoreError> {
        let start = self.current.span.start;
        let mut node = self.parse_unary()?;
        loop {
            let op = self.current;
            let Some(prec) = grammar::precedence(op.kind) else {
                break;
            };
            if prec < min {
                break;
            }
            self.bump()?;
            let rhs = self.parse_binary(prec + 1)?;
            let span = self.span_from(start);
            node = match op.kind {
                TokenKind::Col => Node::rune("=<", vec![node, rhs], span),
                TokenKind::Tis => match node.kind {
                    NodeKind::Face(name) => Node::faced(name, rhs, span),
                    _ => {
                        return Err(CoreError::parse(
                            op.span,
                            "left side of `=` must be a face",
                        ));
                    }
                },
                _ => unreachable!("precedence table only lists `:` and `=`"),
            };
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, CoreError> {
        let token = self.bump()?;
        let start = token.span.start;
        match token.kind {
            TokenKind::Face => {
                let target = Node::face(token.text, token.span);
                self.parse_gate_call(target, start)
            }
            TokenKind::Buc => {
                let target = Node::new(NodeKind::Buc, token.span);
                self.parse_gate_call(target, start)
            }
            TokenKind::Num => Ok(Node::num(token.text, token.span)),
            TokenKind::Pat => Ok(Node::new(NodeKind::Pat, token.span)),
            TokenKind::Dot => Ok(Node::new(NodeKind::Dot, token.span)),
            TokenKind::Rune => self.parse_rune(token),
            TokenKind::Lus => {
                self.expect(TokenKind::Pal)?;
                let operand = self.parse_expr()?;
                self.expect(TokenKind::Par)?;
                Ok(Node::rune(".+", vec![operand], self.span_from(start)))
            }
            TokenKind::Tis => {
                self.expect(TokenKind::Pal)?;
                let lhs = self.parse_expr()?;
                self.expect(TokenKind::Ace)?;
                let rhs = self.parse_expr()?;
                self.expect(TokenKind::Par)?;
                Ok(Node::rune(".=", vec![lhs, rhs], self.span_from(start)))
            }
            TokenKind::Pal => {
                let args = self.parse_wide_list()?;
                Ok(Node::rune("%-", args, self.span_from(start)))
            }
            TokenKind::Sel => {
                let node = self.parse_cons()?;
                self.expect(TokenKind::Ser)?;
                Ok(node)
            }
            TokenKind::Eof => Err(CoreError::parse(token.span, "unexpected end of input")),
            kind => Err(CoreError::parse(
                token.span,
                format!("unexpected token {kind} ({:?})", token.text),
            )),
        }
    }

    /// `face(a 1, b 2)` and `$(a 1)` are sugar for `%=`.
    fn parse_gate_call(&mut self, target: Node, start: usize) -> Result<Node, CoreError> {
        if self.current.kind != TokenKind::Pal {
            return Ok(target);
        }
        self.bump()?;
        let mut args = vec![target];
        args.extend(self.parse_wide_pairs()?);
        Ok(Node::rune("%=", args, self.span_from(start)))
    }

    /// `[a b c]` → `[a [b c]]`. The opening bracket is already consumed.
    fn parse_cons(&mut self) -> Result<Node, CoreError> {
        let start = self.current.span.start;
        let head = self.parse_expr()?;
        if self.current.kind == TokenKind::Ser {
            return Ok(head);
        }
        self.expect(TokenKind::Ace)?;
        let tail = self.parse_cons()?;
        Ok(Node::cell(head, tail, self.span_from(start)))
    }

    /// Space-separated expressions up to and including `)`.
    fn parse_wide_list(&mut self) -> Result<Vec<Node>, CoreError> {
        let mut nodes = Vec::new();
        loop {
            nodes.push(self.parse_expr()?);
            if self.current.kind == TokenKind::Par {
                self.bump()?;
                return Ok(nodes);
            }
            self.expect(TokenKind::Ace)?;
        }
    }

    /// `name value, name value)`; may be empty.
    fn parse_wide_pairs(&mut self) -> Result<Vec<Node>, CoreError> {
        let mut nodes = Vec::new();
        if self.current.kind == TokenKind::Par {
            self.bump()?;
            return Ok(nodes);
        }
        loop {
            nodes.push(self.parse_expr()?);
            self.expect(TokenKind::Ace)?;
            nodes.push(self.parse_expr()?);
            if self.current.kind == TokenKind::Par {
                self.bump()?;
                return Ok(nodes);
            }
            self.expect(TokenKind::Com)?;
            self.expect(TokenKind::Ace)?;
        }
    }

    fn parse_rune(&mut self, token: Token<'src>) -> Result<Node, CoreError> {
        let entry = grammar::lookup(token.text).ok_or_else(|| CoreError::UnknownRune {
            span: token.span,
            rune: token.text.to_string(),
        })?;
        let args = if self.current.kind == TokenKind::Pal {
            self.parse_rune_wide(entry, token.span)?
        } else {
            self.parse_rune_tall(entry, token.span)?
        };
        Ok(Node::rune(entry.rune, args, self.span_from(token.span.start)))
    }

    fn parse_rune_wide(
        &mut self,
        entry: &RuneEntry,
        rune_span: Span,
    ) -> Result<Vec<Node>, CoreError> {
        if entry.tail == Tail::Arms {
            return Err(CoreError::parse(
                rune_span,
                format!("rune {} has no wide form", entry.rune),
            ));
        }
        self.expect(TokenKind::Pal)?;
        let args = match entry.tail {
            Tail::Pairs => self.parse_wide_jogging(entry)?,
            _ if self.current.kind == TokenKind::Par => {
                self.bump()?;
                Vec::new()
            }
            _ => self.parse_wide_list()?,
        };
        if !entry.accepts(args.len()) {
            let expected = match entry.tail {
                Tail::Fixed => format!("{}", entry.args),
                _ => format!("at least {}", entry.args + entry.post),
            };
            return Err(CoreError::parse(
                rune_span,
                format!(
                    "rune {} expects {} arguments, found {}",
                    entry.rune,
                    expected,
                    args.len()
                ),
            ));
        }
        Ok(args)
    }

    /// Fixed arguments, then `name value` pairs separated by `", "`, then
    /// any trailing post arguments.
    fn parse_wide_jogging(&mut self, entry: &RuneEntry) -> Result<Vec<Node>, CoreError> {
        let mut args = Vec::new();
        for i in 0..entry.args {
            if i > 0 {
                self.expect(TokenKind::Ace)?;
            }
            args.push(self.parse_expr()?);
        }
        if self.current.kind == TokenKind::Par {
            self.bump()?;
            return Ok(args);
        }
        if entry.args > 0 {
            self.expect(TokenKind::Ace)?;
        }
        loop {
            args.push(self.parse_expr()?);
            self.expect(TokenKind::Ace)?;
            args.push(self.parse_expr()?);
            match self.current.kind {
                TokenKind::Par => {
                    self.bump()?;
                    return Ok(args);
                }
                TokenKind::Com => {
                    self.bump()?;
                    self.expect(TokenKind::Ace)?;
                }
                TokenKind::Ace if entry.post > 0 => {
                    self.bump()?;
                    args.extend(self.parse_wide_list()?);
                    return Ok(args);
                }
                _ => {
                    return Err(CoreError::parse(
                        self.current.span,
                        format!("expected `,` or `)`, found {}", self.describe_current()),
                    ));
                }
            }
        }
    }

    fn parse_rune_tall(
        &mut self,
        entry: &RuneEntry,
        rune_span: Span,
    ) -> Result<Vec<Node>, CoreError> {
        let mut args = Vec::with_capacity(entry.args);
        for _ in 0..entry.args {
            self.expect_gap()?;
            args.push(self.parse_expr()?);
        }
        match entry.tail {
            Tail::Fixed => {}
            Tail::Pairs | Tail::List => {
                let items = self.parse_tall_until(TokenKind::TisTis, entry, rune_span)?;
                if entry.tail == Tail::Pairs && items.len() % 2 != 0 {
                    return Err(CoreError::parse(
                        rune_span,
                        format!("rune {} needs name/value pairs", entry.rune),
                    ));
                }
                args.extend(items);
            }
            Tail::Arms => {
                args.extend(self.parse_tall_until(TokenKind::HepHep, entry, rune_span)?);
            }
        }
        for _ in 0..entry.post {
            self.expect_gap()?;
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    /// Gap-separated items until `stop`.
    fn parse_tall_until(
        &mut self,
        stop: TokenKind,
        entry: &RuneEntry,
        rune_span: Span,
    ) -> Result<Vec<Node>, CoreError> {
        let unterminated = || {
            CoreError::parse(
                rune_span,
                format!(
                    "unterminated jogging list for {}: expected {}",
                    entry.rune, stop
                ),
            )
        };
        let mut items = Vec::new();
        loop {
            if self.current.kind == TokenKind::Eof {
                return Err(unterminated());
            }
            self.expect_gap()?;
            if self.current.kind == stop {
                self.bump()?;
                return Ok(items);
            }
            if self.current.kind == TokenKind::Eof {
                return Err(unterminated());
            }
            items.push(self.parse_expr()?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::print;

    fn round_trip(source: &str) -> String {
        print(&parse(source).expect("parse"))
    }

    #[test]
    fn cells_nest_right() {
        assert_eq!(round_trip("[1 2 3]"), "[1 [2 3]]");
    }

    #[test]
    fn tall_tisfas() {
        assert_eq!(round_trip("=/  n  1\n                   n"), "=/(n 1 n)");
    }

    #[test]
    fn conditional_with_sugar() {
        let source = "=/  a  2
                   =/  b  7
                   ?:  =(a +(b))
                     a
                   b";
        assert_eq!(round_trip(source), "=/(a 2 =/(b 7 ?:(.=(a .+(b)) a b)))");
    }

    #[test]
    fn col_infix_becomes_tisgal() {
        let source = "=/  n  1
                   [. .]:n";
        assert_eq!(round_trip(source), "=/(n 1 =<([. .] n))");
    }

    #[test]
    fn trap_with_buc_call() {
        let source = "=/  n  0
                   |-
                   ?:  =(n 5)
                     n
                   $(n +(n))";
        assert_eq!(round_trip(source), "=/(n 0 |-(?:(.=(n 5) n %=($ n .+(n)))))");
    }

    #[test]
    fn gate_with_named_call() {
        let source = "|=  a=@
                   =/  b  2
                   =/  f  |=(@ 7)
                   (f(a 2, b 3))";
        assert_eq!(
            round_trip(source),
            "|=(a=@ =/(b 2 =/(f |=(@ 7) (%=(f a 2, b 3)))))"
        );
    }

    #[test]
    fn tall_centis_jogging() {
        let source = "|=  n=@
                   =/  acc=@  1
                   |-
                   ?:  =(n 0)  acc
                   %=  $
                     n  (dec n)
                     acc  (mul acc n)
                   ==";
        assert_eq!(
            round_trip(source),
            "|=(n=@ =/(acc=@ 1 |-(?:(.=(n 0) acc %=($ n (dec n), acc (mul acc n))))))"
        );
    }

    #[test]
    fn core_with_arms() {
        let source = "=/  x  58
                   |%
                   ++  n  (add 42 x)
                   ++  g  |=  b=@
                          (add b n)
                   --";
        assert_eq!(
            round_trip(source),
            "=/(x 58 |%(++(n (add 42 x)) ++(g |=(b=@ (add b n)))))"
        );
    }

    #[test]
    fn wide_jogging_with_post_argument() {
        assert_eq!(round_trip("=:(a 1, b 2 a)"), "=:(a 1, b 2 a)");
        let tall = "=:  a  1
                     b  2
                   ==
                   a";
        assert_eq!(round_trip(tall), "=:(a 1, b 2 a)");
    }

    #[test]
    fn wide_list_runes() {
        assert_eq!(round_trip(":~(1 2 3)"), ":~(1 2 3)");
        assert_eq!(round_trip(":*(1 2)"), ":*(1 2)");
        assert_eq!(round_trip("%:(f 1 2)"), "%:(f 1 2)");
    }

    #[test]
    fn tall_list_rune() {
        let source = ":*  1
                      2
                   ==";
        assert_eq!(round_trip(source), ":*(1 2)");
    }

    #[test]
    fn comments_fold_into_gaps() {
        let source = ":: leading\n=/  n  1  :: bind\n  :: between\nn  :: trailing";
        assert_eq!(round_trip(source), "=/(n 1 n)");
    }

    #[test]
    fn rejects_unknown_rune() {
        let err = parse("=/  n  1\n  ?:(=(n 1) n !!)").unwrap_err();
        match err {
            CoreError::UnknownRune { rune, span } => {
                assert_eq!(rune, "!!");
                assert_eq!(span, Span::new(23, 25));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_wide_arity_mismatch() {
        let err = parse("=/(n 1)").unwrap_err();
        assert!(matches!(err, CoreError::ParseError { .. }));
        assert!(err.to_string().contains("expects 3 arguments, found 2"));
    }

    #[test]
    fn rejects_unterminated_jogging() {
        let source = "%=  $\n  n  1\n";
        let err = parse(source).unwrap_err();
        assert!(err.to_string().contains("unterminated jogging list for %="));
    }

    #[test]
    fn rejects_odd_pairs() {
        let source = "%=  $\n  n  1\n  m\n==";
        let err = parse(source).unwrap_err();
        assert!(err.to_string().contains("name/value pairs"));
    }

    #[test]
    fn rejects_single_space_in_tall_form() {
        let err = parse("=/ n 1 n").unwrap_err();
        assert!(err.to_string().contains("single space"));
    }

    #[test]
    fn rejects_illegal_character() {
        let err = parse("=/  n  \t1").unwrap_err();
        assert!(matches!(err, CoreError::LexError { .. }));
        assert_eq!(err.span(), Some(Span::new(7, 8)));
    }

    #[test]
    fn rejects_trailing_input() {
        let err = parse("1  2").unwrap_err();
        assert!(err.to_string().contains("unexpected trailing input"));
    }

    #[test]
    fn rejects_faced_value_without_face() {
        let err = parse("1=2").unwrap_err();
        assert!(err.to_string().contains("must be a face"));
    }

    #[test]
    fn arms_have_no_wide_form() {
        let err = parse("|%(++(a 1))").unwrap_err();
        assert!(err.to_string().contains("no wide form"));
    }

    #[test]
    fn spans_cover_source() {
        let node = parse("  =/(n 1 n)  ").unwrap();
        assert_eq!(node.span, Span::new(2, 11));
    }

    #[test]
    fn every_wide_rune_round_trips() {
        for entry in crate::grammar::RUNE_TABLE {
            let Some(source) = entry.sample_wide() else {
                continue;
            };
            let printed = round_trip(&source);
            let expected = match source.strip_prefix("%-") {
                Some(call) => call,
                None => source.as_str(),
            };
            assert_eq!(printed, expected, "{} does not round-trip", entry.rune);
        }
    }
}
