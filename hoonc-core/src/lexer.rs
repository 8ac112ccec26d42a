//! Lexer for Hoon source.
//!
//! The lexer is lazy: each call to [`Lexer::next_token`] makes one
//! character-class decision and returns one token. It never fails;
//! characters it cannot classify come back as [`TokenKind::Illegal`]
//! tokens and the parser decides what to do with them.

use crate::span::Span;
use crate::token::{self, Token, TokenKind};

pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    index: usize,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            index: 0,
            finished: false,
        }
    }

    /// Scan the next token. Once the input is exhausted every call
    /// returns an `Eof` token with an empty literal.
    pub fn next_token(&mut self) -> Token<'src> {
        let start = self.index;
        let Some(ch) = self.peek_char() else {
            return self.token(TokenKind::Eof, start);
        };

        match ch {
            b' ' | b'\n' => self.lex_separator(start),
            b'a'..=b'z' => {
                self.consume_while(is_kebab);
                self.token(TokenKind::Face, start)
            }
            b'0'..=b'9' => {
                self.consume_while(is_numeral);
                self.token(TokenKind::Num, start)
            }
            _ => self.lex_symbol(ch, start),
        }
    }

    fn lex_separator(&mut self, start: usize) -> Token<'src> {
        self.consume_while(|ch| ch == b' ' || ch == b'\n');
        let kind = if &self.source[start..self.index] == " " {
            TokenKind::Ace
        } else {
            TokenKind::Gap
        };
        self.token(kind, start)
    }

    fn lex_symbol(&mut self, ch: u8, start: usize) -> Token<'src> {
        if let Some(next) = self.peek_next() {
            if ch == b':' && next == b':' {
                self.consume_while(|ch| ch != b'\n');
                return self.token(TokenKind::Comment, start);
            }
            if token::rune(ch, next).is_some() {
                self.index += 2;
                return self.token(TokenKind::Rune, start);
            }
            if let Some(kind) = TokenKind::terminator(ch, next) {
                self.index += 2;
                return self.token(kind, start);
            }
        }

        if let Some(kind) = TokenKind::punctuation(ch) {
            self.index += 1;
            return self.token(kind, start);
        }

        // Always make progress, even over multi-byte characters.
        let width = self.source[start..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        self.index += width;
        self.token(TokenKind::Illegal, start)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'src> {
        Token {
            kind,
            text: &self.source[start..self.index],
            span: Span::new(start, self.index),
        }
    }

    fn consume_while(&mut self, pred: impl Fn(u8) -> bool) {
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.index += 1;
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }
}

/// Yields every token up to and including the first `Eof`.
impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.kind == TokenKind::Eof;
        Some(token)
    }
}

/// Lex a whole source string eagerly. Mostly useful for tooling and tests.
pub fn lex(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).collect()
}

fn is_kebab(ch: u8) -> bool {
    ch == b'-' || ch.is_ascii_lowercase()
}

fn is_numeral(ch: u8) -> bool {
    ch == b'.' || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != Eof)
            .collect()
    }

    #[test]
    fn scans_wide_equality() {
        assert_eq!(
            kinds("=(a +(b))"),
            vec![Tis, Pal, Face, Ace, Lus, Pal, Face, Par, Par]
        );
    }

    #[test]
    fn scans_tall_form_with_comment() {
        let source = "=/  n  1\n                  [. .]:n  :: dup";
        assert_eq!(
            kinds(source),
            vec![
                Rune, Gap, Face, Gap, Num, Gap, Sel, Dot, Ace, Dot, Ser, Col, Face, Gap, Comment
            ]
        );
        let tokens = lex(source);
        let comment = tokens.iter().find(|t| t.kind == Comment).unwrap();
        assert_eq!(comment.text, ":: dup");
    }

    #[test]
    fn scans_jogging_and_terminator() {
        let source = "|=  n=@
                   =/  acc=@  1
                   |-
                   ?:  =(n 0)  acc
                   %=  $
                     n  (dec n)
                     acc  (mul acc n)
                   ==";
        assert_eq!(
            kinds(source),
            vec![
                Rune, Gap, Face, Tis, Pat, Gap, //
                Rune, Gap, Face, Tis, Pat, Gap, Num, Gap, //
                Rune, Gap, //
                Rune, Gap, Tis, Pal, Face, Ace, Num, Par, Gap, Face, Gap, //
                Rune, Gap, Buc, Gap, //
                Face, Gap, Pal, Face, Ace, Face, Par, Gap, //
                Face, Gap, Pal, Face, Ace, Face, Ace, Face, Par, Gap, //
                TisTis,
            ]
        );
    }

    #[test]
    fn keeps_literals() {
        let tokens = lex("=/  foo-bar  1.000");
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["=/", "  ", "foo-bar", "  ", "1.000", ""]);
        assert_eq!(tokens[2].span, Span::new(4, 11));
    }

    #[test]
    fn distinguishes_terminators() {
        assert_eq!(kinds("-- =="), vec![HepHep, Ace, TisTis]);
    }

    #[test]
    fn illegal_characters_become_tokens() {
        let tokens = lex("a\tb");
        assert_eq!(tokens[1].kind, Illegal);
        assert_eq!(tokens[1].text, "\t");
        assert_eq!(tokens[2].kind, Face);

        let tokens = lex("λ");
        assert_eq!(tokens[0].kind, Illegal);
        assert_eq!(tokens[0].text, "λ");
        assert_eq!(tokens[1].kind, Eof);
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, Eof);
        assert_eq!(lexer.next_token().kind, Eof);
        assert_eq!(lexer.next_token().text, "");
    }

    #[test]
    fn iterator_stops_after_eof() {
        let tokens: Vec<_> = Lexer::new("1").collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, Eof);
    }
}
