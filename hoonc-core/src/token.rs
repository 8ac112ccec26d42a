//! Token kinds and the character-level tables the lexer consults.
//!
//! Single-character punctuation uses the traditional Hoon glyph names
//! (`ace`, `gap`, `buc`, `tis`, ...). Runes are two-character sigils
//! drawn from a fixed vocabulary; whether a rune is understood by the
//! parser is a separate question answered by [`crate::grammar`].

use std::fmt;

use crate::span::Span;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Illegal,
    Eof,
    Comment,

    // Separators
    Ace, // exactly one space
    Gap, // newline, or two or more spaces

    // Punctuation
    Bar,    // |
    Bas,    // \
    Buc,    // $
    Cab,    // _
    Cen,    // %
    Col,    // :
    Com,    // ,
    Doq,    // "
    Dot,    // .
    Fas,    // /
    Gal,    // <
    Gar,    // >
    Hax,    // #
    Hep,    // -
    Kel,    // {
    Ker,    // }
    Ket,    // ^
    Lus,    // +
    Mic,    // ;
    Pal,    // (
    Pam,    // &
    Par,    // )
    Pat,    // @
    Sel,    // [
    Ser,    // ]
    Sig,    // ~
    Soq,    // '
    Tar,    // *
    Tic,    // `
    Tis,    // =
    Wut,    // ?
    Zap,    // !

    // Terminators
    HepHep, // --
    TisTis, // ==

    // Words
    Rune,
    Face,
    Num,
}

impl TokenKind {
    /// Look up a single-character punctuation token.
    pub fn punctuation(ch: u8) -> Option<TokenKind> {
        PUNCTUATION
            .iter()
            .find(|(glyph, _)| glyph.as_bytes()[0] == ch)
            .map(|(_, kind)| *kind)
    }

    /// Doubled terminator (`--` or `==`) for a character pair.
    pub fn terminator(first: u8, second: u8) -> Option<TokenKind> {
        match (first, second) {
            (b'-', b'-') => Some(TokenKind::HepHep),
            (b'=', b'=') => Some(TokenKind::TisTis),
            _ => None,
        }
    }

    pub fn is_separator(self) -> bool {
        matches!(self, TokenKind::Ace | TokenKind::Gap)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Comment => "COMMENT",
            TokenKind::Ace => "ACE",
            TokenKind::Gap => "GAP",
            TokenKind::HepHep => "--",
            TokenKind::TisTis => "==",
            TokenKind::Rune => "RUNE",
            TokenKind::Face => "FACE",
            TokenKind::Num => "NUM",
            other => PUNCTUATION
                .iter()
                .find(|(_, kind)| *kind == other)
                .map(|(glyph, _)| *glyph)
                .unwrap_or("?"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single token: its kind, the literal text consumed, and where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("|", TokenKind::Bar),
    ("\\", TokenKind::Bas),
    ("$", TokenKind::Buc),
    ("_", TokenKind::Cab),
    ("%", TokenKind::Cen),
    (":", TokenKind::Col),
    (",", TokenKind::Com),
    ("\"", TokenKind::Doq),
    (".", TokenKind::Dot),
    ("/", TokenKind::Fas),
    ("<", TokenKind::Gal),
    (">", TokenKind::Gar),
    ("#", TokenKind::Hax),
    ("-", TokenKind::Hep),
    ("{", TokenKind::Kel),
    ("}", TokenKind::Ker),
    ("^", TokenKind::Ket),
    ("+", TokenKind::Lus),
    (";", TokenKind::Mic),
    ("(", TokenKind::Pal),
    ("&", TokenKind::Pam),
    (")", TokenKind::Par),
    ("@", TokenKind::Pat),
    ("[", TokenKind::Sel),
    ("]", TokenKind::Ser),
    ("~", TokenKind::Sig),
    ("'", TokenKind::Soq),
    ("*", TokenKind::Tar),
    ("`", TokenKind::Tic),
    ("=", TokenKind::Tis),
    ("?", TokenKind::Wut),
    ("!", TokenKind::Zap),
];

/// Every two-character rune the lexer recognises, grouped by family.
pub const RUNES: &[&str] = &[
    ".^", ".+", ".*", ".=", ".?", //
    "!>", "!<", "!:", "!.", "!=", "!?", "!!", //
    "=+", "=-", "=|", "=/", "=;", "=.", "=:", "=?", "=*", "=>", "=<", "=~", "=,", "=^", //
    "?>", "?<", "?|", "?&", "?!", "?=", "?:", "?.", "?@", "?^", "?~", "?-", "?+", //
    "|_", "|%", "|:", "|.", "|-", "|?", "|^", "|~", "|=", "|*", "|@", //
    "++", "+$", "+*", "+|", //
    ":-", ":_", ":+", ":^", ":*", ":~", //
    "%~", "%-", "%.", "%+", "%^", "%:", "%=", "%_", "%*", //
    "^|", "^&", "^?", "^:", "^.", "^-", "^+", "^~", "^*", "^=", //
    "$_", "$%", "$:", "$?", "$<", "$>", "$-", "$@", "$^", "$~", "$=", //
    ";:", ";+", ";/", ";*", ";=", ";;", ";~", //
    "~>", "~|", "~_", "~$", "~%", "~<", "~+", "~/", "~&", "~?", "~!", "~=",
];

/// Static rune literal for a character pair, if it is in the vocabulary.
pub fn rune(first: u8, second: u8) -> Option<&'static str> {
    RUNES.iter().copied().find(|r| {
        let bytes = r.as_bytes();
        bytes[0] == first && bytes[1] == second
    })
}
