//! Rune grammar table and infix precedence.
//!
//! Each rune the parser understands has one [`RuneEntry`]: how many fixed
//! arguments it takes and what, if anything, trails them. The table is a
//! plain static slice searched linearly; it is small and read-only.

use crate::token::TokenKind;

/// What follows a rune's fixed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// Nothing: exactly `args` arguments.
    Fixed,
    /// Jogging name/value pairs, closed by `==` in tall form.
    Pairs,
    /// A variadic clause or tuple list, closed by `==` in tall form.
    List,
    /// Arm declarations, closed by `--`. No wide form.
    Arms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuneEntry {
    pub rune: &'static str,
    pub args: usize,
    pub tail: Tail,
    /// Fixed arguments that follow the jogging list (`=:` has one).
    pub post: usize,
}

impl RuneEntry {
    const fn fixed(rune: &'static str, args: usize) -> Self {
        RuneEntry {
            rune,
            args,
            tail: Tail::Fixed,
            post: 0,
        }
    }

    const fn pairs(rune: &'static str, args: usize) -> Self {
        RuneEntry {
            rune,
            args,
            tail: Tail::Pairs,
            post: 0,
        }
    }

    const fn list(rune: &'static str, args: usize) -> Self {
        RuneEntry {
            rune,
            args,
            tail: Tail::List,
            post: 0,
        }
    }

    const fn arms(rune: &'static str, args: usize) -> Self {
        RuneEntry {
            rune,
            args,
            tail: Tail::Arms,
            post: 0,
        }
    }

    const fn then(mut self, post: usize) -> Self {
        self.post = post;
        self
    }

    /// Whether `count` arguments form a valid application of this rune.
    pub fn accepts(&self, count: usize) -> bool {
        match self.tail {
            Tail::Fixed => count == self.args,
            Tail::Pairs => {
                count >= self.args + self.post && (count - self.args - self.post) % 2 == 0
            }
            Tail::List | Tail::Arms => count >= self.args,
        }
    }
}

#[cfg(test)]
impl RuneEntry {
    /// A wide application with numeral arguments: `a 1, b 2` for pairs
    /// and one extra item for lists. Arm runes have no wide form.
    pub(crate) fn sample_wide(&self) -> Option<String> {
        let numerals = |from: usize, count: usize| -> Vec<String> {
            (from..from + count).map(|n| n.to_string()).collect()
        };
        let mut parts = numerals(1, self.args);
        match self.tail {
            Tail::Fixed => {}
            Tail::Pairs => {
                let pairs = "a 1, b 2".to_string();
                match parts.last_mut() {
                    Some(last) => *last = format!("{last} {pairs}"),
                    None => parts.push(pairs),
                }
                parts.extend(numerals(self.args + 1, self.post));
            }
            Tail::List => parts.push((self.args + 1).to_string()),
            Tail::Arms => return None,
        }
        Some(format!("{}({})", self.rune, parts.join(" ")))
    }
}

/// Runes understood by the parser.
pub const RUNE_TABLE: &[RuneEntry] = &[
    // dot: nock
    RuneEntry::fixed(".^", 2),
    RuneEntry::fixed(".+", 1),
    RuneEntry::fixed(".*", 2),
    RuneEntry::fixed(".=", 2),
    RuneEntry::fixed(".?", 1),
    // zap: wild
    RuneEntry::fixed("!>", 1),
    RuneEntry::fixed("!<", 2),
    RuneEntry::fixed("!:", 1),
    RuneEntry::fixed("!.", 1),
    RuneEntry::fixed("!=", 1),
    RuneEntry::fixed("!?", 2),
    // tis: subject
    RuneEntry::fixed("=+", 2),
    RuneEntry::fixed("=-", 2),
    RuneEntry::fixed("=|", 2),
    RuneEntry::fixed("=/", 3),
    RuneEntry::fixed("=;", 3),
    RuneEntry::fixed("=.", 3),
    RuneEntry::pairs("=:", 0).then(1),
    RuneEntry::fixed("=?", 4),
    RuneEntry::fixed("=*", 3),
    RuneEntry::fixed("=>", 2),
    RuneEntry::fixed("=<", 2),
    RuneEntry::list("=~", 0),
    RuneEntry::fixed("=,", 2),
    RuneEntry::fixed("=^", 4),
    // wut: conditionals
    RuneEntry::fixed("?>", 2),
    RuneEntry::fixed("?<", 2),
    RuneEntry::list("?|", 0),
    RuneEntry::list("?&", 0),
    RuneEntry::fixed("?!", 1),
    RuneEntry::fixed("?=", 2),
    RuneEntry::fixed("?:", 3),
    RuneEntry::fixed("?.", 3),
    RuneEntry::fixed("?@", 3),
    RuneEntry::fixed("?^", 3),
    RuneEntry::fixed("?~", 3),
    RuneEntry::pairs("?-", 1),
    RuneEntry::pairs("?+", 2),
    // bar: cores
    RuneEntry::arms("|_", 1),
    RuneEntry::arms("|%", 0),
    RuneEntry::fixed("|:", 2),
    RuneEntry::fixed("|.", 1),
    RuneEntry::fixed("|-", 1),
    RuneEntry::fixed("|?", 1),
    RuneEntry::arms("|^", 1),
    RuneEntry::fixed("|~", 2),
    RuneEntry::fixed("|=", 2),
    RuneEntry::fixed("|*", 2),
    RuneEntry::arms("|@", 0),
    // lus: arms
    RuneEntry::fixed("++", 2),
    RuneEntry::fixed("+$", 2),
    RuneEntry::fixed("+*", 2),
    RuneEntry::fixed("+|", 1),
    // col: cells
    RuneEntry::fixed(":-", 2),
    RuneEntry::fixed(":_", 2),
    RuneEntry::fixed(":+", 3),
    RuneEntry::fixed(":^", 4),
    RuneEntry::list(":*", 0),
    RuneEntry::list(":~", 0),
    // cen: calls
    RuneEntry::fixed("%~", 3),
    RuneEntry::fixed("%-", 2),
    RuneEntry::fixed("%.", 2),
    RuneEntry::fixed("%+", 3),
    RuneEntry::fixed("%^", 4),
    RuneEntry::list("%:", 1),
    RuneEntry::pairs("%=", 1),
    RuneEntry::pairs("%_", 1),
    RuneEntry::pairs("%*", 2),
    // ket: casts
    RuneEntry::fixed("^|", 1),
    RuneEntry::fixed("^&", 1),
    RuneEntry::fixed("^?", 1),
    RuneEntry::fixed("^:", 1),
    RuneEntry::fixed("^.", 2),
    RuneEntry::fixed("^-", 2),
    RuneEntry::fixed("^+", 2),
    RuneEntry::fixed("^~", 1),
    RuneEntry::fixed("^*", 1),
    RuneEntry::fixed("^=", 2),
    // buc: molds
    RuneEntry::fixed("$_", 1),
    RuneEntry::list("$%", 0),
    RuneEntry::list("$:", 0),
    RuneEntry::list("$?", 0),
    RuneEntry::fixed("$<", 2),
    RuneEntry::fixed("$>", 2),
    RuneEntry::fixed("$-", 2),
    RuneEntry::fixed("$@", 2),
    RuneEntry::fixed("$^", 2),
    RuneEntry::fixed("$~", 2),
    RuneEntry::fixed("$=", 2),
    // mic: make
    RuneEntry::list(";:", 1),
    RuneEntry::fixed(";+", 1),
    RuneEntry::fixed(";/", 1),
    RuneEntry::fixed(";*", 1),
    RuneEntry::list(";=", 0),
    RuneEntry::fixed(";;", 2),
    RuneEntry::list(";~", 1),
    // sig: hints
    RuneEntry::fixed("~>", 2),
    RuneEntry::fixed("~|", 2),
    RuneEntry::fixed("~_", 2),
    RuneEntry::fixed("~$", 2),
    RuneEntry::fixed("~%", 4),
    RuneEntry::fixed("~<", 2),
    RuneEntry::fixed("~+", 1),
    RuneEntry::fixed("~/", 2),
    RuneEntry::fixed("~&", 2),
    RuneEntry::fixed("~?", 3),
    RuneEntry::fixed("~!", 2),
];

/// Look up a rune's grammar entry.
pub fn lookup(rune: &str) -> Option<&'static RuneEntry> {
    RUNE_TABLE.iter().find(|entry| entry.rune == rune)
}

/// Lowest precedence an infix operator can have.
pub const LOWEST_PRECEDENCE: u8 = 1;

/// Binding strength of an infix operator, or `None` if `kind` is not one.
pub fn precedence(kind: TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Col | TokenKind::Tis => Some(2),
        _ => None,
    }
}
