#![allow(clippy::new_without_default)]

//! A library for parsing and normalising simple BNF-style Context Free
//! Grammars (CFGs). Grammar terminology varies considerably between tools and
//! papers, so the following conventions are used throughout:
//!
//!   * A *grammar* is an ordered sequence of *productions*.
//!   * A *production* is a rewrite rule from a single non-terminal (its LHS)
//!     to an ordered sequence of *symbols* (its RHS).
//!   * A *terminal* is a symbol which appears literally in input. Terminals
//!     are quote-delimited (`"a"`).
//!   * A *non-terminal* is an unquoted symbol defined by one or more
//!     productions.
//!   * `ε` is the empty-string symbol: a production with an empty RHS is
//!     normalised to the single-element RHS `[ε]`, so RHSs are never empty.
//!
//! Grammars are written one production per line in the form `LHS -> RHS`;
//! a line of the form `| RHS` continues the previous line's LHS:
//!
//! ```text
//! S -> A A
//! A -> "a" A
//!    | "b"
//! ```
//!
//! bnfgrammar makes the following guarantees about grammars:
//!
//!   * User productions are numbered contiguously from `PIdx(1)` to
//!     `PIdx(N)` (inclusive) in source order.
//!   * `PIdx(0)` is the synthesised augmented production `S' -> S`, where
//!     `S` is the LHS of the first user production. It is excluded from
//!     symbol-indexed lookup and retrievable via
//!     [`Grammar::start_prod`](grammar/struct.Grammar.html#method.start_prod).
//!
//! The main entry point is
//! [`Grammar::new()`](grammar/struct.Grammar.html#method.new).

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod idxnewtype;

pub mod grammar;
pub mod parser;

pub use crate::idxnewtype::{PIdx, SIdx};
pub use grammar::{Grammar, Production};
pub use parser::{GrammarSyntaxError, GrammarSyntaxErrorKind};

/// The empty-string symbol.
pub const EPSILON: &str = "\u{03b5}";

/// A single grammar symbol: one terminal or non-terminal token. Symbols are
/// immutable; classification is a pure function of the token text.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol(String);

impl Symbol {
    pub fn new<S: Into<String>>(tok: S) -> Self {
        Symbol(tok.into())
    }

    /// The raw token text, quotes included for terminals.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Is this symbol quote-delimited (i.e. a terminal)?
    pub fn is_terminal(&self) -> bool {
        self.0.len() >= 2 && self.0.starts_with('"') && self.0.ends_with('"')
    }

    /// Is this symbol a non-terminal? Defined as the complement of
    /// `is_terminal` (note that `ε` is thus classified as a non-terminal;
    /// since no production can have `ε` as its LHS, it expands to nothing).
    pub fn is_nonterminal(&self) -> bool {
        !self.is_terminal()
    }

    /// Is this symbol the empty-string symbol `ε`?
    pub fn is_epsilon(&self) -> bool {
        self.0 == EPSILON
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
