use std::{error::Error, fmt};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{Symbol, EPSILON};

lazy_static! {
    static ref RE_NONTERMINAL: Regex = Regex::new(r"^[A-Z][A-Za-z0-9_]*'*$").unwrap();
}

/// The reason a grammar failed to load.
#[derive(Debug, Eq, PartialEq)]
pub enum GrammarSyntaxErrorKind {
    /// A non-continuation line contained neither `->` nor `|`.
    MissingSplitter(String),
    /// A continuation line (`| ...`) appeared before any `LHS -> ...` line.
    OrphanContinuation(String),
    /// The grammar contained no productions at all.
    Empty,
    /// A token was neither a quote-delimited terminal, `ε`, nor an
    /// uppercase-initial identifier.
    IllegalSymbol(String),
}

/// Returned when a grammar cannot be loaded. Fatal for that grammar: no
/// partial or recovered grammar is ever produced.
#[derive(Debug, Eq, PartialEq)]
pub struct GrammarSyntaxError {
    pub kind: GrammarSyntaxErrorKind,
    /// 1-based line within the grammar text the error was detected on.
    pub line: usize,
}

impl Error for GrammarSyntaxError {}

impl fmt::Display for GrammarSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at line {}", self.kind, self.line)
    }
}

impl fmt::Display for GrammarSyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GrammarSyntaxErrorKind::MissingSplitter(line) => {
                write!(f, "Production '{}' has no '->' or '|'", line)
            }
            GrammarSyntaxErrorKind::OrphanContinuation(line) => {
                write!(f, "Continuation '{}' has no preceding production", line)
            }
            GrammarSyntaxErrorKind::Empty => write!(f, "Empty grammar"),
            GrammarSyntaxErrorKind::IllegalSymbol(tok) => {
                write!(f, "Illegal symbol '{}'", tok)
            }
        }
    }
}

/// A production as parsed from a single raw line, before grammar
/// normalisation. `lhs` is `None` for continuation lines (`| RHS`): the
/// normaliser back-fills it from the most recently seen LHS.
#[derive(Debug, Eq, PartialEq)]
pub struct RawProduction {
    pub lhs: Option<Symbol>,
    pub rhs: Vec<Symbol>,
}

/// Parse one raw production line of the form `LHS -> RHS` or `| RHS`.
/// `lineno` is only used to report errors.
pub fn parse_prod_line(line: &str, lineno: usize) -> Result<RawProduction, GrammarSyntaxError> {
    let (lhs, rhs_text) = if let Some(i) = line.find("->") {
        let lhs_text = line[..i].trim();
        if !RE_NONTERMINAL.is_match(lhs_text) {
            return Err(GrammarSyntaxError {
                kind: GrammarSyntaxErrorKind::IllegalSymbol(lhs_text.to_string()),
                line: lineno,
            });
        }
        (Some(Symbol::new(lhs_text)), &line[i + 2..])
    } else if let Some(rest) = line.trim_start().strip_prefix('|') {
        // The continuation form is a leading `|`: a pipe anywhere else would
        // silently drop whatever precedes it.
        (None, rest)
    } else {
        return Err(GrammarSyntaxError {
            kind: GrammarSyntaxErrorKind::MissingSplitter(line.trim().to_string()),
            line: lineno,
        });
    };

    let rhs = tokenize_rhs(rhs_text, lineno)?;
    Ok(RawProduction { lhs, rhs })
}

/// Tokenize an RHS on whitespace. Two adjacent bare `"` tokens coalesce into
/// the single terminal `" "`; an empty RHS yields exactly `[ε]`, so RHS
/// length is always at least 1.
fn tokenize_rhs(text: &str, lineno: usize) -> Result<Vec<Symbol>, GrammarSyntaxError> {
    let toks = text.split_whitespace().collect::<Vec<_>>();
    let mut rhs = Vec::with_capacity(toks.len());
    let mut i = 0;
    while i < toks.len() {
        if toks[i] == "\"" && i + 1 < toks.len() && toks[i + 1] == "\"" {
            // A literal space terminal, written as two bare quotes.
            rhs.push(Symbol::new("\" \""));
            i += 2;
            continue;
        }
        let sym = Symbol::new(toks[i]);
        if !sym.is_terminal() && !sym.is_epsilon() && !RE_NONTERMINAL.is_match(sym.as_str()) {
            return Err(GrammarSyntaxError {
                kind: GrammarSyntaxErrorKind::IllegalSymbol(toks[i].to_string()),
                line: lineno,
            });
        }
        rhs.push(sym);
        i += 1;
    }
    if rhs.is_empty() {
        rhs.push(Symbol::new(EPSILON));
    }
    Ok(rhs)
}
