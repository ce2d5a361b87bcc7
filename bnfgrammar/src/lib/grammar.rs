use indexmap::IndexMap;

use crate::{
    parser::{parse_prod_line, GrammarSyntaxError, GrammarSyntaxErrorKind},
    PIdx, SIdx, Symbol,
};

const AUGMENTED_SUFFIX: char = '\'';

/// One grammar rule `LHS -> RHS`. The RHS is never empty: a production with
/// no explicit RHS text holds the single-element RHS `[ε]`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Production {
    lhs: Symbol,
    rhs: Vec<Symbol>,
}

impl Production {
    pub fn lhs(&self) -> &Symbol {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }
}

/// Representation of a normalised grammar. See the
/// [top-level documentation](../index.html) for the guarantees this struct
/// makes about production numbering. Built once and read-only afterwards.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grammar {
    /// All productions. `prods[0]` is the augmented production `S' -> S`;
    /// user productions follow in source order.
    prods: Vec<Production>,
    /// The LHS of the first user production.
    start_sym: Symbol,
    /// The synthesised augmented start symbol `S'`.
    start_sym_augmented: Symbol,
}

impl Grammar {
    /// Takes as input a newline-delimited block of productions and returns a
    /// `Grammar` (or a [`GrammarSyntaxError`](../parser/struct.GrammarSyntaxError.html)
    /// on error).
    ///
    /// As we're compiling the `Grammar`, we add a new start production
    /// (which we'll refer to as `S' -> S`, though the actual name is a fresh
    /// name that is guaranteed to be unique) that references the user defined
    /// start symbol.
    pub fn new(s: &str) -> Result<Self, GrammarSyntaxError> {
        Grammar::from_lines(&s.lines().collect::<Vec<_>>())
    }

    /// As [`Grammar::new`](#method.new), but takes the productions as an
    /// ordered sequence of raw lines.
    pub fn from_lines(lines: &[&str]) -> Result<Self, GrammarSyntaxError> {
        let mut user_prods = Vec::new();
        let mut cur_lhs: Option<Symbol> = None;
        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let rp = parse_prod_line(line, i + 1)?;
            let lhs = match rp.lhs {
                Some(lhs) => {
                    cur_lhs = Some(lhs.clone());
                    lhs
                }
                // Continuation rule: inherit the most recently seen LHS.
                None => match cur_lhs {
                    Some(ref lhs) => lhs.clone(),
                    None => {
                        return Err(GrammarSyntaxError {
                            kind: GrammarSyntaxErrorKind::OrphanContinuation(
                                line.trim().to_string(),
                            ),
                            line: i + 1,
                        })
                    }
                },
            };
            user_prods.push(Production { lhs, rhs: rp.rhs });
        }
        if user_prods.is_empty() {
            return Err(GrammarSyntaxError {
                kind: GrammarSyntaxErrorKind::Empty,
                line: 0,
            });
        }

        // Generate a guaranteed unique augmented start symbol. We simply keep
        // appending `'` until we've hit something unique (at the very worst,
        // this will require looping for as many times as there are symbols).
        let start_sym = user_prods[0].lhs.clone();
        let mut aug = format!("{}{}", start_sym, AUGMENTED_SUFFIX);
        while user_prods
            .iter()
            .any(|p| p.lhs.as_str() == aug || p.rhs.iter().any(|s| s.as_str() == aug))
        {
            aug.push(AUGMENTED_SUFFIX);
        }
        let start_sym_augmented = Symbol::new(aug);

        let mut prods = Vec::with_capacity(user_prods.len() + 1);
        prods.push(Production {
            lhs: start_sym_augmented.clone(),
            rhs: vec![start_sym.clone()],
        });
        prods.extend(user_prods);

        Ok(Grammar {
            prods,
            start_sym,
            start_sym_augmented,
        })
    }

    /// How many productions does this grammar have (augmented production
    /// included)?
    pub fn prods_len(&self) -> PIdx {
        PIdx::from(self.prods.len())
    }

    /// Return an iterator which produces (in order from `0..self.prods_len()`)
    /// all this grammar's valid `PIdx`s.
    pub fn iter_pidxs(&self) -> impl Iterator<Item = PIdx> {
        (0..self.prods.len()).map(PIdx::from)
    }

    /// Get production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod(&self, pidx: PIdx) -> &Production {
        &self.prods[usize::from(pidx)]
    }

    /// How many symbols does production `pidx` have? Panics if `pidx` doesn't
    /// exist.
    pub fn prod_len(&self, pidx: PIdx) -> SIdx {
        SIdx::from(self.prods[usize::from(pidx)].rhs.len())
    }

    /// Which production is the augmented production `S' -> S`?
    pub fn start_prod(&self) -> PIdx {
        PIdx(0)
    }

    /// The start symbol: the LHS of the first user production.
    pub fn start_sym(&self) -> &Symbol {
        &self.start_sym
    }

    /// The synthesised augmented start symbol (`S'` for start symbol `S`).
    pub fn start_sym_augmented(&self) -> &Symbol {
        &self.start_sym_augmented
    }

    /// Return the numbered productions whose LHS is `sym`, as a
    /// number-to-production map in production-number order. The augmented
    /// production is never included. Recomputed by linear scan on each call.
    /// An unknown (or terminal) symbol yields an empty map.
    pub fn prods_for_sym(&self, sym: &Symbol) -> IndexMap<PIdx, &Production> {
        self.prods
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, p)| &p.lhs == sym)
            .map(|(i, p)| (PIdx::from(i), p))
            .collect()
    }
}
