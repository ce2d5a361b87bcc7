#![allow(clippy::new_without_default)]

//! Construction of the canonical collection of LR(0) items: the
//! deterministic state graph used as the basis for LR parsing-table
//! construction.
//!
//! An *item* is a production paired with a dot position marking parse
//! progress; a *closure* is the expansion-closed set of items forming one
//! LR(0) parser state; *goto* is the transition from one state to another on
//! advancing a dot past a symbol. Construction is seeded from the augmented
//! production `S' -> S` at dot 0 and eagerly materialises every state
//! reachable from it:
//!
//! ```
//! use bnfgrammar::Grammar;
//! use lr0items::CanonicalCollection;
//!
//! let grm = Grammar::new(
//!     "S -> A A
//!      A -> \"a\" A
//!         | \"b\"",
//! )
//! .unwrap();
//! let cc = CanonicalCollection::build(&grm);
//! let root_cls = cc.root_closure().unwrap();
//! let accept = cc.goto_target(cc.kernel(root_cls)).unwrap();
//! assert_eq!(cc.serialise(cc.kernel(accept)), "S' -> S •");
//! ```
//!
//! Items are addressed by [`ItemIdx`] and closures by [`CIdx`], both scoped
//! to one [`CanonicalCollection`]: index equality is object identity. A
//! registry inside each collection guarantees that structurally identical
//! dot-0 items are represented by a single shared `ItemIdx`, so closures
//! reached by different paths share sub-graphs. Advanced kernel items, by
//! contrast, are never deduplicated: structurally identical kernels reached
//! via different goto edges stay distinct and each produces its own state.
//! The collection therefore does not merge states by item-set equality the
//! way textbook canonical-collection construction does. Construction is
//! single-threaded, synchronous, and recursive; recursion depth is bounded
//! by grammar size.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod collection;

pub use collection::{CanonicalCollection, Closure, ItemFinalError};

/// `ItemIdx` is a wrapper for a 32-bit item index, scoped to one
/// `CanonicalCollection`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemIdx(u32);

/// `CIdx` is a wrapper for a 32-bit closure (parser state) index, scoped to
/// one `CanonicalCollection`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CIdx(u32);

macro_rules! idx_conversions {
    ($n: ident) => {
        impl From<usize> for $n {
            fn from(v: usize) -> Self {
                if v > u32::MAX as usize {
                    panic!("Overflow");
                }
                $n(v as u32)
            }
        }

        impl From<$n> for usize {
            fn from(st: $n) -> Self {
                st.0 as usize
            }
        }

        impl From<$n> for u32 {
            fn from(st: $n) -> Self {
                st.0
            }
        }
    };
}

idx_conversions!(ItemIdx);
idx_conversions!(CIdx);
