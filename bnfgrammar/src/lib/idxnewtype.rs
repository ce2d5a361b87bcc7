// This macro generates a struct which exposes a u32 API. The biggest grammars
// this library will plausibly encounter have a few thousand productions, so
// u32 storage is ample; fixing the storage type keeps indices Copy and cheap.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature="serde", derive(Serialize, Deserialize))]
        pub struct $n(pub u32);

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

        impl From<usize> for $n {
            fn from(st: usize) -> Self {
                if st > u32::MAX as usize {
                    panic!("Overflow");
                }
                $n(st as u32)
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for production indices. `PIdx(0)` is always the
    /// augmented production; user productions are numbered from `PIdx(1)`
    /// upwards in source order.
    ///
    /// It is guaranteed that `PIdx` can be converted, without loss of
    /// precision, to `usize` with the idiom `usize::from(x_pidx)`.
    PIdx
);
IdxNewtype!(
    /// A type specifically for symbol indices within a production (and hence
    /// also for dot positions, which range over `0..=prod_len`).
    SIdx
);
