use std::{
    collections::{
        hash_map::{Entry, HashMap},
        HashSet,
    },
    error::Error,
    fmt,
    hash::BuildHasherDefault,
};

use bnfgrammar::{Grammar, PIdx, SIdx, Symbol};
use fnv::FnvHasher;

use crate::{CIdx, ItemIdx};

/// Returned when `advance` is invoked on an item whose dot is already at the
/// end of its RHS. Correct goto logic never advances a final item, so on
/// well-formed input this indicates an internal invariant violation rather
/// than a user-facing condition.
#[derive(Debug, Eq, PartialEq)]
pub struct ItemFinalError {
    /// The serialised form of the offending item.
    pub key: String,
}

impl Error for ItemFinalError {}

impl fmt::Display for ItemFinalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Item '{}' is already final", self.key)
    }
}

/// An LR(0) item: a production paired with a dot position in
/// `0..=prod_len`. The dot position never decreases. The lazily computed
/// closure and goto target are cached here, which is what makes both
/// operations memoised per item.
struct Item {
    pidx: PIdx,
    dot: SIdx,
    closure: Option<CIdx>,
    goto: Option<CIdx>,
}

/// One LR(0) parser state: the kernel item that seeded it plus the items
/// added by expansion, in the depth-first order they were appended. The
/// sequence may contain an item more than once (re-visits during expansion
/// append but do not recurse).
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Closure {
    kernel: ItemIdx,
    items: Vec<ItemIdx>,
}

impl Closure {
    /// The kernel item this closure was built from.
    pub fn kernel(&self) -> ItemIdx {
        self.kernel
    }

    /// The full item sequence, kernel first.
    pub fn items(&self) -> &[ItemIdx] {
        &self.items
    }
}

/// One grammar-construction session: the arena of items and closures plus
/// the registry of dot-0 items. Items and closures are addressed by index;
/// index equality is object identity. The registry is scoped to the
/// collection, so independent grammar analyses cannot collide on serialised
/// keys: construct one `CanonicalCollection` per grammar.
pub struct CanonicalCollection<'a> {
    grm: &'a Grammar,
    items: Vec<Item>,
    closures: Vec<Closure>,
    /// Serialised dot-0 item text -> its singleton item.
    registry: HashMap<String, ItemIdx, BuildHasherDefault<FnvHasher>>,
    root: ItemIdx,
}

impl<'a> CanonicalCollection<'a> {
    /// Create a collection containing only the root kernel item (augmented
    /// production, dot 0). The root item is deliberately not registered: the
    /// augmented production is excluded from symbol-indexed lookup, so no
    /// expansion can ever add a second item over it.
    pub fn new(grm: &'a Grammar) -> Self {
        let items = vec![Item {
            pidx: grm.start_prod(),
            dot: SIdx(0),
            closure: None,
            goto: None,
        }];
        CanonicalCollection {
            grm,
            items,
            closures: Vec::new(),
            registry: HashMap::with_hasher(BuildHasherDefault::<FnvHasher>::default()),
            root: ItemIdx::from(0usize),
        }
    }

    /// Eagerly materialise the whole canonical collection reachable from the
    /// start state: seed the root item, close it, then goto every item of
    /// the root closure (which recursively constructs every reachable
    /// state).
    pub fn build(grm: &'a Grammar) -> Self {
        let mut cc = CanonicalCollection::new(grm);
        if let Some(cidx) = cc.close(cc.root()) {
            cc.goto_closure(cidx);
        }
        cc
    }

    /// The root kernel item `S' -> • S`.
    pub fn root(&self) -> ItemIdx {
        self.root
    }

    /// The closure of the root item (the start state), or `None` if it has
    /// not been computed yet.
    pub fn root_closure(&self) -> Option<CIdx> {
        self.items[usize::from(self.root)].closure
    }

    /// The grammar this collection was built over.
    pub fn grammar(&self) -> &Grammar {
        self.grm
    }

    /// How many items does this collection contain?
    pub fn items_len(&self) -> usize {
        self.items.len()
    }

    /// How many closures does this collection contain?
    pub fn closures_len(&self) -> usize {
        self.closures.len()
    }

    /// Return closure `cidx`. Panics if `cidx` doesn't exist.
    pub fn closure(&self, cidx: CIdx) -> &Closure {
        &self.closures[usize::from(cidx)]
    }

    /// Return the kernel item of closure `cidx`. Panics if `cidx` doesn't
    /// exist.
    pub fn kernel(&self, cidx: CIdx) -> ItemIdx {
        self.closures[usize::from(cidx)].kernel
    }

    /// Return the item sequence of closure `cidx`, kernel first. Panics if
    /// `cidx` doesn't exist.
    pub fn closure_items(&self, cidx: CIdx) -> &[ItemIdx] {
        &self.closures[usize::from(cidx)].items
    }

    /// Which production is item `iidx` over? Panics if `iidx` doesn't exist.
    pub fn item_prod(&self, iidx: ItemIdx) -> PIdx {
        self.items[usize::from(iidx)].pidx
    }

    /// Item `iidx`'s dot position. Panics if `iidx` doesn't exist.
    pub fn item_dot(&self, iidx: ItemIdx) -> SIdx {
        self.items[usize::from(iidx)].dot
    }

    /// Item `iidx`'s cached closure, if computed.
    pub fn closure_of(&self, iidx: ItemIdx) -> Option<CIdx> {
        self.items[usize::from(iidx)].closure
    }

    /// Item `iidx`'s cached goto target, if computed.
    pub fn goto_target(&self, iidx: ItemIdx) -> Option<CIdx> {
        self.items[usize::from(iidx)].goto
    }

    /// Is item `iidx`'s dot at the end of its RHS (i.e. is this a reduce
    /// item)?
    pub fn is_final(&self, iidx: ItemIdx) -> bool {
        let it = &self.items[usize::from(iidx)];
        it.dot == self.grm.prod_len(it.pidx)
    }

    /// The symbol at item `iidx`'s dot, or `None` for final items.
    fn dot_sym(&self, iidx: ItemIdx) -> Option<&Symbol> {
        let it = &self.items[usize::from(iidx)];
        self.grm.prod(it.pidx).rhs().get(usize::from(it.dot))
    }

    /// The canonical dotted-production text of item `iidx`, e.g.
    /// `S' -> • S`. Two items over the same production with the same dot
    /// position serialise identically; registry keys are exactly these
    /// strings.
    pub fn serialise(&self, iidx: ItemIdx) -> String {
        let it = &self.items[usize::from(iidx)];
        self.serialise_prod_dot(it.pidx, it.dot)
    }

    fn serialise_prod_dot(&self, pidx: PIdx, dot: SIdx) -> String {
        let prod = self.grm.prod(pidx);
        let mut o = format!("{} ->", prod.lhs());
        for (i, sym) in prod.rhs().iter().enumerate() {
            if i == usize::from(dot) {
                o.push_str(" \u{2022}");
            }
            o.push(' ');
            o.push_str(sym.as_str());
        }
        if usize::from(dot) == prod.rhs().len() {
            o.push_str(" \u{2022}");
        }
        o
    }

    /// Return the singleton dot-0 item for production `pidx`, constructing
    /// it on first call. Every subsequent call for the same production
    /// returns the same index, which is what allows closures reached by
    /// different paths to share sub-graphs rooted at the same added item
    /// (and thus share its goto target once computed).
    pub fn register(&mut self, pidx: PIdx) -> ItemIdx {
        let key = self.serialise_prod_dot(pidx, SIdx(0));
        match self.registry.entry(key) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let iidx = ItemIdx::from(self.items.len());
                self.items.push(Item {
                    pidx,
                    dot: SIdx(0),
                    closure: None,
                    goto: None,
                });
                e.insert(iidx);
                iidx
            }
        }
    }

    /// Return a new item with the dot advanced one position over the same
    /// production, or `ItemFinalError` if the dot is already at the end of
    /// the RHS. The new item is the kernel of a goto target and is
    /// intentionally not registered: structurally identical advanced kernels
    /// reached via different goto edges stay distinct (see the
    /// `lr0items` crate docs on state merging).
    pub fn advance(&mut self, iidx: ItemIdx) -> Result<ItemIdx, ItemFinalError> {
        let (pidx, dot) = {
            let it = &self.items[usize::from(iidx)];
            (it.pidx, it.dot)
        };
        if dot == self.grm.prod_len(pidx) {
            return Err(ItemFinalError {
                key: self.serialise(iidx),
            });
        }
        let new = ItemIdx::from(self.items.len());
        self.items.push(Item {
            pidx,
            dot: SIdx(u32::from(dot) + 1),
            closure: None,
            goto: None,
        });
        Ok(new)
    }

    /// Compute (or return the cached) closure of kernel item `iidx`. Items
    /// whose dot is at the end of the RHS or sits before a terminal are not
    /// closurable and yield `None`.
    pub fn close(&mut self, iidx: ItemIdx) -> Option<CIdx> {
        if let Some(cidx) = self.items[usize::from(iidx)].closure {
            return Some(cidx);
        }
        match self.dot_sym(iidx) {
            Some(sym) if sym.is_nonterminal() => (),
            _ => return None,
        }
        let cidx = CIdx::from(self.closures.len());
        self.closures.push(Closure {
            kernel: iidx,
            items: vec![iidx],
        });
        let mut expanded = HashSet::with_hasher(BuildHasherDefault::<FnvHasher>::default());
        expanded.insert(iidx);
        self.expand(cidx, iidx, &mut expanded);
        self.items[usize::from(iidx)].closure = Some(cidx);
        Some(cidx)
    }

    /// Depth-first expansion: append the dot-0 items of every production for
    /// `iidx`'s dot symbol, recursing into each just-appended item before
    /// moving to the next production. An item already expanded within this
    /// closure is appended again (duplicates are not filtered from the
    /// sequence) but not recursed into, which bounds the recursion and makes
    /// re-visits on self-recursive productions harmless. A non-terminal with
    /// no productions expands to nothing.
    fn expand(
        &mut self,
        cidx: CIdx,
        iidx: ItemIdx,
        expanded: &mut HashSet<ItemIdx, BuildHasherDefault<FnvHasher>>,
    ) {
        let sym = match self.dot_sym(iidx) {
            Some(sym) if sym.is_nonterminal() => sym.clone(),
            _ => return,
        };
        let pidxs = self
            .grm
            .prods_for_sym(&sym)
            .keys()
            .copied()
            .collect::<Vec<_>>();
        for pidx in pidxs {
            let added = self.register(pidx);
            self.closures[usize::from(cidx)].items.push(added);
            if expanded.insert(added) {
                self.expand(cidx, added, expanded);
            }
        }
    }

    /// Compute (or return the cached) goto target of item `iidx`: the state
    /// reached by advancing the dot past its symbol. Final items have no
    /// outgoing transition and yield `None`. On first computation the entire
    /// graph reachable from the new state is constructed eagerly and
    /// depth-first.
    pub fn goto(&mut self, iidx: ItemIdx) -> Option<CIdx> {
        if self.is_final(iidx) {
            return None;
        }
        if let Some(cidx) = self.items[usize::from(iidx)].goto {
            return Some(cidx);
        }
        // The is_final check above guarantees advance cannot fail.
        let kernel = self.advance(iidx).unwrap();
        let target = match self.close(kernel) {
            Some(cidx) => cidx,
            None => {
                // Non-closurable kernels (reduce items, or a terminal at the
                // dot) still form a kernel-only state.
                let cidx = CIdx::from(self.closures.len());
                self.closures.push(Closure {
                    kernel,
                    items: vec![kernel],
                });
                cidx
            }
        };
        // Cache before recursing: goto cycles back through shared items and
        // must find the target already recorded.
        self.items[usize::from(iidx)].goto = Some(target);
        self.goto_closure(target);
        Some(target)
    }

    /// Invoke goto on every item closure `cidx` directly contains, in
    /// sequence order.
    pub fn goto_closure(&mut self, cidx: CIdx) {
        let items = self.closures[usize::from(cidx)].items.clone();
        for iidx in items {
            self.goto(iidx);
        }
    }

    /// Pretty print closure `cidx` as a `String`, one serialised item per
    /// line, kernel first.
    pub fn pp(&self, cidx: CIdx) -> String {
        self.closures[usize::from(cidx)]
            .items
            .iter()
            .map(|&iidx| self.serialise(iidx))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod test {
    use super::CanonicalCollection;
    use bnfgrammar::{Grammar, PIdx, SIdx};

    fn aab_grammar() -> Grammar {
        Grammar::new(
            "S -> A A
             A -> \"a\" A
                | \"b\"",
        )
        .unwrap()
    }

    #[test]
    fn test_root_item_serialisation() {
        let grm = aab_grammar();
        let cc = CanonicalCollection::new(&grm);
        assert_eq!(cc.serialise(cc.root()), "S' -> • S");
    }

    #[test]
    fn test_root_closure_depth_first_order() {
        let grm = aab_grammar();
        let cc = CanonicalCollection::build(&grm);
        let cidx = cc.root_closure().unwrap();
        assert_eq!(cc.kernel(cidx), cc.root());
        let cls = cc.closure(cidx);
        assert_eq!(cls.kernel(), cc.root());
        assert_eq!(cls.items(), cc.closure_items(cidx));
        let serialised = cc
            .closure_items(cidx)
            .iter()
            .map(|&i| cc.serialise(i))
            .collect::<Vec<_>>();
        assert_eq!(
            serialised,
            vec![
                "S' -> • S",
                "S -> • A A",
                "A -> • \"a\" A",
                "A -> • \"b\""
            ]
        );
    }

    #[test]
    fn test_goto_accept() {
        let grm = aab_grammar();
        let cc = CanonicalCollection::build(&grm);
        let accept = cc.goto_target(cc.root()).unwrap();
        assert_eq!(cc.serialise(cc.kernel(accept)), "S' -> S •");
        // The accept state's kernel is a reduce item: no outgoing edge.
        assert_eq!(cc.goto_target(cc.kernel(accept)), None);
    }

    #[test]
    fn test_goto_chain() {
        let grm = aab_grammar();
        let cc = CanonicalCollection::build(&grm);
        // The second item of the root closure is S -> • A A; goto twice
        // walks the dot across both As.
        let i1 = cc.closure_items(cc.root_closure().unwrap())[1];
        assert_eq!(cc.serialise(i1), "S -> • A A");
        assert_eq!(cc.item_prod(i1), PIdx(1));
        let c1 = cc.goto_target(i1).unwrap();
        assert_eq!(cc.serialise(cc.kernel(c1)), "S -> A • A");
        let c2 = cc.goto_target(cc.kernel(c1)).unwrap();
        assert_eq!(cc.serialise(cc.kernel(c2)), "S -> A A •");
    }

    #[test]
    fn test_goto_idempotent() {
        let grm = aab_grammar();
        let mut cc = CanonicalCollection::build(&grm);
        let i1 = cc.closure_items(cc.root_closure().unwrap())[1];
        let first = cc.goto(i1).unwrap();
        let second = cc.goto(i1).unwrap();
        assert_eq!(first, second);
        let before = cc.closures_len();
        cc.goto(i1);
        assert_eq!(cc.closures_len(), before);
    }

    #[test]
    fn test_registry_shares_added_items() {
        let grm = aab_grammar();
        let mut cc = CanonicalCollection::build(&grm);
        let root_cls = cc.root_closure().unwrap();
        // A -> • "a" A as reached in the root closure...
        let via_root = cc.closure_items(root_cls)[2];
        // ...and as reached in the closure of S -> A • A.
        let c1 = cc.goto_target(cc.closure_items(root_cls)[1]).unwrap();
        let via_goto = cc.closure_items(c1)[1];
        assert_eq!(via_root, via_goto);
        // Registering the production again also yields the same item, and
        // the goto target is observably shared from either path.
        assert_eq!(cc.register(PIdx(2)), via_root);
        assert_eq!(cc.goto_target(via_root), cc.goto_target(via_goto));
    }

    #[test]
    fn test_left_recursion_terminates() {
        let grm = Grammar::new(
            "A -> A \"a\"
              | \"b\"",
        )
        .unwrap();
        let cc = CanonicalCollection::build(&grm);
        let cidx = cc.root_closure().unwrap();
        // Expansion re-visits A's productions via the self-recursive first
        // alternative: the re-visits append (duplicates are kept in the
        // sequence) but do not recurse.
        let items = cc.closure_items(cidx);
        assert_eq!(items.len(), 5);
        assert_eq!(items[1], items[2]);
        assert_eq!(items[3], items[4]);
        assert_eq!(cc.serialise(items[1]), "A -> • A \"a\"");
        assert_eq!(cc.serialise(items[3]), "A -> • \"b\"");
    }

    #[test]
    fn test_epsilon_dot_bounds() {
        let grm = Grammar::new("F ->").unwrap();
        let mut cc = CanonicalCollection::new(&grm);
        let i0 = cc.register(PIdx(1));
        assert_eq!(cc.serialise(i0), "F -> • ε");
        // ε occupies slot 0, so dot 0 is not final...
        assert!(!cc.is_final(i0));
        let i1 = cc.advance(i0).unwrap();
        assert_eq!(cc.item_dot(i1), SIdx(1));
        assert_eq!(cc.serialise(i1), "F -> ε •");
        // ...but dot 1 is, and the dot cannot move past it.
        assert!(cc.is_final(i1));
        let e = cc.advance(i1).unwrap_err();
        assert_eq!(e.key, "F -> ε •");
    }

    #[test]
    fn test_not_closurable() {
        let grm = aab_grammar();
        let mut cc = CanonicalCollection::new(&grm);
        // A -> • "a" A: terminal at the dot.
        let term_dot = cc.register(PIdx(2));
        assert_eq!(cc.close(term_dot), None);
        assert_eq!(cc.closure_of(term_dot), None);
        // A -> "b" •: final.
        let bdot = cc.register(PIdx(3));
        let fin = cc.advance(bdot).unwrap();
        assert_eq!(cc.close(fin), None);
        assert_eq!(cc.goto(fin), None);
    }

    #[test]
    fn test_advanced_kernels_not_deduplicated() {
        // Structurally identical advanced items stay distinct objects, each
        // producing its own closure: the collection does not merge states by
        // item-set equality. This is a documented limitation, not an
        // accident.
        let grm = aab_grammar();
        let mut cc = CanonicalCollection::build(&grm);
        let i1 = cc.closure_items(cc.root_closure().unwrap())[1];
        let a1 = cc.advance(i1).unwrap();
        let a2 = cc.advance(i1).unwrap();
        assert_ne!(a1, a2);
        assert_eq!(cc.serialise(a1), cc.serialise(a2));
        let c1 = cc.close(a1).unwrap();
        let c2 = cc.close(a2).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_undefined_nonterminal_expands_empty() {
        // Z has no productions: permissively expands to nothing.
        let grm = Grammar::new("S -> Z \"a\"").unwrap();
        let cc = CanonicalCollection::build(&grm);
        let cidx = cc.root_closure().unwrap();
        assert_eq!(cc.closure_items(cidx).len(), 2);
        // The graph still advances over Z.
        let i1 = cc.closure_items(cidx)[1];
        let c1 = cc.goto_target(i1).unwrap();
        assert_eq!(cc.serialise(cc.kernel(c1)), "S -> Z • \"a\"");
    }

    #[test]
    fn test_pp() {
        let grm = aab_grammar();
        let cc = CanonicalCollection::build(&grm);
        assert_eq!(
            cc.pp(cc.root_closure().unwrap()),
            "S' -> • S\nS -> • A A\nA -> • \"a\" A\nA -> • \"b\""
        );
    }

    #[test]
    fn test_whole_graph_eager() {
        // After build, every item reachable from the root has its goto
        // computed (or is final).
        let grm = aab_grammar();
        let cc = CanonicalCollection::build(&grm);
        assert_eq!(cc.grammar().prods_len(), PIdx(4));
        for i in 0..cc.items_len() {
            let iidx = crate::ItemIdx::from(i);
            assert!(cc.is_final(iidx) || cc.goto_target(iidx).is_some());
        }
    }

    #[test]
    fn test_sessions_are_independent() {
        // Two collections over different grammars sharing symbol names must
        // not collide on registry keys.
        let grm1 = Grammar::new("S -> \"x\"").unwrap();
        let grm2 = Grammar::new(
            "S -> S \"x\"
              | \"x\"",
        )
        .unwrap();
        let cc1 = CanonicalCollection::build(&grm1);
        let cc2 = CanonicalCollection::build(&grm2);
        assert_eq!(cc1.closure_items(cc1.root_closure().unwrap()).len(), 2);
        assert_eq!(cc2.closure_items(cc2.root_closure().unwrap()).len(), 5);
    }
}
