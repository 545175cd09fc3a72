//! FIRST and Aη fixed-point tables.

use crate::{
    grammar::{Grammar, NontermId, SymbolId, TokenId},
    value_set::ValueSet,
};

/// Per-nonterminal FIRST sets (token ids, with `$empty` marking nullability)
/// and Aη sets (indices of nonterminals reachable as the leftmost symbol of
/// a derived sentential form).
#[derive(Debug)]
pub struct FirstSets {
    first: Vec<ValueSet>,
    aeta: Vec<ValueSet>,
}

impl FirstSets {
    pub fn new(g: &Grammar) -> Self {
        let mut first = vec![ValueSet::new(); g.nonterm_count()];
        loop {
            let mut changed = false;
            for (_, prod) in g.productions() {
                let f = first_of_seq(&first, &prod.rhs, 0);
                changed |= first[prod.lhs.index()].union_with(&f);
            }
            if !changed {
                break;
            }
        }

        let mut aeta: Vec<ValueSet> = (0..g.nonterm_count())
            .map(|n| ValueSet::single(n as u16))
            .collect();
        loop {
            let mut changed = false;
            for (_, prod) in g.productions() {
                if let Some(SymbolId::Nonterm(right)) = prod.rhs.first() {
                    let lhs = prod.lhs.into_raw();
                    for row in &mut aeta {
                        if row.contains(lhs) && row.insert(right.into_raw()) {
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        Self { first, aeta }
    }

    /// `FIRST` of the rhs suffix starting at `pos`. Contains `$empty` iff
    /// every symbol of the suffix can derive ε.
    pub fn first_of(&self, seq: &[SymbolId], pos: usize) -> ValueSet {
        first_of_seq(&self.first, seq, pos)
    }

    pub fn first(&self, n: NontermId) -> &ValueSet {
        &self.first[n.index()]
    }

    pub fn aeta(&self, n: NontermId) -> &ValueSet {
        &self.aeta[n.index()]
    }
}

fn first_of_seq(first: &[ValueSet], seq: &[SymbolId], pos: usize) -> ValueSet {
    let mut out = ValueSet::new();
    let mut empty_included = true;

    for sym in &seq[pos..] {
        empty_included = false;
        match sym {
            SymbolId::Nonterm(n) => {
                out.union_with(&first[n.index()]);
                if out.remove(TokenId::EMPTY.into_raw()) {
                    empty_included = true;
                }
            }
            SymbolId::Token(t) => {
                out.insert(t.into_raw());
            }
            SymbolId::Action(_) => unreachable!("actions are lifted out of finalized rhs"),
        }
        if !empty_included {
            break;
        }
    }

    if empty_included {
        out.insert(TokenId::EMPTY.into_raw());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // E -> T 'x' ; T -> 'a' | ε
    fn grammar() -> (Grammar, NontermId, NontermId) {
        let mut g = Grammar::new("test.gr");
        let e = g.add_nonterm("E").unwrap().0.as_nonterm().unwrap();
        let t = g.add_nonterm("T").unwrap().0.as_nonterm().unwrap();
        let a = TokenId::from_raw(b'a' as u16);
        let x = TokenId::from_raw(b'x' as u16);
        g.add_production(
            e,
            vec![SymbolId::Nonterm(t), SymbolId::Token(x)],
            None,
        )
        .unwrap();
        g.add_production(t, vec![SymbolId::Token(a)], None).unwrap();
        g.add_production(t, vec![], None).unwrap();
        (g, e, t)
    }

    #[test]
    fn first_reaches_through_nullable_prefixes() {
        let (g, e, t) = grammar();
        let fs = FirstSets::new(&g);

        let first_t: Vec<_> = fs.first(t).iter().collect();
        assert_eq!(
            first_t,
            vec![b'a' as u16, TokenId::EMPTY.into_raw()]
        );

        // T can vanish, so FIRST(E) sees through it to 'x' but is itself
        // not nullable.
        let first_e: Vec<_> = fs.first(e).iter().collect();
        assert_eq!(first_e, vec![b'a' as u16, b'x' as u16]);
    }

    #[test]
    fn first_of_suffix_threads_empty() {
        let (g, _, _) = grammar();
        let fs = FirstSets::new(&g);
        let rhs = &g.production(0).rhs;

        let from_t = fs.first_of(rhs, 0);
        assert!(from_t.contains(b'a' as u16));
        assert!(from_t.contains(b'x' as u16));
        assert!(!from_t.contains(TokenId::EMPTY.into_raw()));

        let empty_suffix = fs.first_of(rhs, 2);
        assert_eq!(empty_suffix, ValueSet::single(TokenId::EMPTY.into_raw()));
    }

    #[test]
    fn aeta_is_reflexive_transitive_left_reachability() {
        let (g, e, t) = grammar();
        let fs = FirstSets::new(&g);
        assert_eq!(
            fs.aeta(e).iter().collect::<Vec<_>>(),
            vec![e.into_raw(), t.into_raw()]
        );
        assert_eq!(fs.aeta(t).iter().collect::<Vec<_>>(), vec![t.into_raw()]);
    }
}
