//! LALR(1) lookahead computation by propagation over back-references.
//!
//! Each kernel item's closure is replayed once with the `$default` sentinel
//! as its lookahead. Wherever the sentinel survives into a successor item,
//! the lookahead is inherited from the source cell and an `accept_from`
//! back-reference records that edge; generated lookaheads are unioned in
//! directly. The fixed point then replays every edge until no set grows,
//! which terminates because lookahead sets only grow and are bounded by the
//! token id space.

use super::{
    first::FirstSets,
    lr0::{closure, Action, Automaton, Position},
};
use crate::{
    errors::Error,
    grammar::{Grammar, SymbolId, TokenId},
    value_set::ValueSet,
};

struct Edge {
    target_state: usize,
    target_item: usize,
    la: ValueSet,
    inherits_from: Option<(usize, usize)>,
}

pub fn propagate(g: &Grammar, fs: &FirstSets, automaton: &mut Automaton) -> Result<(), Error> {
    // The very first kernel item accepts on end of input.
    automaton
        .states
        .first_mut()
        .and_then(|state| state.items.first_mut())
        .ok_or(Error::Internal("empty state graph"))?
        .la
        .insert(TokenId::EOI.into_raw());

    let edges = collect_edges(g, fs, automaton)?;
    for edge in edges {
        let item = &mut automaton.states[edge.target_state].items[edge.target_item];
        item.la.union_with(&edge.la);
        if let Some(source) = edge.inherits_from {
            item.accept_from.push(source);
        }
    }

    loop {
        let mut changed = false;
        for s in 0..automaton.states.len() {
            for i in 0..automaton.states[s].items.len() {
                let accept_from = std::mem::take(&mut automaton.states[s].items[i].accept_from);
                for &(s2, i2) in &accept_from {
                    let source = automaton.states[s2].items[i2].la.clone();
                    changed |= automaton.states[s].items[i].la.union_with(&source);
                }
                automaton.states[s].items[i].accept_from = accept_from;
            }
        }
        if !changed {
            break;
        }
    }

    Ok(())
}

fn collect_edges(
    g: &Grammar,
    fs: &FirstSets,
    automaton: &Automaton,
) -> Result<Vec<Edge>, Error> {
    let mut edges = Vec::new();

    for (s, state) in automaton.states.iter().enumerate() {
        for (i, item) in state.items.iter().enumerate() {
            let kernel = [(
                item.position,
                ValueSet::single(TokenId::DEFAULT.into_raw()),
            )];
            for (position, mut la) in closure(g, fs, &kernel)? {
                let prod = g.production(position.n_prod);
                if position.pos == prod.rhs.len() {
                    continue;
                }

                let target_state = match prod.rhs[position.pos] {
                    SymbolId::Nonterm(n) => automaton.gotos[s][n.index()],
                    SymbolId::Token(t) => {
                        match automaton.actions[s][t.into_raw() as usize] {
                            Some(Action::Shift(next)) => next,
                            _ => 0,
                        }
                    }
                    SymbolId::Action(_) => {
                        unreachable!("actions are lifted out of finalized rhs")
                    }
                };
                if target_state == 0 {
                    return Err(Error::Internal("no goto target for advanced position"));
                }

                let successor = Position {
                    n_prod: position.n_prod,
                    pos: position.pos + 1,
                };
                let target_item = automaton.states[target_state]
                    .find(successor)
                    .ok_or(Error::Internal("no kernel item for advanced position"))?;

                let inherits_from = la
                    .remove(TokenId::DEFAULT.into_raw())
                    .then_some((s, i));
                edges.push(Edge {
                    target_state,
                    target_item,
                    la,
                    inherits_from,
                });
            }
        }
    }

    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lalr::lr0::build_states;

    // S -> E 'x' ; E -> E '+' E | 'a'
    fn automaton() -> Automaton {
        let mut g = Grammar::new("test.gr");
        let s = g.add_nonterm("S").unwrap().0.as_nonterm().unwrap();
        let e = g.add_nonterm("E").unwrap().0.as_nonterm().unwrap();
        let a = SymbolId::Token(TokenId::from_raw(b'a' as u16));
        let plus = SymbolId::Token(TokenId::from_raw(b'+' as u16));
        let x = SymbolId::Token(TokenId::from_raw(b'x' as u16));
        g.add_production(s, vec![SymbolId::Nonterm(e), x], None)
            .unwrap();
        g.add_production(
            e,
            vec![SymbolId::Nonterm(e), plus, SymbolId::Nonterm(e)],
            None,
        )
        .unwrap();
        g.add_production(e, vec![a], None).unwrap();
        g.add_start_condition("initial");

        let fs = FirstSets::new(&g);
        let mut automaton = build_states(&g, &fs).unwrap();
        propagate(&g, &fs, &mut automaton).unwrap();
        automaton
    }

    #[test]
    fn seed_item_accepts_end_of_input() {
        let automaton = automaton();
        assert!(automaton.states[0].items[0]
            .la
            .contains(TokenId::EOI.into_raw()));
    }

    #[test]
    fn propagation_has_closed() {
        // Every back-reference's lookahead set is contained in its
        // target's set once the fixed point is reached.
        let automaton = automaton();
        let mut back_refs = 0;
        for state in &automaton.states {
            for item in &state.items {
                for &(s2, i2) in &item.accept_from {
                    back_refs += 1;
                    let source = &automaton.states[s2].items[i2].la;
                    assert!((source - &item.la).is_empty());
                }
            }
        }
        assert!(back_refs > 0);
    }

    #[test]
    fn reduce_lookaheads_follow_the_grammar() {
        let automaton = automaton();

        // Find the state whose kernel is { E -> 'a' . }.
        let target = Position { n_prod: 2, pos: 1 };
        let state = automaton
            .states
            .iter()
            .find(|s| s.items.len() == 1 && s.items[0].position == target)
            .unwrap();
        // 'a' can be followed by '+' (inside E '+' E) or 'x' (before the
        // end of the start production), never by end-of-input directly.
        let la = &state.items[0].la;
        assert!(la.contains(b'+' as u16));
        assert!(la.contains(b'x' as u16));
        assert!(!la.contains(TokenId::EOI.into_raw()));
    }
}
