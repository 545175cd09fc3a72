//! LR(0) state-graph construction over kernel item sets.

use super::first::FirstSets;
use crate::{
    errors::Error,
    grammar::{Grammar, NontermId, SymbolId, TokenId},
    types::Map,
    value_set::ValueSet,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// An LR(0) item: a production with a dot position. Ordered
/// lexicographically, which fixes the iteration order of every state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub n_prod: usize,
    pub pos: usize,
}

/// A kernel item together with its lookahead cell. `accept_from` holds
/// `(state, item)` back-references into the state arena; the propagation
/// fixed point replays them until the lookahead sets close.
#[derive(Debug, Clone)]
pub struct Item {
    pub position: Position,
    pub la: ValueSet,
    pub accept_from: Vec<(usize, usize)>,
}

/// A state's kernel, sorted by position. Nonkernel closure items are
/// recomputed on demand and never stored.
#[derive(Debug, Clone)]
pub struct State {
    pub items: Vec<Item>,
}

impl State {
    pub fn find(&self, position: Position) -> Option<usize> {
        self.items
            .binary_search_by(|item| item.position.cmp(&position))
            .ok()
    }

    pub fn kernel(&self) -> impl Iterator<Item = Position> + '_ {
        self.items.iter().map(|item| item.position)
    }
}

/// A raw table cell. Undefined cells are `None` in the matrices; an
/// explicit `Error` is a deliberate entry written by nonassociativity
/// resolution and survives compression.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Error,
}

/// The state graph plus the raw action/goto matrices. The LR(0) pass fills
/// in shifts and gotos; lookahead propagation mutates the items' `la` cells;
/// action synthesis writes the reduces.
#[derive(Debug)]
pub struct Automaton {
    pub states: Vec<State>,
    pub actions: Vec<Vec<Option<Action>>>,
    pub gotos: Vec<Vec<usize>>,
}

/// Enumerate the LR(0) states reachable from the start-condition seeds.
/// State identity is the kernel position set alone, ignoring lookaheads.
pub fn build_states(g: &Grammar, fs: &FirstSets) -> Result<Automaton, Error> {
    if g.start_conditions().is_empty() {
        return Err(Error::Internal("no start conditions"));
    }

    let mut states: Vec<State> = Vec::new();
    let mut actions: Vec<Vec<Option<Action>>> = Vec::new();
    let mut gotos: Vec<Vec<usize>> = Vec::new();
    let mut known: Map<Vec<Position>, usize> = Map::default();
    let mut pending: VecDeque<(usize, Vec<Position>)> = VecDeque::new();

    fn add_state(
        g: &Grammar,
        kernel: Vec<Position>,
        known: &mut Map<Vec<Position>, usize>,
        states: &mut Vec<State>,
        actions: &mut Vec<Vec<Option<Action>>>,
        gotos: &mut Vec<Vec<usize>>,
    ) -> (usize, bool) {
        if let Some(&id) = known.get(&kernel) {
            return (id, false);
        }
        let id = states.len();
        states.push(State {
            items: kernel
                .iter()
                .map(|&position| Item {
                    position,
                    la: ValueSet::new(),
                    accept_from: Vec::new(),
                })
                .collect(),
        });
        actions.push(vec![None; g.token_count()]);
        gotos.push(vec![0; g.nonterm_count()]);
        known.insert(kernel, id);
        (id, true)
    }

    for (_, n_prod) in g.start_conditions() {
        let kernel = vec![Position {
            n_prod: *n_prod,
            pos: 0,
        }];
        let (id, fresh) = add_state(
            g,
            kernel.clone(),
            &mut known,
            &mut states,
            &mut actions,
            &mut gotos,
        );
        if fresh {
            pending.push_back((id, kernel));
        }
    }

    while let Some((n_state, kernel)) = pending.pop_front() {
        for n in 0..g.nonterm_count() {
            let sym = SymbolId::Nonterm(NontermId::from_raw(n as u16));
            let next = goto_set(g, fs, &kernel, sym)?;
            if next.is_empty() {
                continue;
            }
            let (id, fresh) = add_state(
                g,
                next.clone(),
                &mut known,
                &mut states,
                &mut actions,
                &mut gotos,
            );
            if fresh {
                pending.push_back((id, next));
            }
            gotos[n_state][n] = id;
        }

        for t in 0..g.token_count() {
            let tok = TokenId::from_raw(t as u16);
            if !g.token_info(tok).is_used {
                continue;
            }
            let next = goto_set(g, fs, &kernel, SymbolId::Token(tok))?;
            if next.is_empty() {
                continue;
            }
            let (id, fresh) = add_state(
                g,
                next.clone(),
                &mut known,
                &mut states,
                &mut actions,
                &mut gotos,
            );
            if fresh {
                pending.push_back((id, next));
            }
            actions[n_state][t] = Some(Action::Shift(id));
        }
    }

    Ok(Automaton {
        states,
        actions,
        gotos,
    })
}

/// The kernel of `goto(S, sym)`, computed without materializing the full
/// closure: kernel advancements first, then Aη decides which nonkernel
/// productions start with `sym`.
pub fn goto_set(
    g: &Grammar,
    fs: &FirstSets,
    kernel: &[Position],
    sym: SymbolId,
) -> Result<Vec<Position>, Error> {
    let mut nonkern = ValueSet::new();
    let mut next: BTreeSet<Position> = BTreeSet::new();

    for &position in kernel {
        let prod = g.production(position.n_prod);
        if position.pos > prod.rhs.len() {
            return Err(Error::Internal("position beyond rhs"));
        }
        if position.pos == prod.rhs.len() {
            continue;
        }
        let next_sym = prod.rhs[position.pos];
        if let SymbolId::Nonterm(n) = next_sym {
            nonkern.union_with(fs.aeta(n));
        }
        if next_sym == sym {
            next.insert(Position {
                n_prod: position.n_prod,
                pos: position.pos + 1,
            });
        }
    }

    for (n_prod, prod) in g.productions() {
        if nonkern.contains(prod.lhs.into_raw()) && prod.rhs.first() == Some(&sym) {
            next.insert(Position { n_prod, pos: 1 });
        }
    }

    Ok(next.into_iter().collect())
}

/// The closure of a kernel item set, with lookahead sets propagated from
/// the contributing kernel items via `FIRST(βa)`. Returns kernel and
/// nonkernel items in position order.
pub fn closure(
    g: &Grammar,
    fs: &FirstSets,
    kernel: &[(Position, ValueSet)],
) -> Result<Vec<(Position, ValueSet)>, Error> {
    let mut nonkern = ValueSet::new();
    let mut nonterm_la = vec![ValueSet::new(); g.nonterm_count()];

    for (position, la) in kernel {
        let prod = g.production(position.n_prod);
        if position.pos > prod.rhs.len() {
            return Err(Error::Internal("position beyond rhs"));
        }
        if position.pos == prod.rhs.len() {
            continue;
        }
        if let SymbolId::Nonterm(n) = prod.rhs[position.pos] {
            nonkern.insert(n.into_raw());
            let mut first = fs.first_of(&prod.rhs, position.pos + 1);
            if first.remove(TokenId::EMPTY.into_raw()) {
                first.union_with(la);
            }
            nonterm_la[n.index()].union_with(&first);
        }
    }

    loop {
        let mut changed = false;
        for (_, prod) in g.productions() {
            if !nonkern.contains(prod.lhs.into_raw()) {
                continue;
            }
            if let Some(&SymbolId::Nonterm(right)) = prod.rhs.first() {
                if nonkern.insert(right.into_raw()) {
                    changed = true;
                }
                let mut first = fs.first_of(&prod.rhs, 1);
                if first.remove(TokenId::EMPTY.into_raw()) {
                    let inherited = nonterm_la[prod.lhs.index()].clone();
                    first.union_with(&inherited);
                }
                if nonterm_la[right.index()].union_with(&first) {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut out: BTreeMap<Position, ValueSet> = kernel.iter().cloned().collect();
    for (n_prod, prod) in g.productions() {
        if nonkern.contains(prod.lhs.into_raw()) {
            out.entry(Position { n_prod, pos: 0 })
                .or_insert_with(|| nonterm_la[prod.lhs.index()].clone());
        }
    }

    Ok(out.into_iter().collect())
}
