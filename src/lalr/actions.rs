//! Reduce-action synthesis and conflict resolution.

use super::{
    first::FirstSets,
    lr0::{closure, Action, Automaton},
};
use crate::{
    errors::Error,
    grammar::{Assoc, Grammar, SymbolId, TokenId},
};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ConflictCounts {
    pub shift_reduce: u32,
    pub reduce_reduce: u32,
}

impl ConflictCounts {
    pub fn total(&self) -> u32 {
        self.shift_reduce + self.reduce_reduce
    }
}

/// Write reduce actions into the raw matrix and resolve conflicts.
///
/// For every final-position item of a state's closure, each lookahead token
/// gets `reduce(P)` unless the cell is already taken:
///
/// - against a shift, precedence and associativity decide — higher
///   production precedence reduces, equal precedence reduces on a
///   left-associative token, errors on a non-associative one, and keeps the
///   shift otherwise; with either precedence missing the shift stays and a
///   shift/reduce conflict is counted;
/// - against another reduce, the existing entry stays. Items are enumerated
///   in ascending position order, so the lower production index wins; this
///   tie-break is a documented guarantee;
/// - an explicit error cell placed by nonassociativity resolution is final.
///
/// Accepting is not special-cased: it is the reduce of production 0 on the
/// end-of-input token.
pub fn synthesize(
    g: &Grammar,
    fs: &FirstSets,
    automaton: &mut Automaton,
) -> Result<ConflictCounts, Error> {
    let mut counts = ConflictCounts::default();

    for s in 0..automaton.states.len() {
        let kernel: Vec<_> = automaton.states[s]
            .items
            .iter()
            .map(|item| (item.position, item.la.clone()))
            .collect();

        for (position, la) in closure(g, fs, &kernel)? {
            let prod = g.production(position.n_prod);
            if position.pos != prod.rhs.len() {
                continue;
            }

            for raw in la.iter() {
                let token = TokenId::from_raw(raw);
                let cell = &mut automaton.actions[s][raw as usize];
                match *cell {
                    None => *cell = Some(Action::Reduce(position.n_prod)),
                    Some(Action::Shift(_)) => {
                        let token_prec = g.token_info(token).prec;
                        match (token_prec, prod.prec) {
                            (Some(tp), Some(pp)) => {
                                if pp > tp.priority {
                                    *cell = Some(Action::Reduce(position.n_prod));
                                } else if pp == tp.priority {
                                    match tp.assoc {
                                        Assoc::Left => {
                                            *cell = Some(Action::Reduce(position.n_prod))
                                        }
                                        Assoc::Nonassoc => *cell = Some(Action::Error),
                                        Assoc::Right => {}
                                    }
                                }
                            }
                            _ => {
                                tracing::warn!(
                                    "{}: shift/reduce conflict for `{}` production before `{}` look-ahead token",
                                    g.file_name(),
                                    g.display_production(position.n_prod, None),
                                    g.symbol_text(SymbolId::Token(token)),
                                );
                                counts.shift_reduce += 1;
                            }
                        }
                    }
                    Some(Action::Reduce(existing)) => {
                        tracing::warn!(
                            "{}: reduce/reduce conflict for `{}` and `{}` productions before `{}` look-ahead token",
                            g.file_name(),
                            g.display_production(existing, None),
                            g.display_production(position.n_prod, None),
                            g.symbol_text(SymbolId::Token(token)),
                        );
                        counts.reduce_reduce += 1;
                    }
                    Some(Action::Error) => {}
                }
            }
        }
    }

    Ok(counts)
}
