//! Two-dimensional table compression.
//!
//! Action rows are folded by exact equality, then each row is reduced to the
//! cells that differ from its most frequent action, terminated by a
//! `(-1, default)` sentinel. When a row can reduce at all, undefined cells
//! borrow the row's lowest-numbered reduce: the engine will reduce, look the
//! token up again in the new top state, and only then hit the real error.
//! That delay is safe because reductions consume no input. Goto columns are
//! compressed the same way around their most frequent target state.

use super::lr0::{Action, Automaton};
use crate::{grammar::Grammar, types::Map};

/// A compressed table: per-row offsets into a shared `(key, value)` pair
/// list, each row terminated by a `key = -1` sentinel carrying the default.
#[derive(Debug)]
pub struct CompressedTable<T> {
    pub index: Vec<usize>,
    pub data: Vec<(i32, T)>,
}

impl<T> CompressedTable<T> {
    /// Scan a row for `key`, falling back to the row's default. Mirrors the
    /// emitted engine's linear row scan.
    pub fn lookup(&self, row: usize, key: i32) -> &T {
        let mut entries = self.data[self.index[row]..].iter();
        loop {
            // The sentinel guarantees the row is never exhausted.
            let (k, value) = entries.next().expect("unterminated compressed row");
            if *k < 0 || *k == key {
                return value;
            }
        }
    }
}

/// Per-table row-size statistics, in `(key, value)` pairs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RowStats {
    pub max: usize,
    pub avg: usize,
}

pub fn compress_actions(g: &Grammar, automaton: &Automaton) -> (CompressedTable<Action>, RowStats) {
    let state_count = automaton.states.len();
    let mut table = CompressedTable {
        index: vec![0; state_count],
        data: Vec::new(),
    };
    let mut seen: Map<&[Option<Action>], usize> = Map::default();
    let mut max = 0;
    let mut sum = 0;
    let mut rows = 0;

    for (n_state, row) in automaton.actions.iter().enumerate() {
        // Identical raw rows share one offset.
        if let Some(&offset) = seen.get(row.as_slice()) {
            table.index[n_state] = offset;
            continue;
        }

        let mut undef_count = 0usize;
        let mut error_count = 0usize;
        let mut reduce_star = None;
        let mut shift_histo = vec![0usize; state_count];
        let mut reduce_histo = vec![0usize; g.production_count()];
        for cell in row {
            match cell {
                None => undef_count += 1,
                Some(Action::Shift(next)) => shift_histo[*next] += 1,
                Some(Action::Reduce(n_prod)) => {
                    reduce_histo[*n_prod] += 1;
                    // Deterministic error replacement: the lowest production
                    // index present in the row.
                    reduce_star = Some(reduce_star.map_or(*n_prod, |r: usize| r.min(*n_prod)));
                }
                Some(Action::Error) => error_count += 1,
            }
        }

        let (shift_best, shift_max) = argmax(&shift_histo);
        let mut default = Action::Shift(shift_best);
        if reduce_star.is_some() {
            let (reduce_best, reduce_max) = argmax(&reduce_histo);
            // Undefined cells count toward the reduce side: they all become
            // the replacement reduce if the default stays a shift, and
            // vanish entirely under a default reduce.
            if reduce_max + undef_count > shift_max {
                default = Action::Reduce(reduce_best);
            }
        } else if undef_count + error_count > shift_max {
            default = Action::Error;
        }

        let offset = table.data.len();
        table.index[n_state] = offset;
        for (t, cell) in row.iter().enumerate() {
            match (cell, reduce_star) {
                (None, Some(replacement)) => {
                    if matches!(default, Action::Shift(_)) {
                        table.data.push((t as i32, Action::Reduce(replacement)));
                    }
                }
                (None, None) => {
                    if default != Action::Error {
                        table.data.push((t as i32, Action::Error));
                    }
                }
                (Some(action), _) => {
                    if *action != default {
                        table.data.push((t as i32, *action));
                    }
                }
            }
        }
        table.data.push((-1, default));
        seen.insert(row.as_slice(), offset);

        let row_size = table.data.len() - offset;
        max = max.max(row_size);
        sum += row_size;
        rows += 1;
    }

    let stats = RowStats {
        max,
        avg: sum / rows.max(1),
    };
    tracing::info!(
        "{}: - action table row size: max {}, avg {}",
        g.file_name(),
        stats.max,
        stats.avg
    );
    (table, stats)
}

pub fn compress_gotos(g: &Grammar, automaton: &Automaton) -> (CompressedTable<usize>, RowStats) {
    let state_count = automaton.gotos.len();
    let mut table = CompressedTable {
        index: vec![0; g.nonterm_count()],
        data: Vec::new(),
    };
    let mut max = 0;
    let mut sum = 0;

    for n in 0..g.nonterm_count() {
        let mut histo = vec![0usize; state_count];
        for row in &automaton.gotos {
            if row[n] > 0 {
                histo[row[n]] += 1;
            }
        }
        let (most_frequent, _) = argmax(&histo);

        let offset = table.data.len();
        table.index[n] = offset;
        for (n_state, row) in automaton.gotos.iter().enumerate() {
            if row[n] > 0 && row[n] != most_frequent {
                table.data.push((n_state as i32, row[n]));
            }
        }
        table.data.push((-1, most_frequent));

        let row_size = table.data.len() - offset;
        max = max.max(row_size);
        sum += row_size;
    }

    let stats = RowStats {
        max,
        avg: sum / g.nonterm_count().max(1),
    };
    tracing::info!(
        "{}: - goto table row size: max {}, avg {}",
        g.file_name(),
        stats.max,
        stats.avg
    );
    (table, stats)
}

fn argmax(histo: &[usize]) -> (usize, usize) {
    let mut best = 0;
    let mut best_count = 0;
    for (i, &count) in histo.iter().enumerate() {
        if count > best_count {
            best = i;
            best_count = count;
        }
    }
    (best, best_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{SymbolId, TokenId},
        lalr::{actions, first::FirstSets, lookahead, lr0::build_states},
    };

    fn build(g: &Grammar) -> Automaton {
        let fs = FirstSets::new(g);
        let mut automaton = build_states(g, &fs).unwrap();
        lookahead::propagate(g, &fs, &mut automaton).unwrap();
        actions::synthesize(g, &fs, &mut automaton).unwrap();
        automaton
    }

    // S -> E 'x' ; E -> E '+' T | T ; T -> 'a' | 'b'
    fn grammar() -> Grammar {
        let mut g = Grammar::new("test.gr");
        let s = g.add_nonterm("S").unwrap().0.as_nonterm().unwrap();
        let e = g.add_nonterm("E").unwrap().0.as_nonterm().unwrap();
        let t = g.add_nonterm("T").unwrap().0.as_nonterm().unwrap();
        let tok = |c: u8| SymbolId::Token(TokenId::from_raw(c as u16));
        g.add_production(s, vec![SymbolId::Nonterm(e), tok(b'x')], None)
            .unwrap();
        g.add_production(
            e,
            vec![SymbolId::Nonterm(e), tok(b'+'), SymbolId::Nonterm(t)],
            None,
        )
        .unwrap();
        g.add_production(e, vec![SymbolId::Nonterm(t)], None).unwrap();
        g.add_production(t, vec![tok(b'a')], None).unwrap();
        g.add_production(t, vec![tok(b'b')], None).unwrap();
        g.add_start_condition("initial");
        g
    }

    /// Reconstruct the dense row the engine would observe and compare it
    /// with the raw row after error absorption.
    #[test]
    fn compressed_rows_decode_to_raw_rows_after_absorption() {
        let g = grammar();
        let automaton = build(&g);
        let (table, _) = compress_actions(&g, &automaton);

        for (n_state, row) in automaton.actions.iter().enumerate() {
            let reduce_star = row
                .iter()
                .filter_map(|cell| match cell {
                    Some(Action::Reduce(p)) => Some(*p),
                    _ => None,
                })
                .min();
            let default = *table.lookup(n_state, -2);
            for (t, cell) in row.iter().enumerate() {
                // Error absorption: an undefined cell becomes the row's
                // default reduce when the default is a reduce, and the
                // replacement reduce otherwise.
                let expected = match (cell, reduce_star) {
                    (None, Some(r)) => match default {
                        Action::Reduce(d) => Action::Reduce(d),
                        _ => Action::Reduce(r),
                    },
                    (None, None) => Action::Error,
                    (Some(action), _) => *action,
                };
                let decoded = *table.lookup(n_state, t as i32);
                assert_eq!(decoded, expected, "state {n_state}, token {t}");
            }
        }
    }

    #[test]
    fn no_explicit_entry_equals_the_row_default() {
        let g = grammar();
        let automaton = build(&g);
        let (table, _) = compress_actions(&g, &automaton);

        for n_state in 0..automaton.states.len() {
            let start = table.index[n_state];
            let default = table.data[start..]
                .iter()
                .find(|(k, _)| *k < 0)
                .map(|(_, v)| *v)
                .unwrap();
            for (k, v) in table.data[start..].iter().take_while(|(k, _)| *k >= 0) {
                assert_ne!(*v, default, "state {n_state}, key {k}");
            }
        }
    }

    #[test]
    fn identical_rows_share_an_offset() {
        // Both alternatives of B park the dot before the nullable A with the
        // same follow set, so the states after 'p' and after 'r' carry
        // identical action rows (reduce A -> ε on 'q') under different
        // kernels.
        let mut g = Grammar::new("test.gr");
        let s = g.add_nonterm("S").unwrap().0.as_nonterm().unwrap();
        let b = g.add_nonterm("B").unwrap().0.as_nonterm().unwrap();
        let a = g.add_nonterm("A").unwrap().0.as_nonterm().unwrap();
        let tok = |c: u8| SymbolId::Token(TokenId::from_raw(c as u16));
        g.add_production(s, vec![SymbolId::Nonterm(b), tok(b'x')], None)
            .unwrap();
        g.add_production(b, vec![tok(b'p'), SymbolId::Nonterm(a), tok(b'q')], None)
            .unwrap();
        g.add_production(b, vec![tok(b'r'), SymbolId::Nonterm(a), tok(b'q')], None)
            .unwrap();
        g.add_production(a, vec![], None).unwrap();
        g.add_start_condition("initial");
        let automaton = build(&g);

        let find = |n_prod: usize| {
            automaton
                .states
                .iter()
                .position(|st| {
                    st.items.len() == 1
                        && st.items[0].position == crate::lalr::lr0::Position { n_prod, pos: 1 }
                })
                .unwrap()
        };
        let after_p = find(1);
        let after_r = find(2);
        assert_ne!(after_p, after_r);
        assert_eq!(
            automaton.actions[after_p], automaton.actions[after_r],
            "rows must match for the offsets to alias"
        );

        let (table, _) = compress_actions(&g, &automaton);
        assert_eq!(table.index[after_p], table.index[after_r]);
    }

    #[test]
    fn goto_default_absorbs_the_most_frequent_target() {
        let g = grammar();
        let automaton = build(&g);
        let (table, _) = compress_gotos(&g, &automaton);

        for n in 0..g.nonterm_count() {
            for (n_state, row) in automaton.gotos.iter().enumerate() {
                if row[n] > 0 {
                    assert_eq!(*table.lookup(n, n_state as i32), row[n]);
                }
            }
        }

        // T is reached from two states; exactly one of them can be the
        // explicit entry after the other becomes the default.
        let t_row_len = table
            .data
            .iter()
            .skip(table.index[2])
            .position(|(k, _)| *k < 0)
            .unwrap();
        assert!(t_row_len <= 1);
    }
}
