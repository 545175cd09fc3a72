//! The LALR(1) table-construction pipeline.
//!
//! Strictly staged: FIRST/Aη fixed points, LR(0) state enumeration,
//! lookahead propagation, action synthesis, table compression. Each stage
//! hands borrow-only data to the next; the grammar itself is read-only
//! throughout.

pub mod actions;
pub mod compress;
pub mod first;
pub mod lookahead;
pub mod lr0;

use self::{
    actions::ConflictCounts,
    compress::{CompressedTable, RowStats},
    first::FirstSets,
    lr0::{Action, Automaton},
};
use crate::{errors::Error, grammar::Grammar};

/// Everything later stages (emitter, report) consume.
#[derive(Debug)]
pub struct BuildOutput {
    pub first_sets: FirstSets,
    pub automaton: Automaton,
    pub conflicts: ConflictCounts,
    pub action_table: CompressedTable<Action>,
    pub action_stats: RowStats,
    pub goto_table: CompressedTable<usize>,
    pub goto_stats: RowStats,
}

impl BuildOutput {
    pub fn state_count(&self) -> usize {
        self.automaton.states.len()
    }
}

/// Run the full pipeline over a frozen grammar.
pub fn build(g: &Grammar) -> Result<BuildOutput, Error> {
    let first_sets = FirstSets::new(g);
    let mut automaton = lr0::build_states(g, &first_sets)?;
    lookahead::propagate(g, &first_sets, &mut automaton)?;
    let conflicts = actions::synthesize(g, &first_sets, &mut automaton)?;
    let (action_table, action_stats) = compress::compress_actions(g, &automaton);
    let (goto_table, goto_stats) = compress::compress_gotos(g, &automaton);

    Ok(BuildOutput {
        first_sets,
        automaton,
        conflicts,
        action_table,
        action_stats,
        goto_table,
        goto_stats,
    })
}
