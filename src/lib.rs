//! A tool for LALR-grammar based parser generation.
//!
//! Reads a grammar specification file and emits a compressed, table-driven
//! LALR(1) shift/reduce automaton, a C header of token and semantic-action
//! ids, and an embedded parsing-engine skeleton that consumes the tables at
//! run time.

pub mod codegen;
pub mod diagnostics;
pub mod errors;
pub mod grammar;
pub mod lalr;
pub mod name_table;
pub mod report;
pub mod syntax;
pub mod types;
pub mod value_set;
