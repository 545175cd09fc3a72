//! Human-readable grammar and automaton report.

use crate::{
    grammar::{ActionId, Assoc, Grammar, NontermId, SymbolId, TokenId},
    lalr::{lr0::Action, BuildOutput},
};
use std::io::{self, Write};

pub fn write_report<W: Write>(w: &mut W, g: &Grammar, out: &BuildOutput) -> io::Result<()> {
    write_tokens(w, g)?;
    write_nonterms(w, g)?;
    write_actions(w, g)?;
    write_grammar(w, g)?;
    write_first_table(w, g, out)?;
    write_aeta_table(w, g, out)?;
    write_states(w, g, out)
}

fn write_tokens<W: Write>(w: &mut W, g: &Grammar) -> io::Result<()> {
    writeln!(w, "---=== Tokens : ===---")?;
    writeln!(w)?;
    for raw in 0..g.token_count() as u16 {
        let id = TokenId::from_raw(raw);
        let info = g.token_info(id);
        if !info.is_used {
            continue;
        }
        write!(w, "    {} {}", g.symbol_text(SymbolId::Token(id)), raw)?;
        if let Some(prec) = info.prec {
            write!(w, " %prec {}", prec.priority)?;
            match prec.assoc {
                Assoc::Nonassoc => write!(w, " %nonassoc")?,
                Assoc::Left => write!(w, " %left")?,
                Assoc::Right => write!(w, " %right")?,
            }
        }
        writeln!(w)?;
    }
    writeln!(w)
}

fn write_nonterms<W: Write>(w: &mut W, g: &Grammar) -> io::Result<()> {
    writeln!(w, "---=== Nonterminals : ===---")?;
    writeln!(w)?;
    for n in 0..g.nonterm_count() {
        let sym = SymbolId::Nonterm(NontermId::from_raw(n as u16));
        writeln!(w, "    {} {}", g.symbol_name(sym).unwrap_or("<bogus>"), n)?;
    }
    writeln!(w)
}

fn write_actions<W: Write>(w: &mut W, g: &Grammar) -> io::Result<()> {
    writeln!(w, "---=== Actions : ===---")?;
    writeln!(w)?;
    for (name, id) in g.action_list() {
        writeln!(w, "    {} {}", name, id)?;
    }
    writeln!(w)
}

fn write_grammar<W: Write>(w: &mut W, g: &Grammar) -> io::Result<()> {
    writeln!(w, "---=== Grammar : ===---")?;
    writeln!(w)?;
    for (n_prod, prod) in g.productions() {
        write!(w, "    ({}) {}", n_prod, g.display_production(n_prod, None))?;
        if prod.action != ActionId::NONE {
            write!(
                w,
                " {{{}}}",
                g.action_name(prod.action).unwrap_or("<bogus>")
            )?;
        }
        if let Some(prec) = prod.prec {
            write!(w, " %prec {}", prec)?;
        }
        writeln!(w)?;
    }
    writeln!(w)
}

fn write_first_table<W: Write>(w: &mut W, g: &Grammar, out: &BuildOutput) -> io::Result<()> {
    writeln!(w, "---=== FIRST table : ===---")?;
    writeln!(w)?;
    for n in 0..g.nonterm_count() {
        let id = NontermId::from_raw(n as u16);
        write!(
            w,
            "    FIRST({}) = {{ ",
            g.symbol_name(SymbolId::Nonterm(id)).unwrap_or("<bogus>")
        )?;
        for (i, raw) in out.first_sets.first(id).iter().enumerate() {
            if i > 0 {
                write!(w, ", ")?;
            }
            write!(w, "{}", g.symbol_text(SymbolId::Token(TokenId::from_raw(raw))))?;
        }
        writeln!(w, " }}")?;
    }
    writeln!(w)
}

fn write_aeta_table<W: Write>(w: &mut W, g: &Grammar, out: &BuildOutput) -> io::Result<()> {
    writeln!(w, "---=== Aeta table : ===---")?;
    writeln!(w)?;
    for n in 0..g.nonterm_count() {
        let id = NontermId::from_raw(n as u16);
        write!(
            w,
            "    Aeta({}) = {{ ",
            g.symbol_name(SymbolId::Nonterm(id)).unwrap_or("<bogus>")
        )?;
        for (i, raw) in out.first_sets.aeta(id).iter().enumerate() {
            if i > 0 {
                write!(w, ", ")?;
            }
            write!(
                w,
                "{}",
                g.symbol_name(SymbolId::Nonterm(NontermId::from_raw(raw)))
                    .unwrap_or("<bogus>")
            )?;
        }
        writeln!(w, " }}")?;
    }
    writeln!(w)
}

fn write_states<W: Write>(w: &mut W, g: &Grammar, out: &BuildOutput) -> io::Result<()> {
    writeln!(w, "---=== LALR analyser states : ===---")?;
    writeln!(w)?;
    for (n_state, state) in out.automaton.states.iter().enumerate() {
        writeln!(w, "State {}:", n_state)?;
        for item in &state.items {
            write!(
                w,
                "    ({}) {} [",
                item.position.n_prod,
                g.display_production(item.position.n_prod, Some(item.position.pos))
            )?;
            for raw in item.la.iter() {
                write!(w, " {}", g.symbol_text(SymbolId::Token(TokenId::from_raw(raw))))?;
            }
            writeln!(w, " ]")?;
        }
        writeln!(w)?;

        let row_start = out.action_table.index[n_state];
        for (key, action) in &out.action_table.data[row_start..] {
            let token = if *key < 0 {
                TokenId::DEFAULT
            } else {
                TokenId::from_raw(*key as u16)
            };
            write_action(w, g, token, *action)?;
            if *key < 0 {
                break;
            }
        }
        writeln!(w)?;

        for n in 0..g.nonterm_count() {
            let target = out.goto_table.lookup(n, n_state as i32);
            writeln!(
                w,
                "    {}, goto state {}",
                g.symbol_name(SymbolId::Nonterm(NontermId::from_raw(n as u16)))
                    .unwrap_or("<bogus>"),
                target
            )?;
        }
        writeln!(w)?;
    }
    Ok(())
}

fn write_action<W: Write>(w: &mut W, g: &Grammar, token: TokenId, action: Action) -> io::Result<()> {
    write!(w, "    {}, ", g.symbol_text(SymbolId::Token(token)))?;
    match action {
        Action::Shift(next) => writeln!(w, "shift and goto state {}", next),
        Action::Error => writeln!(w, "error"),
        Action::Reduce(0) => writeln!(w, "accept"),
        Action::Reduce(n_prod) => writeln!(w, "reduce using rule {}", n_prod),
    }
}
