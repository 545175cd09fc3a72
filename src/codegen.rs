//! Emission of the definitions header and the analyzer tables.
//!
//! The numeric encoding is the emitted engine's contract: a shift is
//! `(state << 1) | 1`, a reduce is `(3 * n_prod) << 1` so the code's high
//! bits index `reduce_info` directly, an error is `-1`. Row offsets are
//! pre-multiplied by 2 because every list entry is a `(key, value)` pair.

use crate::{
    grammar::{Grammar, TokenId},
    lalr::{lr0::Action, BuildOutput},
};
use std::io::{self, Write};

/// The four integer arrays of `parser_analyzer.inl`.
#[derive(Debug, PartialEq, Eq)]
pub struct Tables {
    pub action_idx: Vec<i32>,
    pub action_list: Vec<i32>,
    pub reduce_info: Vec<i32>,
    pub goto_list: Vec<i32>,
}

impl Tables {
    pub fn new(g: &Grammar, out: &BuildOutput) -> Self {
        let action_idx = out
            .action_table
            .index
            .iter()
            .map(|&offset| 2 * offset as i32)
            .collect();

        let mut action_list = Vec::with_capacity(2 * out.action_table.data.len());
        for (key, action) in &out.action_table.data {
            action_list.push(*key);
            action_list.push(action_code(*action));
        }

        let mut reduce_info = Vec::with_capacity(3 * g.production_count());
        for (_, prod) in g.productions() {
            reduce_info.push(prod.rhs.len() as i32);
            reduce_info.push(2 * out.goto_table.index[prod.lhs.index()] as i32);
            reduce_info.push(prod.action.into_raw() as i32);
        }

        let mut goto_list = Vec::with_capacity(2 * out.goto_table.data.len());
        for (key, target) in &out.goto_table.data {
            goto_list.push(*key);
            goto_list.push(*target as i32);
        }

        Self {
            action_idx,
            action_list,
            reduce_info,
            goto_list,
        }
    }
}

fn action_code(action: Action) -> i32 {
    const SHIFT_FLAG: i32 = 1;
    match action {
        Action::Shift(next) => ((next as i32) << 1) | SHIFT_FLAG,
        Action::Reduce(n_prod) => (3 * n_prod as i32) << 1,
        Action::Error => -1,
    }
}

/// Write `parser_defs.h`: the token, action and start-condition enums.
/// Consecutive ids compress to initializer-free enumerators.
pub fn write_defs<W: Write>(w: &mut W, g: &Grammar) -> io::Result<()> {
    writeln!(w, "/* Parsegen autogenerated definition file - do not edit! */")?;
    writeln!(w, "/* clang-format off */")?;

    writeln!(w)?;
    writeln!(w, "enum {{")?;
    writeln!(w, "    predef_tt_error = {},", TokenId::ERROR.into_raw())?;
    let mut last_id = TokenId::ERROR.into_raw();
    for (name, id) in g.token_list() {
        write!(w, "    tt_{}", name)?;
        if id > last_id + 1 {
            write!(w, " = {}", id)?;
        }
        writeln!(w, ",")?;
        last_id = id;
    }
    writeln!(w, "    total_token_count")?;
    writeln!(w, "}};")?;

    writeln!(w)?;
    writeln!(w, "enum {{")?;
    writeln!(w, "    predef_act_shift = 0,")?;
    writeln!(w, "    predef_act_reduce = 1,")?;
    // Emitted action values are id + 1 so that action 0 and
    // `predef_act_reduce` stay distinct.
    let mut last_id = 0u16;
    for (name, id) in g.action_list() {
        write!(w, "    act_{}", name)?;
        if id != last_id + 1 {
            write!(w, " = {}", id + 1)?;
        }
        writeln!(w, ",")?;
        last_id = id;
    }
    writeln!(w, "    total_action_count")?;
    writeln!(w, "}};")?;

    let start_conditions = g.start_conditions();
    if !start_conditions.is_empty() {
        writeln!(w)?;
        writeln!(w, "enum {{")?;
        if start_conditions.len() > 1 {
            writeln!(w, "    sc_{} = 0,", start_conditions[0].0)?;
            for (name, _) in &start_conditions[1..start_conditions.len() - 1] {
                writeln!(w, "    sc_{},", name)?;
            }
            writeln!(w, "    sc_{}", start_conditions[start_conditions.len() - 1].0)?;
        } else {
            writeln!(w, "    sc_{} = 0", start_conditions[0].0)?;
        }
        writeln!(w, "}};")?;
    }

    Ok(())
}

/// Write `parser_analyzer.inl`: the table arrays and the engine skeleton.
pub fn write_analyzer<W: Write>(w: &mut W, tables: &Tables) -> io::Result<()> {
    writeln!(w, "/* Parsegen autogenerated analyzer file - do not edit! */")?;
    writeln!(w, "/* clang-format off */")?;
    write_array(w, "action_idx", &tables.action_idx)?;
    write_array(w, "action_list", &tables.action_list)?;
    write_array(w, "reduce_info", &tables.reduce_info)?;
    write_array(w, "goto_list", &tables.goto_list)?;
    write_engine(w)
}

fn write_array<W: Write>(w: &mut W, name: &str, values: &[i32]) -> io::Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    const LINE_LIMIT: usize = 120;
    writeln!(w)?;
    writeln!(w, "static int {}[{}] = {{", name, values.len())?;
    let mut line = format!("    {}", values[0]);
    for value in &values[1..] {
        let sval = value.to_string();
        if line.len() + sval.len() + 3 > LINE_LIMIT {
            writeln!(w, "{},", line)?;
            line = format!("    {}", sval);
        } else {
            line.push_str(", ");
            line.push_str(&sval);
        }
    }
    writeln!(w, "{}", line)?;
    writeln!(w, "}};")
}

/// The embedded parsing-engine skeleton, emitted verbatim. It scans its
/// state's action row linearly (default on the sentinel), branches on the
/// shift bit, and walks the stack downward shifting `$error` for
/// panic-mode recovery on negative actions.
const ENGINE_TEXT: &[&str] = &[
    "static int parse(int tt, int* sptr0, int** p_sptr, int rise_error) {",
    "    enum { kShiftFlag = 1, kFlagCount = 1 };",
    "    int action = rise_error;",
    "    if (action >= 0) {",
    "        const int* action_tbl = &action_list[action_idx[*(*p_sptr - 1)]];",
    "        while (action_tbl[0] >= 0 && action_tbl[0] != tt) { action_tbl += 2; }",
    "        action = action_tbl[1];",
    "    }",
    "    if (action >= 0) {",
    "        if (!(action & kShiftFlag)) {",
    "            const int* info = &reduce_info[action >> kFlagCount];",
    "            const int* goto_tbl = &goto_list[info[1]];",
    "            int state = *((*p_sptr -= info[0]) - 1);",
    "            while (goto_tbl[0] >= 0 && goto_tbl[0] != state) { goto_tbl += 2; }",
    "            *(*p_sptr)++ = goto_tbl[1];",
    "            return predef_act_reduce + info[2];",
    "        }",
    "        *(*p_sptr)++ = action >> kFlagCount;",
    "        return predef_act_shift;",
    "    }",
    "    /* Roll back to state, which can accept error */",
    "    do {",
    "        const int* action_tbl = &action_list[action_idx[*(*p_sptr - 1)]];",
    "        while (action_tbl[0] >= 0 && action_tbl[0] != predef_tt_error) { action_tbl += 2; }",
    "        if (action_tbl[1] >= 0 && (action_tbl[1] & kShiftFlag)) { /* Can recover */",
    "            *(*p_sptr)++ = action_tbl[1] >> kFlagCount;           /* Shift error token */",
    "            break;",
    "        }",
    "    } while (--*p_sptr != sptr0);",
    "    return action;",
    "}",
];

fn write_engine<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(w)?;
    for line in ENGINE_TEXT {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_follow_the_engine_contract() {
        assert_eq!(action_code(Action::Shift(5)), 11);
        assert_eq!(action_code(Action::Reduce(0)), 0);
        assert_eq!(action_code(Action::Reduce(2)), 12);
        assert_eq!(action_code(Action::Error), -1);
        // The shift bit discriminates the two non-error encodings.
        assert_eq!(action_code(Action::Shift(5)) & 1, 1);
        assert_eq!(action_code(Action::Reduce(2)) & 1, 0);
    }

    #[test]
    fn arrays_wrap_at_the_line_limit() {
        let values: Vec<i32> = (0..200).map(|i| i * 1000).collect();
        let mut buf = Vec::new();
        write_array(&mut buf, "test_array", &values).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("\nstatic int test_array[200] = {\n"));
        assert!(text.ends_with("};\n"));
        for line in text.lines() {
            assert!(line.len() <= 120, "overlong line: {line}");
        }
        // Every value survives the round trip.
        let parsed: Vec<i32> = text
            .lines()
            .filter(|l| l.starts_with("    "))
            .flat_map(|l| l.trim().trim_end_matches(',').split(", "))
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(parsed, values);
    }

    #[test]
    fn empty_arrays_are_omitted() {
        let mut buf = Vec::new();
        write_array(&mut buf, "nothing", &[]).unwrap();
        assert!(buf.is_empty());
    }
}
