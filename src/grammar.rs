//! Grammar model: symbols, productions, precedence, start conditions.

use crate::{errors::Error, name_table::NameTable, types::Map, value_set::ValueSet};
use std::fmt;

/// Number of single-character tokens occupying the low id range.
pub const CHAR_COUNT: u16 = 0x100;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u16);

impl TokenId {
    /// End of input: the NUL character token. Seeds the lookahead of the
    /// augmenting production and is where the accept reduction fires.
    pub const EOI: Self = Self(0);
    /// `$empty`, the empty-string marker threaded through FIRST sets.
    pub const EMPTY: Self = Self(CHAR_COUNT);
    /// `$default`, the inherited-lookahead sentinel used while wiring the
    /// propagation graph.
    pub const DEFAULT: Self = Self(CHAR_COUNT + 1);
    /// `$error`, the error-recovery token the emitted engine shifts during
    /// panic-mode recovery.
    pub const ERROR: Self = Self(CHAR_COUNT + 2);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T#{}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NontermId(u16);

impl NontermId {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NontermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u16);

impl ActionId {
    /// Reserved "no action".
    pub const NONE: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A#{}", self.0)
    }
}

/// A single id space naming every grammar symbol. The kind/index split is
/// what the emitted numeric tables preserve; in memory the kinds stay typed.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolId {
    Token(TokenId),
    Nonterm(NontermId),
    Action(ActionId),
}

impl SymbolId {
    pub fn as_token(self) -> Option<TokenId> {
        match self {
            Self::Token(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_nonterm(self) -> Option<NontermId> {
        match self {
            Self::Nonterm(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(t) => t.fmt(f),
            Self::Nonterm(n) => n.fmt(f),
            Self::Action(a) => a.fmt(f),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
    Nonassoc,
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}

#[derive(Debug, Default)]
pub struct TokenInfo {
    pub is_used: bool,
    pub prec: Option<Precedence>,
}

#[derive(Debug)]
pub struct Production {
    pub lhs: NontermId,
    pub rhs: Vec<SymbolId>,
    /// Semantic action fired when this production is reduced.
    pub action: ActionId,
    /// Precedence level, explicit or derived from the last rhs token.
    pub prec: Option<u16>,
}

/// The in-memory grammar. Built once by the frontend, read-only afterwards.
#[derive(Debug)]
pub struct Grammar {
    file_name: String,
    tokens: Vec<TokenInfo>,
    nonterm_count: u32,
    action_count: u32,
    productions: Vec<Production>,
    start_conditions: Vec<(String, usize)>,
    defined_nonterms: ValueSet,
    used_nonterms: ValueSet,
    symbols: NameTable<SymbolId>,
    actions: NameTable<ActionId>,
    options: Map<String, String>,
}

impl Grammar {
    pub fn new(file_name: impl Into<String>) -> Self {
        let mut tokens = Vec::with_capacity(CHAR_COUNT as usize + 3);
        tokens.resize_with(CHAR_COUNT as usize + 3, TokenInfo::default);
        // The error token takes part in state construction even when no rule
        // mentions it.
        tokens[TokenId::ERROR.0 as usize].is_used = true;

        let mut symbols = NameTable::default();
        symbols.insert("$empty".to_owned(), SymbolId::Token(TokenId::EMPTY));
        symbols.insert("$default".to_owned(), SymbolId::Token(TokenId::DEFAULT));
        symbols.insert("$error".to_owned(), SymbolId::Token(TokenId::ERROR));

        Self {
            file_name: file_name.into(),
            tokens,
            nonterm_count: 0,
            action_count: 1,
            productions: Vec::new(),
            start_conditions: Vec::new(),
            defined_nonterms: ValueSet::new(),
            used_nonterms: ValueSet::new(),
            symbols,
            actions: NameTable::default(),
            options: Map::default(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Intern a named token. Idempotent on duplicate names: the existing
    /// binding is returned with `false`, whatever its kind.
    pub fn add_token(&mut self, name: &str) -> Result<(SymbolId, bool), Error> {
        if self.tokens.len() > ValueSet::MAX_VALUE as usize {
            return Err(Error::LimitExceeded("tokens"));
        }
        let id = TokenId(self.tokens.len() as u16);
        let (sym, fresh) = self.symbols.insert(name.to_owned(), SymbolId::Token(id));
        if fresh {
            self.tokens.push(TokenInfo::default());
        }
        Ok((sym, fresh))
    }

    pub fn add_nonterm(&mut self, name: &str) -> Result<(SymbolId, bool), Error> {
        self.intern_nonterm(name.to_owned())
    }

    fn intern_nonterm(&mut self, name: String) -> Result<(SymbolId, bool), Error> {
        if self.nonterm_count > ValueSet::MAX_VALUE as u32 {
            return Err(Error::LimitExceeded("nonterminals"));
        }
        let id = NontermId(self.nonterm_count as u16);
        let (sym, fresh) = self.symbols.insert(name, SymbolId::Nonterm(id));
        if fresh {
            self.nonterm_count += 1;
        }
        Ok((sym, fresh))
    }

    pub fn add_action(&mut self, name: &str) -> Result<(ActionId, bool), Error> {
        if self.action_count > ValueSet::MAX_VALUE as u32 {
            return Err(Error::LimitExceeded("actions"));
        }
        let id = ActionId(self.action_count as u16);
        let (id, fresh) = self.actions.insert(name.to_owned(), id);
        if fresh {
            self.action_count += 1;
        }
        Ok((id, fresh))
    }

    /// Assign precedence and associativity to a token. Once set the values
    /// are final; a second assignment is refused.
    pub fn set_token_prec(&mut self, id: TokenId, prec: Precedence) -> bool {
        let info = &mut self.tokens[id.0 as usize];
        if info.prec.is_some() {
            return false;
        }
        *info = TokenInfo {
            is_used: true,
            prec: Some(prec),
        };
        true
    }

    /// Append a production.
    ///
    /// When no explicit precedence is given it is derived from the last
    /// token of the rhs. Every non-final action symbol is lifted onto a
    /// fresh `@k → ε` production so it fires as a reduction at exactly its
    /// written position; a final action symbol becomes the production's own
    /// action.
    pub fn add_production(
        &mut self,
        lhs: NontermId,
        mut rhs: Vec<SymbolId>,
        explicit_prec: Option<u16>,
    ) -> Result<&Production, Error> {
        let prec = explicit_prec.or_else(|| {
            rhs.iter()
                .rev()
                .find_map(|sym| sym.as_token())
                .and_then(|t| self.tokens[t.0 as usize].prec)
                .map(|p| p.priority)
        });

        let mut action = ActionId::NONE;
        if !rhs.is_empty() {
            for i in 0..rhs.len() - 1 {
                if let SymbolId::Action(a) = rhs[i] {
                    let (sym, _) = self.intern_nonterm(format!("@{}", self.nonterm_count))?;
                    let mid = match sym {
                        SymbolId::Nonterm(n) => n,
                        _ => unreachable!("mid-rule names cannot collide with user symbols"),
                    };
                    self.productions.push(Production {
                        lhs: mid,
                        rhs: Vec::new(),
                        action: a,
                        prec: None,
                    });
                    self.defined_nonterms.insert(mid.0);
                    rhs[i] = SymbolId::Nonterm(mid);
                }
            }
            if let Some(&SymbolId::Action(a)) = rhs.last() {
                action = a;
                rhs.pop();
            }
        }

        self.defined_nonterms.insert(lhs.0);
        for sym in &rhs {
            match sym {
                SymbolId::Nonterm(n) => {
                    self.used_nonterms.insert(n.0);
                }
                SymbolId::Token(t) => {
                    self.tokens[t.0 as usize].is_used = true;
                }
                SymbolId::Action(_) => unreachable!("actions are lifted before this point"),
            }
        }

        let n = self.productions.len();
        self.productions.push(Production {
            lhs,
            rhs,
            action,
            prec,
        });
        Ok(&self.productions[n])
    }

    pub fn add_start_condition(&mut self, name: &str) -> bool {
        if self.start_conditions.iter().any(|(sc, _)| sc == name) {
            return false;
        }
        self.start_conditions.push((name.to_owned(), 0));
        true
    }

    pub fn set_start_condition_prod(&mut self, name: &str, n_prod: usize) -> bool {
        match self.start_conditions.iter_mut().find(|(sc, _)| sc == name) {
            Some(slot) => {
                slot.1 = n_prod;
                true
            }
            None => false,
        }
    }

    pub fn set_option(&mut self, name: &str, value: &str) {
        self.options.insert(name.to_owned(), value.to_owned());
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_info(&self, id: TokenId) -> &TokenInfo {
        &self.tokens[id.0 as usize]
    }

    pub fn nonterm_count(&self) -> usize {
        self.nonterm_count as usize
    }

    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    pub fn production(&self, n_prod: usize) -> &Production {
        &self.productions[n_prod]
    }

    pub fn productions(&self) -> impl Iterator<Item = (usize, &Production)> + '_ {
        self.productions.iter().enumerate()
    }

    pub fn start_conditions(&self) -> &[(String, usize)] {
        &self.start_conditions
    }

    pub fn defined_nonterms(&self) -> &ValueSet {
        &self.defined_nonterms
    }

    pub fn used_nonterms(&self) -> &ValueSet {
        &self.used_nonterms
    }

    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.find(name)
    }

    pub fn find_action(&self, name: &str) -> Option<ActionId> {
        self.actions.find(name)
    }

    pub fn symbol_name(&self, sym: SymbolId) -> Option<&str> {
        self.symbols.name(sym)
    }

    pub fn action_name(&self, id: ActionId) -> Option<&str> {
        self.actions.name(id)
    }

    /// Declared tokens in id order, for the emitted header. Single-character
    /// and `$`-predefined tokens are skipped.
    pub fn token_list(&self) -> Vec<(&str, u16)> {
        (CHAR_COUNT..self.tokens.len() as u16)
            .filter_map(|raw| {
                let name = self.symbols.name(SymbolId::Token(TokenId(raw)))?;
                (!name.starts_with('$')).then_some((name, raw))
            })
            .collect()
    }

    /// Declared actions in id order, for the emitted header.
    pub fn action_list(&self) -> Vec<(&str, u16)> {
        (1..self.action_count as u16)
            .filter_map(|raw| self.actions.name(ActionId(raw)).map(|name| (name, raw)))
            .collect()
    }

    /// Printable form of a symbol: single-character tokens as quoted,
    /// escaped characters, everything else by name.
    pub fn symbol_text(&self, sym: SymbolId) -> String {
        if let SymbolId::Token(t) = sym {
            if t.0 < CHAR_COUNT {
                return format!("'{}'", escape_char(t.0 as u8));
            }
        }
        match sym {
            SymbolId::Action(a) => self.action_name(a).unwrap_or("<bogus>").to_owned(),
            _ => self.symbol_name(sym).unwrap_or("<bogus>").to_owned(),
        }
    }

    /// Like [`Self::symbol_text`], with grammar-file decoration: `[token]`
    /// for named tokens and `{action}` for actions.
    pub fn decorated_symbol_text(&self, sym: SymbolId) -> String {
        match sym {
            SymbolId::Action(a) => {
                format!("{{{}}}", self.action_name(a).unwrap_or("<bogus>"))
            }
            SymbolId::Token(t) if t.0 >= CHAR_COUNT => {
                let name = self.symbol_name(sym).unwrap_or("<bogus>");
                if name.starts_with('$') {
                    name.to_owned()
                } else {
                    format!("[{}]", name)
                }
            }
            _ => self.symbol_text(sym),
        }
    }

    /// Display a production as `lhs -> a b c`, optionally with a dot at
    /// `pos`.
    pub fn display_production(&self, n_prod: usize, pos: Option<usize>) -> impl fmt::Display + '_ {
        ProductionDisplay {
            g: self,
            n_prod,
            pos,
        }
    }
}

struct ProductionDisplay<'g> {
    g: &'g Grammar,
    n_prod: usize,
    pos: Option<usize>,
}

impl fmt::Display for ProductionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { g, n_prod, pos } = self;
        let prod = &g.productions[*n_prod];
        write!(
            f,
            "{} ->",
            g.symbol_name(SymbolId::Nonterm(prod.lhs))
                .unwrap_or("<bogus>")
        )?;
        for (i, &sym) in prod.rhs.iter().enumerate() {
            if *pos == Some(i) {
                f.write_str(" .")?;
            }
            write!(f, " {}", g.decorated_symbol_text(sym))?;
        }
        if *pos == Some(prod.rhs.len()) {
            f.write_str(" .")?;
        }
        Ok(())
    }
}

fn escape_char(ch: u8) -> String {
    match ch {
        0 => "\\0".to_owned(),
        b'\n' => "\\n".to_owned(),
        b'\t' => "\\t".to_owned(),
        0x0b => "\\v".to_owned(),
        0x08 => "\\b".to_owned(),
        b'\r' => "\\r".to_owned(),
        0x0c => "\\f".to_owned(),
        0x07 => "\\a".to_owned(),
        b'\\' => "\\\\".to_owned(),
        b'\'' => "\\'".to_owned(),
        b'"' => "\\\"".to_owned(),
        ch if ch < 0x20 || ch >= 0x7f => format!("\\x{:x}", ch),
        ch => (ch as char).to_string(),
    }
}
