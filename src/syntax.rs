//! The grammar-file frontend: a recursive-descent parser driving the
//! scanner and populating the grammar.
//!
//! The input is a definitions section (`%token`, `%action`, `%start`,
//! `%option`, precedence declarations), a `%%` separator and a rules
//! section; a second `%%` or the end of input ends the rules. Every check
//! the builder relies on happens here, so the grammar handed to the
//! pipeline is frozen and well-formed.

pub mod lexer;

use self::lexer::{Lexer, Token};
use crate::{
    diagnostics::SourceFile,
    errors::{Error, GrammarError},
    grammar::{Assoc, Grammar, NontermId, Precedence, SymbolId, TokenId},
};
use std::ops::Range;

pub fn parse(file_name: &str, source: &str) -> Result<Grammar, Error> {
    let sf = SourceFile::new(source);
    let mut tokens = Vec::new();
    for item in Lexer::new(source) {
        match item {
            Ok(entry) => tokens.push(entry),
            Err(err) => {
                return Err(GrammarError::at(
                    "unrecognized or unterminated token",
                    sf.loc(err.span),
                )
                .into())
            }
        }
    }

    let parser = Parser {
        g: Grammar::new(file_name),
        sf: &sf,
        source_len: source.len(),
        tokens,
        cursor: 0,
        last_span: 0..0,
    };
    parser.parse()
}

struct Parser<'s> {
    g: Grammar,
    sf: &'s SourceFile<'s>,
    source_len: usize,
    tokens: Vec<(Token<'s>, Range<usize>)>,
    cursor: usize,
    last_span: Range<usize>,
}

impl<'s> Parser<'s> {
    fn parse(mut self) -> Result<Grammar, Error> {
        self.g.add_start_condition("initial");
        self.definitions()?;
        self.rules()?;
        self.check()?;
        Ok(self.g)
    }

    fn definitions(&mut self) -> Result<(), Error> {
        let mut prec_level = 0u16;
        loop {
            match self.next_token()? {
                Token::Sep => return Ok(()),
                Token::KwStart => {
                    let name = self.expect_ident()?;
                    if !self.g.add_start_condition(name) {
                        return Err(self.err("start condition is already defined"));
                    }
                }
                Token::KwToken => {
                    let name = self.expect_ident()?;
                    let (_, fresh) = self.g.add_token(name)?;
                    if !fresh {
                        return Err(self.err("token is already defined"));
                    }
                }
                Token::KwAction => {
                    let name = self.expect_ident()?;
                    let (_, fresh) = self.g.add_action(name)?;
                    if !fresh {
                        return Err(self.err("action is already defined"));
                    }
                }
                Token::KwOption => {
                    let name = self.expect_ident()?;
                    match self.next_token()? {
                        Token::StrLit(value) => self.g.set_option(name, &value),
                        _ => return Err(self.err("unexpected token")),
                    }
                }
                kw @ (Token::KwLeft | Token::KwRight | Token::KwNonassoc) => {
                    let assoc = match kw {
                        Token::KwLeft => Assoc::Left,
                        Token::KwRight => Assoc::Right,
                        _ => Assoc::Nonassoc,
                    };
                    self.precedence_declaration(prec_level, assoc)?;
                    prec_level += 1;
                }
                _ => return Err(self.err("unexpected token")),
            }
        }
    }

    fn precedence_declaration(&mut self, priority: u16, assoc: Assoc) -> Result<(), Error> {
        loop {
            let id = match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = *name;
                    self.advance();
                    match self.g.add_token(name)?.0 {
                        SymbolId::Token(t) => t,
                        _ => return Err(self.err("name is already used for nonterminals")),
                    }
                }
                Some(&Token::CharLit(c)) => {
                    self.advance();
                    TokenId::from_raw(c as u16)
                }
                _ => return Ok(()),
            };
            if !self.g.set_token_prec(id, Precedence { priority, assoc }) {
                return Err(self.err("token precedence is already defined"));
            }
        }
    }

    fn rules(&mut self) -> Result<(), Error> {
        loop {
            match self.next_token_opt() {
                None | Some(Token::Sep) => return Ok(()),
                Some(Token::Ident(name)) => self.rule(name)?,
                Some(_) => return Err(self.err("unexpected token")),
            }
        }
    }

    fn rule(&mut self, lhs_name: &'s str) -> Result<(), Error> {
        let (lhs_sym, _) = self.g.add_nonterm(lhs_name)?;
        let lhs = match lhs_sym {
            SymbolId::Nonterm(n) => n,
            _ => return Err(self.err("name is already used for tokens")),
        };

        let mut has_start_condition = false;
        if matches!(self.peek(), Some(Token::LAngle)) {
            self.advance();
            let name = self.expect_ident()?;
            let n_prod = self.g.production_count();
            if !self.g.set_start_condition_prod(name, n_prod) {
                return Err(self.err("undefined start condition"));
            }
            if !matches!(self.next_token()?, Token::RAngle) {
                return Err(self.err("unexpected token"));
            }
            has_start_condition = true;
        }

        if !matches!(self.next_token()?, Token::Colon) {
            return Err(self.err("unexpected token"));
        }

        loop {
            let (rhs, prec, terminator) = self.alternative()?;
            if has_start_condition {
                has_start_condition = false;
                if !matches!(rhs.last(), Some(SymbolId::Token(_))) {
                    return Err(self.err("start production must be terminated with a token"));
                }
            }
            self.g.add_production(lhs, rhs, prec)?;
            if matches!(terminator, Token::Semicolon) {
                return Ok(());
            }
        }
    }

    fn alternative(&mut self) -> Result<(Vec<SymbolId>, Option<u16>, Token<'s>), Error> {
        let mut rhs = Vec::new();
        let mut prec = None;
        loop {
            match self.next_token()? {
                Token::KwPrec => {
                    let id = match self.next_token()? {
                        Token::TokenRef(name) => match self.g.find_symbol(name) {
                            Some(SymbolId::Token(t)) => t,
                            _ => return Err(self.err("undefined token")),
                        },
                        Token::CharLit(c) => TokenId::from_raw(c as u16),
                        _ => return Err(self.err("unexpected token")),
                    };
                    prec = match self.g.token_info(id).prec {
                        Some(p) => Some(p.priority),
                        None => return Err(self.err("token precedence is not defined")),
                    };
                }
                Token::Ident(name) => {
                    let (sym, _) = self.g.add_nonterm(name)?;
                    if sym.as_nonterm().is_none() {
                        return Err(self.err("name is already used for tokens or actions"));
                    }
                    rhs.push(sym);
                }
                Token::TokenRef(name) => match self.g.find_symbol(name) {
                    Some(sym @ SymbolId::Token(_)) => rhs.push(sym),
                    _ => return Err(self.err("undefined token")),
                },
                Token::PredefIdent(name) => {
                    if name != "$error" {
                        return Err(self.err("unexpected token"));
                    }
                    rhs.push(SymbolId::Token(TokenId::ERROR));
                }
                Token::CharLit(c) => rhs.push(SymbolId::Token(TokenId::from_raw(c as u16))),
                Token::ActionRef(name) => match self.g.find_action(name) {
                    Some(a) => rhs.push(SymbolId::Action(a)),
                    None => return Err(self.err("undefined action")),
                },
                terminator @ (Token::VertBar | Token::Semicolon) => {
                    return Ok((rhs, prec, terminator))
                }
                _ => return Err(self.err("unexpected token")),
            }
        }
    }

    /// Whole-grammar checks once parsing is done.
    fn check(&self) -> Result<(), Error> {
        if self.g.production_count() == 0 {
            return Err(GrammarError::new("no productions defined").into());
        }

        for (name, n_prod) in self.g.start_conditions() {
            let prod = self.g.production(*n_prod);
            if !matches!(prod.rhs.last(), Some(SymbolId::Token(_))) {
                return Err(GrammarError::new(format!(
                    "implicit start production for `{}` start condition must be terminated with a token",
                    name
                ))
                .into());
            }
            if self.g.used_nonterms().contains(prod.lhs.into_raw()) {
                return Err(GrammarError::new(
                    "left part of start production must not be used in other productions",
                )
                .into());
            }
        }

        for n in (self.g.defined_nonterms() - self.g.used_nonterms()).iter() {
            let is_start_lhs = self
                .g
                .start_conditions()
                .iter()
                .any(|(_, n_prod)| self.g.production(*n_prod).lhs.into_raw() == n);
            if !is_start_lhs {
                tracing::warn!(
                    "{}: unused nonterminal `{}`",
                    self.g.file_name(),
                    self.nonterm_name(n),
                );
            }
        }

        if let Some(n) = (self.g.used_nonterms() - self.g.defined_nonterms()).iter().next() {
            return Err(GrammarError::new(format!(
                "undefined nonterminal `{}`",
                self.nonterm_name(n)
            ))
            .into());
        }

        Ok(())
    }

    fn nonterm_name(&self, raw: u16) -> &str {
        self.g
            .symbol_name(SymbolId::Nonterm(NontermId::from_raw(raw)))
            .unwrap_or("<bogus>")
    }

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.cursor).map(|(tok, _)| tok)
    }

    fn advance(&mut self) {
        if let Some((_, span)) = self.tokens.get(self.cursor) {
            self.last_span = span.clone();
            self.cursor += 1;
        }
    }

    fn next_token_opt(&mut self) -> Option<Token<'s>> {
        let (tok, span) = self.tokens.get(self.cursor)?.clone();
        self.last_span = span;
        self.cursor += 1;
        Some(tok)
    }

    fn next_token(&mut self) -> Result<Token<'s>, Error> {
        match self.next_token_opt() {
            Some(tok) => Ok(tok),
            None => Err(GrammarError::at(
                "unexpected end of file",
                self.sf.loc(self.source_len..self.source_len),
            )
            .into()),
        }
    }

    fn expect_ident(&mut self) -> Result<&'s str, Error> {
        match self.next_token()? {
            Token::Ident(name) => Ok(name),
            _ => Err(self.err("unexpected token")),
        }
    }

    fn err(&self, message: &str) -> Error {
        GrammarError::at(message, self.sf.loc(self.last_span.clone())).into()
    }
}
