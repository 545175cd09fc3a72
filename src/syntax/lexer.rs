//! Scanner for the grammar-file vocabulary.

use logos::Logos;
use std::ops::Range;

fn strip_delims<'s>(lex: &logos::Lexer<'s, Token<'s>>) -> &'s str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\x0c]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"//[^\n]*")]
pub enum Token<'source> {
    #[token("%token")]
    KwToken,
    #[token("%action")]
    KwAction,
    #[token("%start")]
    KwStart,
    #[token("%option")]
    KwOption,
    #[token("%left")]
    KwLeft,
    #[token("%right")]
    KwRight,
    #[token("%nonassoc")]
    KwNonassoc,
    #[token("%prec")]
    KwPrec,
    #[token("%%")]
    Sep,
    #[token(":")]
    Colon,
    #[token("|")]
    VertBar,
    #[token(";")]
    Semicolon,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'source str),

    /// `$empty`, `$error`, ... — the predefined id namespace.
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    PredefIdent(&'source str),

    /// `[name]` — a token reference inside a rule.
    #[regex(r"\[[A-Za-z_][A-Za-z0-9_]*\]", |lex| strip_delims(lex))]
    TokenRef(&'source str),

    /// `{name}` — a semantic-action reference inside a rule.
    #[regex(r"\{[A-Za-z_][A-Za-z0-9_]*\}", |lex| strip_delims(lex))]
    ActionRef(&'source str),

    /// `'c'` with C escapes, exactly one byte.
    #[regex(r"'(\\[^\n]|[^\\'\n])*'", |lex| {
        match unescape(strip_delims(lex)) {
            Some(bytes) if bytes.len() == 1 => Some(bytes[0]),
            _ => None,
        }
    })]
    CharLit(u8),

    /// `"..."` with the same escapes.
    #[regex(r#""(\\[^\n]|[^\\"\n])*""#, |lex| {
        unescape(strip_delims(lex)).map(|bytes| {
            bytes.iter().map(|&b| b as char).collect::<String>()
        })
    })]
    StrLit(String),
}

/// Decode C-style escapes: the single-letter forms, `\xH[H]` and `\o[oo]`;
/// any other escaped character stands for itself.
fn unescape(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        i += 1;
        let escape = *bytes.get(i)?;
        i += 1;
        let value = match escape {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 2 {
                    match bytes.get(i).and_then(|&b| (b as char).to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            i += 1;
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return None;
                }
                value as u8
            }
            b'0'..=b'7' => {
                let mut value = (escape - b'0') as u32;
                let mut digits = 1;
                while digits < 3 {
                    match bytes.get(i).and_then(|&b| (b as char).to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            i += 1;
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if value > 0xff {
                    return None;
                }
                value as u8
            }
            other => other,
        };
        out.push(value);
    }
    Some(out)
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized or unterminated token")]
pub struct LexerError {
    pub span: Range<usize>,
}

pub struct Lexer<'source> {
    inner: logos::SpannedIter<'source, Token<'source>>,
}

impl<'source> Lexer<'source> {
    pub fn new(input: &'source str) -> Self {
        Self {
            inner: Token::lexer(input).spanned(),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<(Token<'source>, Range<usize>), LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (result, span) = self.inner.next()?;
        Some(match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(LexerError { span }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Token::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        Lexer::new(input)
            .map(|res| res.map(|(tok, _)| tok))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn smoketest() {
        let input = "\
%token num  # trailing comment
%left '+' '-'
%option year \"2024\"
%%
expr<initial> : expr '+' expr {add} | [num] ; // done
";
        assert_eq!(
            kinds(input),
            vec![
                KwToken,
                Ident("num"),
                KwLeft,
                CharLit(b'+'),
                CharLit(b'-'),
                KwOption,
                Ident("year"),
                StrLit("2024".to_owned()),
                Sep,
                Ident("expr"),
                LAngle,
                Ident("initial"),
                RAngle,
                Colon,
                Ident("expr"),
                CharLit(b'+'),
                Ident("expr"),
                ActionRef("add"),
                VertBar,
                TokenRef("num"),
                Semicolon,
            ]
        );
    }

    #[test]
    fn escapes() {
        assert_eq!(kinds(r"'\n'"), vec![CharLit(b'\n')]);
        assert_eq!(kinds(r"'\x1b'"), vec![CharLit(0x1b)]);
        assert_eq!(kinds(r"'\0'"), vec![CharLit(0)]);
        assert_eq!(kinds(r"'\101'"), vec![CharLit(b'A')]);
        assert_eq!(kinds(r"'\''"), vec![CharLit(b'\'')]);
        assert_eq!(
            kinds(r#""a\tb""#),
            vec![StrLit("a\tb".to_owned())]
        );
    }

    #[test]
    fn predefined_ids_and_separators() {
        assert_eq!(
            kinds("$error %% x"),
            vec![PredefIdent("$error"), Sep, Ident("x")]
        );
    }

    #[test]
    fn rejects_malformed_character_literals() {
        let results: Vec<_> = Lexer::new("'ab'").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }
}
