//! Source locations and diagnostic rendering.

use crate::errors::GrammarError;
use std::ops::Range;

/// A 1-based line number with an inclusive column range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Loc {
    pub line: u32,
    pub col_first: u32,
    pub col_last: u32,
}

/// A borrowed view of the input text with a prebuilt line index, used to
/// convert byte spans into [`Loc`]s and to render diagnostics.
pub struct SourceFile<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceFile<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter_map(|(i, b)| (b == b'\n').then_some(i + 1)),
        );
        Self { text, line_starts }
    }

    /// Convert a byte span into a line/column range. Spans never cross line
    /// boundaries in practice; the end column is clamped to the span's first
    /// line regardless.
    pub fn loc(&self, span: Range<usize>) -> Loc {
        let line = self.line_starts.partition_point(|&start| start <= span.start) - 1;
        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |&next| next - 1);
        let col_first = span.start - line_start + 1;
        let col_last = span.end.clamp(span.start + 1, line_end.max(span.start + 1)) - line_start;
        Loc {
            line: (line + 1) as u32,
            col_first: col_first as u32,
            col_last: col_last.max(col_first) as u32,
        }
    }

    pub fn line_text(&self, line: u32) -> &'a str {
        let start = self.line_starts[(line - 1) as usize];
        let rest = &self.text[start..];
        rest.split_terminator('\n').next().unwrap_or(rest)
    }

    /// Render `file:line:col: error: message` with an excerpt of the
    /// offending line and a caret underneath.
    pub fn render(&self, file_name: &str, err: &GrammarError) -> String {
        match err.loc {
            Some(loc) => {
                let excerpt = self.line_text(loc.line);
                let caret_pad = " ".repeat((loc.col_first - 1) as usize);
                let caret = "~".repeat((loc.col_last - loc.col_first) as usize);
                format!(
                    "{}:{}:{}: error: {}\n    {}\n    {}^{}",
                    file_name, loc.line, loc.col_first, err.message, excerpt, caret_pad, caret,
                )
            }
            None => format!("{}: error: {}", file_name, err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_spans_across_lines() {
        let sf = SourceFile::new("abc\ndefgh\nij");
        assert_eq!(
            sf.loc(0..3),
            Loc {
                line: 1,
                col_first: 1,
                col_last: 3
            }
        );
        assert_eq!(
            sf.loc(6..8),
            Loc {
                line: 2,
                col_first: 3,
                col_last: 4
            }
        );
        assert_eq!(sf.line_text(2), "defgh");
    }

    #[test]
    fn renders_caret_under_offending_column() {
        let sf = SourceFile::new("A : B ;\n");
        let err = GrammarError::at("undefined nonterminal `B`", sf.loc(4..5));
        let rendered = sf.render("test.gr", &err);
        assert_eq!(
            rendered,
            "test.gr:1:5: error: undefined nonterminal `B`\n    A : B ;\n        ^"
        );
    }
}
