//! Syntax tree boundary: `parse` and `print`.
//!
//! The tree itself is never re-serialized. Rewrites are recorded as
//! `(start, end, text)` span edits and spliced back into the original script
//! text.
//!
//! Two edit layers exist:
//! - **patches** are small insertions inside untouched code (`.value` suffixes)
//! - **replacements** swap whole statements for generated text
//!
//! Generated text is built with [`EditSet::render`], which applies the patches
//! falling inside a span, so member bodies lifted out of a class carry their
//! use-site fixes with them.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};

use crate::error::{line_column, MigrationError};

/// Parses a script region. Always parsed as TypeScript so decorators and
/// type annotations are accepted in plain `<script>` blocks too.
pub fn parse<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    file: &str,
) -> Result<Program<'a>, MigrationError> {
    let ret = Parser::new(allocator, source, SourceType::ts()).parse();

    if let Some(first) = ret.errors.first() {
        let offset = first
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset())
            .unwrap_or(0);
        let (line, column) = line_column(source, offset);
        return Err(MigrationError::Parse {
            file: file.to_string(),
            message: first.to_string(),
            line,
            column,
        });
    }
    if ret.panicked {
        return Err(MigrationError::Parse {
            file: file.to_string(),
            message: "parser aborted".to_string(),
            line: 1,
            column: 1,
        });
    }

    Ok(ret.program)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct EditSet {
    patches: Vec<Edit>,
    replacements: Vec<Edit>,
}

impl EditSet {
    pub fn new() -> Self {
        EditSet::default()
    }

    pub fn insert(&mut self, at: u32, text: impl Into<String>) {
        self.patches.push(Edit {
            start: at,
            end: at,
            text: text.into(),
        });
    }

    /// Replaces `span` inside whatever region is later rendered.
    pub fn patch(&mut self, span: Span, text: impl Into<String>) {
        self.patches.push(Edit {
            start: span.start,
            end: span.end,
            text: text.into(),
        });
    }

    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.replacements.push(Edit {
            start: span.start,
            end: span.end,
            text: text.into(),
        });
    }

    pub fn remove(&mut self, span: Span) {
        self.replace(span, "");
    }

    /// Source text of `span` with every patch inside it applied.
    pub fn render(&self, source: &str, span: Span) -> String {
        let (start, end) = (span.start as usize, span.end as usize);
        let mut patches: Vec<&Edit> = self
            .patches
            .iter()
            .filter(|p| p.start >= span.start && p.end <= span.end)
            .collect();
        patches.sort_by_key(|p| (p.start, p.end));

        let mut out = String::with_capacity(end.saturating_sub(start) + patches.len() * 8);
        let mut cursor = start;
        for p in patches {
            let (ps, pe) = (p.start as usize, p.end as usize);
            if ps < cursor {
                continue;
            }
            out.push_str(&source[cursor..ps]);
            out.push_str(&p.text);
            cursor = pe;
        }
        out.push_str(&source[cursor..end]);
        out
    }

    /// Splices every replacement into the source, rendering the untouched
    /// gaps between them with their patches.
    pub fn print(&self, source: &str) -> String {
        let mut replacements: Vec<&Edit> = self.replacements.iter().collect();
        replacements.sort_by_key(|r| (r.start, r.end));

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0u32;
        for r in replacements {
            if r.start < cursor {
                tracing::warn!(
                    start = r.start,
                    end = r.end,
                    "overlapping replacement dropped"
                );
                continue;
            }
            out.push_str(&self.render(source, Span::new(cursor, r.start)));
            out.push_str(&r.text);
            cursor = r.end;
        }
        out.push_str(&self.render(source, Span::new(cursor, source.len() as u32)));
        out
    }
}

pub fn slice(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

/// Number of indentation columns on the line where `pos` sits, if only
/// whitespace precedes it on that line.
pub fn indent_at(source: &str, pos: u32) -> usize {
    let pos = (pos as usize).min(source.len());
    let line_start = source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let lead = &source[line_start..pos];
    if lead.chars().all(|c| c == ' ' || c == '\t') {
        lead.len()
    } else {
        0
    }
}

/// Strips up to `by` leading whitespace characters from every line after the first.
pub fn dedent(text: &str, by: usize) -> String {
    if by == 0 || !text.contains('\n') {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut out = String::with_capacity(text.len());
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        let strip = line
            .char_indices()
            .take(by)
            .take_while(|(_, c)| *c == ' ' || *c == '\t')
            .count();
        out.push_str(&line[strip..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports_position() {
        let allocator = Allocator::default();
        let err = parse(&allocator, "const a = 1\nconst b = 'oops\n", "A.vue").unwrap_err();
        match err {
            MigrationError::Parse { file, line, .. } => {
                assert_eq!(file, "A.vue");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_accepts_decorators_and_types() {
        let allocator = Allocator::default();
        let src = "@Component\nexport default class A extends Vue {\n  @Prop() title!: string\n}\n";
        let program = parse(&allocator, src, "A.vue").unwrap();
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_print_applies_patches_and_replacements() {
        let src = "let a = this.x; class K {}\nfoo(this.x)";
        let mut edits = EditSet::new();
        edits.insert(14, ".value");
        edits.replace(Span::new(16, 26), "const k = 1");
        edits.insert(37, ".value");
        assert_eq!(
            edits.print(src),
            "let a = this.x.value; const k = 1\nfoo(this.x.value)"
        );
        assert_eq!(edits.render(src, Span::new(0, 15)), "let a = this.x.value;");
    }

    #[test]
    fn test_dedent_and_indent() {
        let src = "class A {\n  foo() {\n    go()\n  }\n}";
        let pos = src.find("foo").unwrap() as u32;
        assert_eq!(indent_at(src, pos), 2);
        assert_eq!(dedent("{\n    go()\n  }", 2), "{\n  go()\n}");
    }
}
