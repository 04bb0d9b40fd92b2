//! Method/Watch Converter.
//!
//! Methods become arrow-function declarations, getters become `computed`,
//! `@Watch` methods become `watch(..)` registrations and `@Emit` methods only
//! contribute their event name.

use oxc_ast::ast::{ArrowFunctionExpression, Function};
use oxc_span::Span;

use crate::context::RunContext;
use crate::rewriter::Renderer;
use crate::tree::dedent;

/// The pieces of a function needed to re-emit it as an arrow.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParts {
    pub type_params: Option<Span>,
    /// Includes the parentheses.
    pub params: Span,
    /// Starts at the `:`.
    pub return_type: Option<Span>,
    pub body: Span,
    pub expression_body: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub indent: usize,
}

impl FunctionParts {
    pub fn from_function(func: &Function, indent: usize) -> Option<FunctionParts> {
        let body = func.body.as_ref()?;
        Some(FunctionParts {
            type_params: func.type_parameters.as_ref().map(|t| t.span),
            params: func.params.span,
            return_type: func.return_type.as_ref().map(|t| t.span),
            body: body.span,
            expression_body: false,
            is_async: func.r#async,
            is_generator: func.generator,
            indent,
        })
    }

    pub fn from_arrow(arrow: &ArrowFunctionExpression, indent: usize) -> FunctionParts {
        FunctionParts {
            type_params: arrow.type_parameters.as_ref().map(|t| t.span),
            params: arrow.params.span,
            return_type: arrow.return_type.as_ref().map(|t| t.span),
            body: arrow.body.span,
            expression_body: arrow.expression,
            is_async: arrow.r#async,
            is_generator: false,
            indent,
        }
    }

    fn params_text(&self, r: &Renderer) -> String {
        let params = r.text(self.params);
        // Single-parameter arrows may come without parentheses.
        if params.starts_with('(') {
            params
        } else {
            format!("({})", params)
        }
    }

    pub fn arrow(&self, r: &Renderer) -> String {
        self.arrow_with_async(r, self.is_async)
    }

    pub fn arrow_with_async(&self, r: &Renderer, is_async: bool) -> String {
        let mut out = String::new();
        if is_async {
            out.push_str("async ");
        }
        if let Some(tp) = self.type_params {
            out.push_str(&r.text(tp));
        }
        out.push_str(&self.params_text(r));
        if let Some(rt) = self.return_type {
            out.push_str(&r.text(rt));
        }
        out.push_str(" => ");
        let body = r.text(self.body);
        if self.expression_body && body.trim_start().starts_with('{') {
            // Object literal bodies need their parentheses back.
            out.push('(');
            out.push_str(&body);
            out.push(')');
        } else {
            out.push_str(&body);
        }
        dedent(&out, self.indent)
    }

    /// Body statements without the braces, dedented to column zero.
    pub fn statements(&self, r: &Renderer) -> String {
        let body = r.text(self.body);
        if self.expression_body {
            return body;
        }
        let inner = body
            .strip_prefix('{')
            .and_then(|b| b.strip_suffix('}'))
            .unwrap_or(&body);
        dedent_block(inner)
    }
}

/// Removes the common leading indentation and surrounding blank lines.
pub fn dedent_block(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    let kept: Vec<String> = lines
        .iter()
        .map(|l| if l.trim().is_empty() { String::new() } else { l[common..].to_string() })
        .collect();
    kept.join("\n").trim_matches('\n').trim_end().to_string()
}

/// Indents every line after the first.
pub fn indent_tail(text: &str, by: usize) -> String {
    let pad = " ".repeat(by);
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `onValueChange` → `on-value-change`.
pub fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLANS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct MethodPlan {
    pub name: String,
    pub parts: FunctionParts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedPlan {
    pub name: String,
    pub get: Option<FunctionParts>,
    pub set: Option<FunctionParts>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchPlan {
    /// Watched path, e.g. `value` or `form.name` or `$route`.
    pub path: String,
    pub handler: FunctionParts,
    pub options: Option<String>,
}

pub fn render_method(plan: &MethodPlan, r: &Renderer) -> String {
    if plan.parts.is_generator {
        let body = dedent(&r.text(plan.parts.body), plan.parts.indent);
        let prefix = if plan.parts.is_async { "async " } else { "" };
        return format!(
            "{}function* {}{} {}",
            prefix,
            plan.name,
            r.text(plan.parts.params),
            body
        );
    }
    format!("const {} = {}", plan.name, plan.parts.arrow(r))
}

pub fn render_computed(plan: &ComputedPlan, r: &Renderer) -> String {
    match (&plan.get, &plan.set) {
        (Some(get), None) => format!("const {} = computed({})", plan.name, get.arrow(r)),
        (get, Some(set)) => {
            let getter = match get {
                Some(get) => get.arrow(r),
                None => "() => undefined".to_string(),
            };
            format!(
                "const {} = computed({{\n  get: {},\n  set: {},\n}})",
                plan.name,
                indent_tail(&getter, 2),
                indent_tail(&set.arrow(r), 2)
            )
        }
        (None, None) => String::new(),
    }
}

/// `() => this.value.value` for ref-like roots, `() => this.form.name` otherwise.
pub fn watch_accessor(path: &str, r: &Renderer) -> String {
    let mut segments = path.split('.');
    let root = segments.next().unwrap_or(path);
    let rest: Vec<&str> = segments.collect();
    let mut out = format!("() => this.{}", root);
    if r.table.get(root).is_some_and(|k| k.needs_value_suffix()) {
        out.push_str(".value");
    }
    for seg in rest {
        out.push('.');
        out.push_str(seg);
    }
    out
}

pub fn render_watch(plan: &WatchPlan, r: &Renderer) -> String {
    let mut out = format!(
        "watch({}, {}",
        watch_accessor(&plan.path, r),
        plan.handler.arrow(r)
    );
    if let Some(options) = &plan.options {
        out.push_str(", ");
        out.push_str(options);
    }
    out.push(')');
    out
}

/// Records the event for an `@Emit` method. The method itself is dropped.
pub fn record_emit(method: &str, event: Option<&str>, cx: &mut RunContext) {
    let event = event
        .map(str::to_string)
        .unwrap_or_else(|| hyphenate(method));
    tracing::debug!(method, event = %event, "emit method dropped");
    cx.add_emit(&event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate("onValueChange"), "on-value-change");
        assert_eq!(hyphenate("submit"), "submit");
    }

    #[test]
    fn test_dedent_block() {
        let inner = "\n    const a = 1\n\n    if (a) {\n      go()\n    }\n  ";
        assert_eq!(dedent_block(inner), "const a = 1\n\nif (a) {\n  go()\n}");
    }

    #[test]
    fn test_dedent_block_counts_only_ascii_indent() {
        let inner = "\n    a()\n  \u{3000}b()\n  ";
        assert_eq!(dedent_block(inner), "  a()\n\u{3000}b()");
    }

    #[test]
    fn test_indent_tail() {
        assert_eq!(indent_tail("() => {\n  a()\n}", 2), "() => {\n    a()\n  }");
    }

    #[test]
    fn test_record_emit_defaults_to_hyphenated_name() {
        let mut cx = RunContext::new("A.vue");
        record_emit("changeValue", None, &mut cx);
        record_emit("save", Some("saved"), &mut cx);
        record_emit("again", Some("saved"), &mut cx);
        assert_eq!(cx.emits, vec!["change-value", "saved"]);
    }
}
