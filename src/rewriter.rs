//! AST Rewriter.
//!
//! Ordered subpasses over one parsed script:
//!
//! 1. namespace helpers (`const cart = namespace('cart')`)
//! 2. Decorator Classifier
//! 3. Class-Field Reactivity Converter
//! 4. Store-Decorator Converter
//! 5. Lifecycle Converter
//! 6. Method/Watch Converter
//! 7. Use-Site Patcher (table frozen first)
//!
//! Each subpass runs behind `catch_unwind`; a panic aborts the file with
//! [`MigrationError::PassAborted`] and the caller keeps the original text.
//! The converters produce [`MemberPlan`]s, which are rendered only after the
//! use-site walk so lifted bodies carry their `.value` patches.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Class, ClassElement, Declaration, ExportDefaultDeclarationKind, Expression,
    MethodDefinitionKind, ObjectExpression, Program, Statement,
};
use oxc_span::Span;

use crate::classify::{
    self, is_model_decorator, is_prop_decorator, member_name, read_decorators, FieldPlan,
};
use crate::config::{MigrateOptions, SourceSyntax};
use crate::context::{BindingTable, RunContext, StoreBindingRecord};
use crate::error::{panic_message, MigrationError};
use crate::lifecycle::{self, HookPlan};
use crate::methods::{self, ComputedPlan, FunctionParts, MethodPlan, WatchPlan};
use crate::normalize::Stage;
use crate::object_config;
use crate::store;
use crate::tree::{self, indent_at, slice, EditSet};
use crate::use_site::UseSitePatcher;

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Renderer<'r> {
    pub source: &'r str,
    pub edits: &'r EditSet,
    pub table: &'r BindingTable,
    pub is_ts: bool,
}

impl<'r> Renderer<'r> {
    pub fn raw(&self, span: Span) -> &'r str {
        slice(self.source, span)
    }

    /// Source text of `span` with use-site patches applied.
    pub fn text(&self, span: Span) -> String {
        self.edits.render(self.source, span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberPlan {
    Field(FieldPlan),
    Store(StoreBindingRecord),
    Hook(HookPlan),
    Method(MethodPlan),
    Computed(ComputedPlan),
    Watch(WatchPlan),
}

pub fn render_plan(plan: &MemberPlan, r: &Renderer) -> String {
    match plan {
        MemberPlan::Field(field) => classify::render_field(field, r),
        MemberPlan::Store(record) => store::render_record(record, r.is_ts),
        MemberPlan::Hook(hook) => lifecycle::render_hook(hook, r),
        MemberPlan::Method(method) => methods::render_method(method, r),
        MemberPlan::Computed(computed) => methods::render_computed(computed, r),
        MemberPlan::Watch(watch) => methods::render_watch(watch, r),
    }
}

/// Joins declarations: single-line ones stay together, multi-line ones get a
/// blank line around them.
pub fn join_declarations(parts: &[String]) -> String {
    let mut out = String::new();
    let mut prev_multiline = false;
    for (i, part) in parts.iter().filter(|p| !p.trim().is_empty()).enumerate() {
        let multiline = part.contains('\n');
        if i > 0 {
            out.push_str(if multiline || prev_multiline { "\n\n" } else { "\n" });
        }
        out.push_str(part);
        prev_multiline = multiline;
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// PASS BOUNDARY
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn run_pass<T>(
    file: &str,
    pass: &'static str,
    f: impl FnOnce() -> T,
) -> Result<T, MigrationError> {
    let _span = tracing::debug_span!("pass", pass).entered();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(&*payload);
        tracing::error!(file, pass, %message, "pass aborted");
        MigrationError::PassAborted {
            file: file.to_string(),
            pass,
            message,
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

enum Component<'p, 'a> {
    Class(&'p Class<'a>, Span),
    Options(&'p ObjectExpression<'a>, Span),
}

fn statement_range(stmt_span: Span, class: &Class) -> Span {
    let start = class
        .decorators
        .iter()
        .map(|d| d.span.start)
        .min()
        .unwrap_or(stmt_span.start)
        .min(stmt_span.start);
    Span::new(start, stmt_span.end)
}

fn options_object<'p, 'a>(expr: &'p Expression<'a>) -> Option<&'p ObjectExpression<'a>> {
    match expr.without_parentheses() {
        Expression::ObjectExpression(obj) => {
            object_config::has_component_signal(obj).then_some(&**obj)
        }
        Expression::CallExpression(call) => {
            let wrapper = match &call.callee {
                Expression::Identifier(id) => id.name == "defineComponent",
                Expression::StaticMemberExpression(member) => {
                    member.object.is_specific_id("Vue") && member.property.name == "extend"
                }
                _ => false,
            };
            if !wrapper {
                return None;
            }
            match call.arguments.first().and_then(|a| a.as_expression()) {
                Some(Expression::ObjectExpression(obj)) => Some(&**obj),
                _ => None,
            }
        }
        _ => None,
    }
}

fn find_component<'p, 'a>(
    program: &'p Program<'a>,
    src: &str,
    syntax: Option<SourceSyntax>,
) -> Option<Component<'p, 'a>> {
    let want_class = syntax != Some(SourceSyntax::ObjectConfig);
    let want_options = syntax != Some(SourceSyntax::Decorator);

    for stmt in &program.body {
        match stmt {
            Statement::ClassDeclaration(class) if want_class => {
                if classify::is_component_class(class, src) {
                    return Some(Component::Class(&**class, statement_range(class.span, class)));
                }
            }
            Statement::ExportNamedDeclaration(decl) if want_class => {
                if let Some(Declaration::ClassDeclaration(class)) = &decl.declaration {
                    if classify::is_component_class(class, src) {
                        return Some(Component::Class(&**class, statement_range(decl.span, class)));
                    }
                }
            }
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::ClassDeclaration(class) if want_class => {
                    if classify::is_component_class(class, src) {
                        return Some(Component::Class(&**class, statement_range(decl.span, class)));
                    }
                }
                other if want_options => {
                    if let Some(obj) = other.as_expression().and_then(options_object) {
                        return Some(Component::Options(obj, decl.span));
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    None
}

/// `export default Name` for a class declared separately.
fn default_export_of(program: &Program, name: &str) -> Option<Span> {
    program.body.iter().find_map(|stmt| match stmt {
        Statement::ExportDefaultDeclaration(decl) => match decl.declaration.as_expression() {
            Some(Expression::Identifier(id)) if id.name == name => Some(decl.span),
            _ => None,
        },
        _ => None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASS SUBPASSES
// ═══════════════════════════════════════════════════════════════════════════════

type Slots = Vec<Vec<MemberPlan>>;

fn member_indent(src: &str, span: Span, decorators: &[oxc_ast::ast::Decorator]) -> usize {
    let start = decorators
        .iter()
        .map(|d| d.span.start)
        .chain(std::iter::once(span.start))
        .min()
        .unwrap_or(span.start);
    indent_at(src, start)
}

fn convert_fields(
    class: &Class,
    src: &str,
    options: &MigrateOptions,
    slots: &mut Slots,
    cx: &mut RunContext,
) {
    for (i, element) in class.body.body.iter().enumerate() {
        let ClassElement::PropertyDefinition(field) = element else {
            continue;
        };
        let Some(name) = member_name(&field.key) else {
            cx.note("field-converter", "computed or private field key", field.span.start);
            continue;
        };
        let decorators = read_decorators(&field.decorators, src);
        if decorators
            .iter()
            .any(|d| is_prop_decorator(d) || is_model_decorator(d))
        {
            continue;
        }
        if cx.store_records.iter().any(|r| r.local_name == name) {
            continue;
        }
        let forced_ref = decorators
            .iter()
            .any(|d| d.name == "Ref" && d.object.is_none());
        let indent = member_indent(src, field.span, &field.decorators);
        if let Some(plan) = classify::plan_field(
            &name,
            field.value.as_ref(),
            field.type_annotation.as_deref(),
            forced_ref,
            options.prefer_ref,
            indent,
            cx,
        ) {
            slots[i].push(MemberPlan::Field(plan));
        }
    }
}

fn convert_store_fields(class: &Class, slots: &mut Slots, cx: &mut RunContext) {
    for (i, element) in class.body.body.iter().enumerate() {
        let ClassElement::PropertyDefinition(field) = element else {
            continue;
        };
        let Some(name) = member_name(&field.key) else {
            continue;
        };
        if let Some(record) = cx.store_records.iter().find(|r| r.local_name == name) {
            slots[i].push(MemberPlan::Store(record.clone()));
        }
    }
}

fn convert_lifecycle(class: &Class, src: &str, slots: &mut Slots, cx: &mut RunContext) {
    for (i, element) in class.body.body.iter().enumerate() {
        let ClassElement::MethodDefinition(method) = element else {
            continue;
        };
        if method.kind != MethodDefinitionKind::Method || !method.decorators.is_empty() {
            continue;
        }
        let Some(name) = member_name(&method.key) else {
            continue;
        };
        let indent = member_indent(src, method.span, &method.decorators);
        if let Some(hook) = lifecycle::plan_hook(&name, &method.value, indent, cx) {
            slots[i].push(MemberPlan::Hook(hook));
        }
    }
}

fn convert_methods(class: &Class, src: &str, slots: &mut Slots, cx: &mut RunContext) {
    let mut computed_slot: HashMap<String, usize> = HashMap::new();

    for (i, element) in class.body.body.iter().enumerate() {
        let ClassElement::MethodDefinition(method) = element else {
            continue;
        };
        if !slots[i].is_empty() {
            continue;
        }
        let Some(name) = member_name(&method.key) else {
            cx.note("method-converter", "computed method key left out", method.span.start);
            continue;
        };
        let indent = member_indent(src, method.span, &method.decorators);
        let Some(parts) = FunctionParts::from_function(&method.value, indent) else {
            continue;
        };

        match method.kind {
            MethodDefinitionKind::Constructor => {
                cx.note("method-converter", "class constructor dropped", method.span.start);
            }
            MethodDefinitionKind::Get | MethodDefinitionKind::Set => {
                let slot = *computed_slot.entry(name.clone()).or_insert_with(|| {
                    slots[i].push(MemberPlan::Computed(ComputedPlan {
                        name: name.clone(),
                        get: None,
                        set: None,
                    }));
                    i
                });
                if let Some(MemberPlan::Computed(plan)) = slots[slot].last_mut() {
                    if method.kind == MethodDefinitionKind::Get {
                        plan.get = Some(parts);
                    } else {
                        plan.set = Some(parts);
                    }
                }
            }
            MethodDefinitionKind::Method => {
                let decorators = read_decorators(&method.decorators, src);
                if let Some(emit) = decorators.iter().find(|d| d.name == "Emit") {
                    methods::record_emit(&name, emit.string_arg(0), cx);
                    continue;
                }
                let watches: Vec<_> = decorators.iter().filter(|d| d.name == "Watch").collect();
                if watches.is_empty() {
                    slots[i].push(MemberPlan::Method(MethodPlan { name, parts }));
                    continue;
                }
                for watch in watches {
                    match watch.string_arg(0) {
                        Some(path) => slots[i].push(MemberPlan::Watch(WatchPlan {
                            path: path.to_string(),
                            handler: parts.clone(),
                            options: watch.args.get(1).map(|a| a.text.clone()),
                        })),
                        None => {
                            cx.note(
                                "method-converter",
                                format!("@Watch on `{}` without a string path", name),
                                watch.span.start,
                            );
                            slots[i].push(MemberPlan::Method(MethodPlan {
                                name: name.clone(),
                                parts: parts.clone(),
                            }));
                        }
                    }
                }
            }
        }
    }
}

fn note_leftovers(class: &Class, src: &str, cx: &mut RunContext) {
    if let Some(Expression::CallExpression(call)) = class.super_class.as_ref().map(|e| e.without_parentheses()) {
        cx.note(
            "decorator-classifier",
            format!("mixins `{}` are not migrated", slice(src, call.span)),
            call.span.start,
        );
    }
    for element in &class.body.body {
        match element {
            ClassElement::StaticBlock(block) => {
                cx.note("method-converter", "static block dropped", block.span.start);
            }
            ClassElement::AccessorProperty(accessor) => {
                cx.note("field-converter", "accessor property dropped", accessor.span.start);
            }
            _ => {}
        }
    }
}

fn plan_class(
    class: &Class,
    src: &str,
    options: &MigrateOptions,
    cx: &mut RunContext,
) -> Result<Vec<MemberPlan>, MigrationError> {
    let file = cx.file.clone();
    let mut slots: Slots = vec![Vec::new(); class.body.body.len()];

    run_pass(&file, "decorator-classifier", || {
        classify::classify_class(class, src, cx);
        note_leftovers(class, src, cx);
    })?;
    run_pass(&file, "field-converter", || {
        convert_fields(class, src, options, &mut slots, cx)
    })?;
    run_pass(&file, "store-converter", || {
        convert_store_fields(class, &mut slots, cx)
    })?;
    run_pass(&file, "lifecycle-converter", || {
        convert_lifecycle(class, src, &mut slots, cx)
    })?;
    run_pass(&file, "method-converter", || {
        convert_methods(class, src, &mut slots, cx)
    })?;

    Ok(slots.into_iter().flatten().collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Extends a span over the newline that follows it, so removed statements
/// do not leave empty lines behind.
fn with_trailing_newline(src: &str, span: Span) -> Span {
    let end = span.end as usize;
    let rest = &src[end..];
    let skip = rest.len() - rest.trim_start_matches([' ', '\t', ';']).len();
    let after = &rest[skip..];
    if after.starts_with("\r\n") {
        Span::new(span.start, (end + skip + 2) as u32)
    } else if after.starts_with('\n') {
        Span::new(span.start, (end + skip + 1) as u32)
    } else {
        span
    }
}

/// Parses, converts and prints one script region. Returns the source
/// unchanged (with `cx.converted_component == false`) when no component is
/// found.
pub fn rewrite_script(
    source: &str,
    is_ts: bool,
    options: &MigrateOptions,
    cx: &mut RunContext,
) -> Result<String, MigrationError> {
    let file = cx.file.clone();
    let allocator = Allocator::default();
    let program = tree::parse(&allocator, source, &file)?;

    let Some(component) = find_component(&program, source, options.syntax) else {
        tracing::info!(file = %file, "no component found");
        return Ok(source.to_string());
    };

    let mut edits = EditSet::new();
    let helper_spans = run_pass(&file, "namespace-helpers", || {
        store::collect_namespace_helpers(&program.body, source, &mut cx.namespace_helpers)
    })?;

    let mut export_span = None;
    let (plans, range) = match component {
        Component::Class(class, range) => {
            if let Some(id) = &class.id {
                export_span = default_export_of(&program, &id.name);
            }
            (plan_class(class, source, options, cx)?, range)
        }
        Component::Options(obj, range) => {
            let noted = cx.notes.len();
            let plans = run_pass(&file, "object-config", || {
                object_config::plan_options(obj, source, options, cx)
            })?;
            if plans.is_empty() && cx.props.is_empty() && cx.emits.is_empty() {
                tracing::info!(file = %file, "options object has nothing to migrate");
                cx.notes.truncate(noted);
                return Ok(source.to_string());
            }
            (plans, range)
        }
    };

    cx.bindings.freeze();
    let patched = run_pass(&file, "use-site-patcher", || {
        UseSitePatcher::new(&cx.bindings, &mut edits).run(&program)
    })?;
    tracing::debug!(file = %file, patched, "use sites patched");

    let text = run_pass(&file, "render", || {
        let r = Renderer {
            source,
            edits: &edits,
            table: &cx.bindings,
            is_ts,
        };
        let rendered: Vec<String> = plans.iter().map(|p| render_plan(p, &r)).collect();
        join_declarations(&rendered)
    })?;

    let produced = !text.trim().is_empty();
    edits.replace(range, text);
    for span in helper_spans.into_iter().chain(export_span) {
        edits.remove(with_trailing_newline(source, span));
    }

    let printed = edits.print(source);
    if printed.trim().is_empty() && produced {
        return Err(MigrationError::EmptyOutput {
            file,
            stage: Stage::Rewrite,
        });
    }
    cx.converted_component = true;
    Ok(printed)
}
