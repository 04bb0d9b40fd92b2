//! Legacy object-configuration components:
//! `export default { data, computed, methods, watch, props, ... }`.
//!
//! Produces the same [`MemberPlan`]s as the class converters, so rendering,
//! use-site patching and the text stages are shared.

use oxc_ast::ast::{
    Expression, ObjectExpression, ObjectProperty, ObjectPropertyKind, Statement,
};
use oxc_span::GetSpan;

use crate::classify::{self, props_from_block, read_arg, ArgValue};
use crate::config::MigrateOptions;
use crate::context::{BindingKind, RunContext, StoreKind};
use crate::lifecycle;
use crate::methods::{ComputedPlan, FunctionParts, MethodPlan, WatchPlan};
use crate::rewriter::MemberPlan;
use crate::store;
use crate::tree::indent_at;

const PASS: &str = "object-config";

fn property_name(p: &ObjectProperty) -> Option<String> {
    if p.computed {
        return None;
    }
    p.key.static_name().map(|n| n.to_string())
}

fn function_parts(value: &Expression, indent: usize) -> Option<FunctionParts> {
    match value.without_parentheses() {
        Expression::FunctionExpression(func) => FunctionParts::from_function(func, indent),
        Expression::ArrowFunctionExpression(arrow) => Some(FunctionParts::from_arrow(arrow, indent)),
        _ => None,
    }
}

fn object_of<'p, 'a>(expr: &'p Expression<'a>) -> Option<&'p ObjectExpression<'a>> {
    match expr.without_parentheses() {
        Expression::ObjectExpression(obj) => Some(&**obj),
        _ => None,
    }
}

/// The object returned by `data() { return { .. } }` or `data: () => ({ .. })`.
fn data_object<'p, 'a>(value: &'p Expression<'a>, cx: &mut RunContext) -> Option<&'p ObjectExpression<'a>> {
    let body = match value.without_parentheses() {
        Expression::FunctionExpression(func) => func.body.as_ref()?,
        Expression::ArrowFunctionExpression(arrow) => &arrow.body,
        _ => return None,
    };
    let mut found = None;
    for stmt in &body.statements {
        match stmt {
            Statement::ReturnStatement(ret) => {
                found = ret.argument.as_ref().and_then(object_of);
            }
            Statement::ExpressionStatement(expr) => {
                found = object_of(&expr.expression);
            }
            other => cx.note(
                PASS,
                "statement inside data() is not migrated",
                other.span().start,
            ),
        }
    }
    found
}

/// Store records from `...mapGetters(..)`-style spreads.
fn map_helper_records(expr: &Expression, src: &str, cx: &mut RunContext) -> Option<Vec<crate::context::StoreBindingRecord>> {
    let Expression::CallExpression(call) = expr.without_parentheses() else {
        return None;
    };
    let Expression::Identifier(callee) = &call.callee else {
        return None;
    };
    let kind = StoreKind::from_name(callee.name.as_str())?;
    let args: Vec<_> = call
        .arguments
        .iter()
        .filter_map(|a| a.as_expression().map(|e| read_arg(e, src)))
        .collect();
    match store::resolve_map_helper(kind, &args) {
        Ok(records) => Some(records),
        Err(reason) => {
            cx.note(PASS, format!("{}: {}", callee.name, reason), call.span.start);
            None
        }
    }
}

/// First phase: everything later conversion depends on.
fn classify_options(obj: &ObjectExpression, src: &str, cx: &mut RunContext) {
    for prop in &obj.properties {
        let ObjectPropertyKind::ObjectProperty(p) = prop else {
            continue;
        };
        let Some(name) = property_name(p) else {
            continue;
        };
        match name.as_str() {
            "props" => {
                for component_prop in props_from_block(&read_arg(&p.value, src)) {
                    cx.add_prop(component_prop);
                }
            }
            "emits" => {
                if let ArgValue::Array(events) = read_arg(&p.value, src).value {
                    for event in events.iter().filter_map(|e| e.as_str()) {
                        cx.add_emit(event);
                    }
                }
            }
            "computed" | "methods" => {
                let Some(block) = object_of(&p.value) else {
                    continue;
                };
                for entry in &block.properties {
                    match entry {
                        ObjectPropertyKind::SpreadProperty(spread) => {
                            if let Some(records) = map_helper_records(&spread.argument, src, cx) {
                                for record in records {
                                    cx.add_store_record(record);
                                }
                            }
                        }
                        ObjectPropertyKind::ObjectProperty(item) if name == "computed" => {
                            if let Some(key) = property_name(item) {
                                cx.classify(&key, BindingKind::RefBinding);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn plan_data(value: &Expression, options: &MigrateOptions, plans: &mut Vec<MemberPlan>, cx: &mut RunContext, src: &str) {
    let Some(data) = data_object(value, cx) else {
        cx.note(PASS, "data option is not a function returning an object", value.span().start);
        return;
    };
    for entry in &data.properties {
        let ObjectPropertyKind::ObjectProperty(item) = entry else {
            cx.note(PASS, "spread inside data() is not migrated", entry.span().start);
            continue;
        };
        let Some(name) = property_name(item) else {
            continue;
        };
        let indent = indent_at(src, item.span.start);
        if let Some(plan) = classify::plan_field(
            &name,
            Some(&item.value),
            None,
            false,
            options.prefer_ref,
            indent,
            cx,
        ) {
            plans.push(MemberPlan::Field(plan));
        }
    }
}

fn plan_computed(block: &ObjectExpression, plans: &mut Vec<MemberPlan>, cx: &mut RunContext, src: &str) {
    for entry in &block.properties {
        match entry {
            ObjectPropertyKind::SpreadProperty(spread) => {
                push_store_plans(&spread.argument, plans, cx);
            }
            ObjectPropertyKind::ObjectProperty(item) => {
                let Some(name) = property_name(item) else {
                    continue;
                };
                let indent = indent_at(src, item.span.start);
                if let Some(get) = function_parts(&item.value, indent) {
                    plans.push(MemberPlan::Computed(ComputedPlan {
                        name,
                        get: Some(get),
                        set: None,
                    }));
                } else if let Some(accessors) = object_of(&item.value) {
                    let mut plan = ComputedPlan {
                        name,
                        get: None,
                        set: None,
                    };
                    for accessor in &accessors.properties {
                        let ObjectPropertyKind::ObjectProperty(a) = accessor else {
                            continue;
                        };
                        let parts = function_parts(&a.value, indent_at(src, a.span.start));
                        match property_name(a).as_deref() {
                            Some("get") => plan.get = parts,
                            Some("set") => plan.set = parts,
                            _ => {}
                        }
                    }
                    plans.push(MemberPlan::Computed(plan));
                } else {
                    cx.note(PASS, format!("computed `{}` is not a function", name), item.span.start);
                }
            }
        }
    }
}

fn push_store_plans(expr: &Expression, plans: &mut Vec<MemberPlan>, cx: &RunContext) {
    let Expression::CallExpression(call) = expr.without_parentheses() else {
        return;
    };
    // Records were resolved during classification; pick them up in order.
    let Expression::Identifier(callee) = &call.callee else {
        return;
    };
    let Some(kind) = StoreKind::from_name(callee.name.as_str()) else {
        return;
    };
    let names: Vec<String> = call
        .arguments
        .last()
        .and_then(|a| a.as_expression())
        .map(|e| match e.without_parentheses() {
            Expression::ArrayExpression(arr) => arr
                .elements
                .iter()
                .filter_map(|el| match el.as_expression() {
                    Some(Expression::StringLiteral(s)) => {
                        Some(s.value.rsplit('/').next().unwrap_or(s.value.as_str()).to_string())
                    }
                    _ => None,
                })
                .collect(),
            Expression::ObjectExpression(obj) => obj
                .properties
                .iter()
                .filter_map(|p| match p {
                    ObjectPropertyKind::ObjectProperty(p) => property_name(p),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default();

    for name in names {
        if let Some(record) = cx
            .store_records
            .iter()
            .find(|r| r.local_name == name && r.kind == kind)
        {
            plans.push(MemberPlan::Store(record.clone()));
        }
    }
}

fn plan_methods(block: &ObjectExpression, plans: &mut Vec<MemberPlan>, cx: &mut RunContext, src: &str) {
    for entry in &block.properties {
        match entry {
            ObjectPropertyKind::SpreadProperty(spread) => {
                push_store_plans(&spread.argument, plans, cx);
            }
            ObjectPropertyKind::ObjectProperty(item) => {
                let Some(name) = property_name(item) else {
                    continue;
                };
                match function_parts(&item.value, indent_at(src, item.span.start)) {
                    Some(parts) => plans.push(MemberPlan::Method(MethodPlan { name, parts })),
                    None => cx.note(PASS, format!("method `{}` is not a function", name), item.span.start),
                }
            }
        }
    }
}

fn plan_watch(block: &ObjectExpression, plans: &mut Vec<MemberPlan>, cx: &mut RunContext, src: &str) {
    for entry in &block.properties {
        let ObjectPropertyKind::ObjectProperty(item) = entry else {
            continue;
        };
        let Some(path) = property_name(item) else {
            continue;
        };
        let indent = indent_at(src, item.span.start);

        if let Some(handler) = function_parts(&item.value, indent) {
            plans.push(MemberPlan::Watch(WatchPlan {
                path,
                handler,
                options: None,
            }));
            continue;
        }

        let Some(config) = object_of(&item.value) else {
            cx.note(PASS, format!("watch `{}` handler not understood", path), item.span.start);
            continue;
        };
        let mut handler = None;
        let mut flags = Vec::new();
        for option in &config.properties {
            let ObjectPropertyKind::ObjectProperty(o) = option else {
                continue;
            };
            match property_name(o).as_deref() {
                Some("handler") => {
                    handler = function_parts(&o.value, indent_at(src, o.span.start));
                }
                Some(key) => flags.push(format!(
                    "{}: {}",
                    key,
                    &src[o.value.span().start as usize..o.value.span().end as usize]
                )),
                None => {}
            }
        }
        match handler {
            Some(handler) => plans.push(MemberPlan::Watch(WatchPlan {
                path,
                handler,
                options: (!flags.is_empty()).then(|| format!("{{ {} }}", flags.join(", "))),
            })),
            None => cx.note(PASS, format!("watch `{}` has no inline handler", path), item.span.start),
        }
    }
}

const COMPONENT_OPTIONS: &[&str] = &[
    "data", "computed", "methods", "props", "watch", "emits", "components", "template",
];

/// Whether a bare `export default { .. }` object looks like a component
/// rather than a store module, route table or config object.
pub fn has_component_signal(obj: &ObjectExpression) -> bool {
    obj.properties.iter().any(|prop| {
        let ObjectPropertyKind::ObjectProperty(p) = prop else {
            return false;
        };
        property_name(p).is_some_and(|name| {
            COMPONENT_OPTIONS.contains(&name.as_str()) || lifecycle::hook_target(&name).is_some()
        })
    })
}

/// Converts an options object into member plans.
pub fn plan_options(
    obj: &ObjectExpression,
    src: &str,
    options: &MigrateOptions,
    cx: &mut RunContext,
) -> Vec<MemberPlan> {
    classify_options(obj, src, cx);

    let mut plans = Vec::new();
    for prop in &obj.properties {
        let ObjectPropertyKind::ObjectProperty(p) = prop else {
            cx.note(PASS, "spread in component options", prop.span().start);
            continue;
        };
        let Some(name) = property_name(p) else {
            continue;
        };
        let indent = indent_at(src, p.span.start);

        match name.as_str() {
            "props" | "emits" => {}
            "name" | "components" | "mixins" | "directives" | "filters" | "inheritAttrs" => {
                tracing::debug!(option = %name, "component option dropped");
            }
            "data" => plan_data(&p.value, options, &mut plans, cx, src),
            "computed" => match object_of(&p.value) {
                Some(block) => plan_computed(block, &mut plans, cx, src),
                None => cx.note(PASS, "computed option is not an object", p.span.start),
            },
            "methods" => match object_of(&p.value) {
                Some(block) => plan_methods(block, &mut plans, cx, src),
                None => cx.note(PASS, "methods option is not an object", p.span.start),
            },
            "watch" => match object_of(&p.value) {
                Some(block) => plan_watch(block, &mut plans, cx, src),
                None => cx.note(PASS, "watch option is not an object", p.span.start),
            },
            hook if lifecycle::hook_target(hook).is_some() => {
                let planned = match p.value.without_parentheses() {
                    Expression::FunctionExpression(func) => lifecycle::plan_hook(hook, func, indent, cx),
                    _ => None,
                };
                match planned {
                    Some(plan) => plans.push(MemberPlan::Hook(plan)),
                    None => cx.note(PASS, format!("hook `{}` is not a method", hook), p.span.start),
                }
            }
            other => cx.note(PASS, format!("option `{}` is not migrated", other), p.span.start),
        }
    }
    plans
}
