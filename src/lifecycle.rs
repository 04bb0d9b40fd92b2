//! Lifecycle Converter.
//!
//! Hook methods become `onX(() => { .. })` registrations; creation hooks are
//! inlined into setup. The async flag comes from the body, not from the
//! method's own `async` keyword.

use oxc_ast::ast::{
    ArrowFunctionExpression, AwaitExpression, ForOfStatement, Function, FunctionBody,
};
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;

use crate::context::{HookTarget, LifecycleRewriteRecord, RunContext};
use crate::methods::{indent_tail, FunctionParts};
use crate::rewriter::Renderer;

pub const LIFECYCLE_HOOKS: &[(&str, HookTarget)] = &[
    ("beforeCreate", HookTarget::Inline),
    ("created", HookTarget::Inline),
    ("beforeMount", HookTarget::Framework("onBeforeMount")),
    ("mounted", HookTarget::Framework("onMounted")),
    ("beforeUpdate", HookTarget::Framework("onBeforeUpdate")),
    ("updated", HookTarget::Framework("onUpdated")),
    ("beforeDestroy", HookTarget::Framework("onBeforeUnmount")),
    ("beforeUnmount", HookTarget::Framework("onBeforeUnmount")),
    ("destroyed", HookTarget::Framework("onUnmounted")),
    ("unmounted", HookTarget::Framework("onUnmounted")),
    ("activated", HookTarget::Framework("onActivated")),
    ("deactivated", HookTarget::Framework("onDeactivated")),
    ("errorCaptured", HookTarget::Framework("onErrorCaptured")),
    ("onLoad", HookTarget::AppPage("onLoad")),
    ("onShow", HookTarget::AppPage("onShow")),
    ("onHide", HookTarget::AppPage("onHide")),
    ("onUnload", HookTarget::AppPage("onUnload")),
    ("onReady", HookTarget::AppPage("onReady")),
    ("onPullDownRefresh", HookTarget::AppPage("onPullDownRefresh")),
    ("onReachBottom", HookTarget::AppPage("onReachBottom")),
];

pub fn hook_target(method: &str) -> Option<HookTarget> {
    LIFECYCLE_HOOKS
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, target)| *target)
}

/// Framework hook names that get imported from the framework module.
pub fn framework_hook_names() -> impl Iterator<Item = &'static str> {
    LIFECYCLE_HOOKS.iter().filter_map(|(_, t)| match t {
        HookTarget::Framework(name) => Some(*name),
        _ => None,
    })
}

pub fn app_page_hook_names() -> impl Iterator<Item = &'static str> {
    LIFECYCLE_HOOKS.iter().filter_map(|(_, t)| match t {
        HookTarget::AppPage(name) => Some(*name),
        _ => None,
    })
}

/// Finds suspension points without descending into nested functions.
#[derive(Default)]
struct AwaitFinder {
    found: bool,
}

impl<'a> Visit<'a> for AwaitFinder {
    fn visit_await_expression(&mut self, _it: &AwaitExpression<'a>) {
        self.found = true;
    }

    fn visit_for_of_statement(&mut self, it: &ForOfStatement<'a>) {
        if it.r#await {
            self.found = true;
        }
        walk::walk_for_of_statement(self, it);
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}
}

pub fn body_awaits(body: &FunctionBody) -> bool {
    let mut finder = AwaitFinder::default();
    finder.visit_function_body(body);
    finder.found
}

#[derive(Debug, Clone, PartialEq)]
pub struct HookPlan {
    pub method: String,
    pub target: HookTarget,
    pub parts: FunctionParts,
    pub is_async: bool,
}

/// Plans a hook for a lifecycle-named method and records the rewrite.
pub fn plan_hook(
    method: &str,
    func: &Function,
    indent: usize,
    cx: &mut RunContext,
) -> Option<HookPlan> {
    let target = hook_target(method)?;
    let parts = FunctionParts::from_function(func, indent)?;
    let is_async = func.body.as_ref().is_some_and(|b| body_awaits(b));

    tracing::debug!(method, ?target, is_async, "lifecycle hook");
    cx.lifecycle.push(LifecycleRewriteRecord {
        method: method.to_string(),
        target,
        is_async,
    });
    Some(HookPlan {
        method: method.to_string(),
        target,
        parts,
        is_async,
    })
}

pub fn render_hook(plan: &HookPlan, r: &Renderer) -> String {
    match plan.target.call_name() {
        Some(call) => format!(
            "{}({})",
            call,
            plan.parts.arrow_with_async(r, plan.is_async)
        ),
        None => {
            let statements = plan.parts.statements(r);
            if plan.is_async {
                // Leading `;` keeps the IIFE from continuing the previous line.
                format!(
                    ";(async () => {{\n  {}\n}})()",
                    indent_tail(&statements, 2)
                )
            } else {
                statements
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;

    fn awaits(src: &str) -> bool {
        let allocator = Allocator::default();
        let program = crate::tree::parse(&allocator, src, "t.ts").unwrap();
        let Statement::FunctionDeclaration(func) = &program.body[0] else {
            panic!("expected function");
        };
        body_awaits(func.body.as_ref().unwrap())
    }

    #[test]
    fn test_await_detection() {
        assert!(awaits("async function f() { await load() }"));
        assert!(awaits("async function f() { this.list = await load() }"));
        assert!(awaits("async function f() { for await (const x of xs) {} }"));
        assert!(!awaits("function f() { load().then(() => {}) }"));
        assert!(!awaits("function f() { xs.forEach(async (x) => { await x }) }"));
        assert!(!awaits("function f() { async function g() { await 1 } }"));
    }

    #[test]
    fn test_hook_table() {
        assert_eq!(hook_target("mounted"), Some(HookTarget::Framework("onMounted")));
        assert_eq!(hook_target("beforeDestroy"), Some(HookTarget::Framework("onBeforeUnmount")));
        assert_eq!(hook_target("created"), Some(HookTarget::Inline));
        assert_eq!(hook_target("onShow"), Some(HookTarget::AppPage("onShow")));
        assert_eq!(hook_target("fetchData"), None);
        assert!(framework_hook_names().any(|n| n == "onUnmounted"));
    }
}
