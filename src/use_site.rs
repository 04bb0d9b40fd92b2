//! Use-Site Patcher.
//!
//! Second full walk, run against a frozen binding table. Every `this.<name>`
//! whose name is ref-like gets `.value` appended, except inside a declarator
//! that declares `<name>` itself. Whole-object writes to a reactive binding
//! go through `Object.assign`.

use oxc_ast::ast::{
    AssignmentExpression, AssignmentOperator, AssignmentTarget, BindingPattern, Expression,
    Program, StaticMemberExpression, VariableDeclarator,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};

use crate::context::{BindingKind, BindingTable};
use crate::tree::EditSet;

pub struct UseSitePatcher<'t> {
    table: &'t BindingTable,
    edits: &'t mut EditSet,
    declarators: Vec<Option<String>>,
    pub patched: usize,
}

impl<'t> UseSitePatcher<'t> {
    pub fn new(table: &'t BindingTable, edits: &'t mut EditSet) -> Self {
        debug_assert!(table.is_frozen(), "use-site walk needs a frozen table");
        UseSitePatcher {
            table,
            edits,
            declarators: Vec::new(),
            patched: 0,
        }
    }

    pub fn run(mut self, program: &Program) -> usize {
        self.visit_program(program);
        self.patched
    }

    fn guarded(&self, name: &str) -> bool {
        matches!(self.declarators.last(), Some(Some(target)) if target == name)
    }
}

impl<'a, 't> Visit<'a> for UseSitePatcher<'t> {
    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        let target = match &it.id {
            BindingPattern::BindingIdentifier(id) => Some(id.name.to_string()),
            _ => None,
        };
        self.declarators.push(target);
        walk::walk_variable_declarator(self, it);
        self.declarators.pop();
    }

    /// `this.form = {..}` on a reactive binding becomes
    /// `Object.assign(this.form, {..})`; the binding itself stays `const`.
    fn visit_assignment_expression(&mut self, it: &AssignmentExpression<'a>) {
        let reactive_target = match &it.left {
            AssignmentTarget::StaticMemberExpression(member)
                if it.operator == AssignmentOperator::Assign
                    && matches!(member.object, Expression::ThisExpression(_)) =>
            {
                self.table.get(member.property.name.as_str()) == Some(BindingKind::ReactiveBinding)
            }
            _ => false,
        };
        if !reactive_target {
            walk::walk_assignment_expression(self, it);
            return;
        }
        self.edits.insert(it.span.start, "Object.assign(");
        self.edits
            .patch(Span::new(it.left.span().end, it.right.span().start), ", ");
        walk::walk_assignment_expression(self, it);
        self.edits.insert(it.span.end, ")");
        self.patched += 1;
    }

    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if let Expression::ThisExpression(_) = &it.object {
            let name = it.property.name.as_str();
            let ref_like = self
                .table
                .get(name)
                .is_some_and(|kind| kind.needs_value_suffix());
            if ref_like && !self.guarded(name) {
                self.edits.insert(it.property.span.end, ".value");
                self.patched += 1;
            }
        }
        walk::walk_static_member_expression(self, it);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BindingKind;
    use oxc_allocator::Allocator;

    fn patch(src: &str, refs: &[(&str, BindingKind)]) -> String {
        let allocator = Allocator::default();
        let program = crate::tree::parse(&allocator, src, "t.ts").unwrap();
        let mut table = BindingTable::new();
        for (name, kind) in refs {
            table.add(name, *kind).unwrap();
        }
        table.freeze();
        let mut edits = EditSet::new();
        UseSitePatcher::new(&table, &mut edits).run(&program);
        edits.print(src)
    }

    #[test]
    fn test_reads_and_writes_are_suffixed() {
        let out = patch(
            "function f() { this.count++; this.count = this.count + 1; g(this.title, this.form.a) }",
            &[
                ("count", BindingKind::RefBinding),
                ("title", BindingKind::PropBinding),
                ("form", BindingKind::ReactiveBinding),
            ],
        );
        assert_eq!(
            out,
            "function f() { this.count.value++; this.count.value = this.count.value + 1; g(this.title.value, this.form.a) }"
        );
    }

    #[test]
    fn test_reactive_reassignment_keeps_the_binding() {
        let out = patch(
            "function reset() { this.form = { a: 2 }; this.form.a = 3 }",
            &[("form", BindingKind::ReactiveBinding)],
        );
        assert_eq!(
            out,
            "function reset() { Object.assign(this.form, { a: 2 }); this.form.a = 3 }"
        );
    }

    #[test]
    fn test_self_reference_guard() {
        let out = patch(
            "function f() { const items = this.items.filter(Boolean); const n = this.items.length }",
            &[("items", BindingKind::RefBinding)],
        );
        assert_eq!(
            out,
            "function f() { const items = this.items.filter(Boolean); const n = this.items.value.length }"
        );
    }

    #[test]
    fn test_only_this_rooted_accesses() {
        let out = patch(
            "function f() { other.count = 1; this.other.count = 2 }",
            &[("count", BindingKind::RefBinding)],
        );
        assert_eq!(out, "function f() { other.count = 1; this.other.count = 2 }");
    }
}
