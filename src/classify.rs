//! Decorator Classifier and Class-Field Reactivity Converter.
//!
//! Classification runs before any text is produced: it fills the run
//! context's binding table, props list, model list and store records so the
//! later converters (and the use-site walk) see the complete picture.
//!
//! Field precedence, first match wins:
//! 1. name already a prop → dropped
//! 2. string / boolean / number literal → `ref(lit)`
//! 3. `@Ref`, `undefined` or `null` → `ref(null)`
//! 4. object literal, inline object type, `as` cast → `reactive(..)`
//! 5. array literal → `ref([..])`
//! 6. bare identifier → dropped
//! 7. anything else → plain `let`

use oxc_ast::ast::{
    Class, ClassElement, Decorator, Expression, MethodDefinitionKind, ObjectPropertyKind,
    PropertyDefinition, TSType, TSTypeAnnotation, UnaryOperator,
};
use oxc_span::{GetSpan, Span};

use crate::context::{constructor_type, BindingKind, ComponentProp, RunContext};
use crate::rewriter::Renderer;
use crate::store;
use crate::tree::{dedent, slice};

// ═══════════════════════════════════════════════════════════════════════════════
// DECORATOR READING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Ident(String),
    Bool(bool),
    Array(Vec<Arg>),
    Object(Vec<(String, Arg)>),
    Other,
}

/// A decorator or helper-call argument, with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub value: ArgValue,
    pub text: String,
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&Arg> {
        match &self.value {
            ArgValue::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

pub fn read_arg(expr: &Expression, src: &str) -> Arg {
    let text = slice(src, expr.span()).to_string();
    let value = match expr.without_parentheses() {
        Expression::StringLiteral(s) => ArgValue::Str(s.value.to_string()),
        Expression::Identifier(id) => ArgValue::Ident(id.name.to_string()),
        Expression::BooleanLiteral(b) => ArgValue::Bool(b.value),
        Expression::ArrayExpression(arr) => ArgValue::Array(
            arr.elements
                .iter()
                .filter_map(|el| el.as_expression().map(|e| read_arg(e, src)))
                .collect(),
        ),
        Expression::ObjectExpression(obj) => {
            let mut entries = Vec::new();
            for prop in &obj.properties {
                let ObjectPropertyKind::ObjectProperty(p) = prop else {
                    continue;
                };
                let Some(key) = p.key.static_name() else {
                    continue;
                };
                let mut value = read_arg(&p.value, src);
                if p.method {
                    // `default() { .. }` has no standalone value text.
                    if let Expression::FunctionExpression(func) = &p.value {
                        if let Some(body) = &func.body {
                            value.text = format!(
                                "{} => {}",
                                slice(src, func.params.span),
                                slice(src, body.span)
                            );
                        }
                    }
                }
                entries.push((key.to_string(), value));
            }
            ArgValue::Object(entries)
        }
        _ => ArgValue::Other,
    };
    Arg { value, text }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoratorInfo {
    /// `Getter` in both `@Getter('x')` and `@cart.Getter('x')`.
    pub name: String,
    /// `cart` in `@cart.Getter('x')`.
    pub object: Option<String>,
    pub args: Vec<Arg>,
    pub span: Span,
}

impl DecoratorInfo {
    pub fn string_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|a| a.as_str())
    }
}

pub fn read_decorator(dec: &Decorator, src: &str) -> Option<DecoratorInfo> {
    let (callee, args) = match dec.expression.without_parentheses() {
        Expression::CallExpression(call) => (&call.callee, Some(&call.arguments)),
        other => (other, None),
    };

    let (name, object) = match callee {
        Expression::Identifier(id) => (id.name.to_string(), None),
        Expression::StaticMemberExpression(member) => match &member.object {
            Expression::Identifier(obj) => {
                (member.property.name.to_string(), Some(obj.name.to_string()))
            }
            _ => return None,
        },
        _ => return None,
    };

    let args = args
        .map(|list| {
            list.iter()
                .map(|arg| match arg.as_expression() {
                    Some(expr) => read_arg(expr, src),
                    None => Arg {
                        value: ArgValue::Other,
                        text: slice(src, arg.span()).to_string(),
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    Some(DecoratorInfo {
        name,
        object,
        args,
        span: dec.span,
    })
}

pub fn read_decorators(decorators: &[Decorator], src: &str) -> Vec<DecoratorInfo> {
    decorators
        .iter()
        .filter_map(|d| read_decorator(d, src))
        .collect()
}

pub fn is_component_decorator(dec: &DecoratorInfo) -> bool {
    dec.object.is_none() && matches!(dec.name.as_str(), "Component" | "Options")
}

/// `@Component`/`@Options` classes, or classes extending `Vue` / `Mixins(..)`.
pub fn is_component_class(class: &Class, src: &str) -> bool {
    if read_decorators(&class.decorators, src)
        .iter()
        .any(is_component_decorator)
    {
        return true;
    }
    match class.super_class.as_ref().map(|e| e.without_parentheses()) {
        Some(Expression::Identifier(id)) => id.name == "Vue",
        Some(Expression::CallExpression(call)) => {
            matches!(&call.callee, Expression::Identifier(id) if id.name == "Mixins" || id.name == "mixins")
        }
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS
// ═══════════════════════════════════════════════════════════════════════════════

fn union_type(items: &[Arg]) -> Option<String> {
    let types: Vec<&str> = items
        .iter()
        .filter_map(|a| match &a.value {
            ArgValue::Ident(ctor) => constructor_type(ctor),
            _ => None,
        })
        .collect();
    if types.is_empty() {
        None
    } else {
        Some(types.join(" | "))
    }
}

fn type_from_arg(arg: &Arg) -> Option<String> {
    match &arg.value {
        ArgValue::Ident(ctor) => constructor_type(ctor).map(str::to_string),
        ArgValue::Array(items) => union_type(items),
        _ => None,
    }
}

/// Builds a prop from `@Prop(..)` options or a `props: { name: .. }` entry.
pub fn prop_from_options(name: &str, options: Option<&Arg>) -> ComponentProp {
    let mut prop = ComponentProp::new(name, None);
    let Some(arg) = options else {
        return prop;
    };
    prop.runtime = Some(arg.text.clone());
    match &arg.value {
        ArgValue::Object(entries) => {
            for (key, value) in entries {
                match key.as_str() {
                    "type" => prop.ty = type_from_arg(value),
                    "default" => prop.default_value = Some(value.text.clone()),
                    "required" => {
                        if let ArgValue::Bool(required) = value.value {
                            prop.optional = !required;
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => prop.ty = type_from_arg(arg),
    }
    prop
}

/// `props` block of a class decorator or options object: object or array form.
pub fn props_from_block(block: &Arg) -> Vec<ComponentProp> {
    match &block.value {
        ArgValue::Object(entries) => entries
            .iter()
            .map(|(name, value)| prop_from_options(name, Some(value)))
            .collect(),
        ArgValue::Array(items) => items
            .iter()
            .filter_map(|a| a.as_str())
            .map(|name| ComponentProp::new(name, None))
            .collect(),
        _ => Vec::new(),
    }
}

fn field_prop(field: &PropertyDefinition, name: &str, options: Option<&Arg>, src: &str) -> ComponentProp {
    let mut prop = prop_from_options(name, options);
    if let Some(annotation) = &field.type_annotation {
        prop.ty = Some(slice(src, annotation.type_annotation.span()).to_string());
    }
    if field.optional {
        prop.optional = true;
    }
    prop
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECORATOR CLASSIFIER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn member_name(key: &oxc_ast::ast::PropertyKey) -> Option<String> {
    if key.is_private_identifier() {
        return None;
    }
    key.static_name().map(|n| n.to_string())
}

pub fn is_prop_decorator(dec: &DecoratorInfo) -> bool {
    matches!(dec.name.as_str(), "Prop" | "PropSync")
}

pub fn is_model_decorator(dec: &DecoratorInfo) -> bool {
    matches!(dec.name.as_str(), "Model" | "ModelSync" | "VModel")
}

/// First walk over a component class. Populates props, models, store records
/// and the classification of decorated fields and getters. Undecorated fields
/// are classified by [`plan_field`].
pub fn classify_class(class: &Class, src: &str, cx: &mut RunContext) {
    for dec in read_decorators(&class.decorators, src) {
        if !is_component_decorator(&dec) {
            continue;
        }
        if let Some(options) = dec.args.first() {
            if let Some(block) = options.entry("props") {
                for prop in props_from_block(block) {
                    cx.add_prop(prop);
                }
            }
            if let Some(Arg {
                value: ArgValue::Array(events),
                ..
            }) = options.entry("emits")
            {
                for event in events.iter().filter_map(|e| e.as_str()) {
                    cx.add_emit(event);
                }
            }
        }
    }

    for element in &class.body.body {
        match element {
            ClassElement::PropertyDefinition(field) => {
                let Some(name) = member_name(&field.key) else {
                    continue;
                };
                for dec in read_decorators(&field.decorators, src) {
                    if is_prop_decorator(&dec) {
                        // `@PropSync('value', opts)` carries its options second.
                        let options = if dec.name == "PropSync" {
                            dec.args.get(1)
                        } else {
                            dec.args.first()
                        };
                        cx.add_prop(field_prop(field, &name, options, src));
                        break;
                    }
                    if is_model_decorator(&dec) {
                        let options = dec.args.iter().find(|a| !matches!(a.value, ArgValue::Str(_)));
                        cx.add_model(field_prop(field, &name, options, src));
                        break;
                    }
                    if dec.name == "Ref" && dec.object.is_none() {
                        cx.classify(&name, BindingKind::RefBinding);
                        break;
                    }
                    match store::resolve_decorator(&dec, &name, &cx.namespace_helpers) {
                        Ok(Some(record)) => {
                            cx.add_store_record(record);
                            break;
                        }
                        Ok(None) => {}
                        Err(reason) => {
                            cx.note("decorator-classifier", reason, dec.span.start);
                            break;
                        }
                    }
                }
            }
            ClassElement::MethodDefinition(method) if method.kind == MethodDefinitionKind::Get => {
                if let Some(name) = member_name(&method.key) {
                    cx.classify(&name, BindingKind::RefBinding);
                }
            }
            _ => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASS-FIELD REACTIVITY CONVERTER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Literal(Span),
    Null,
    Reactive(Span),
    /// Type-only field with an inline object type and no initializer.
    TypedReactive,
    Array(Span),
    Passthrough(Option<Span>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub name: String,
    pub shape: FieldShape,
    pub ty: Option<Span>,
    pub indent: usize,
}

fn is_literal(expr: &Expression) -> bool {
    match expr {
        Expression::StringLiteral(_)
        | Expression::BooleanLiteral(_)
        | Expression::NumericLiteral(_) => true,
        Expression::UnaryExpression(unary) => {
            unary.operator == UnaryOperator::UnaryNegation
                && matches!(unary.argument, Expression::NumericLiteral(_))
        }
        _ => false,
    }
}

/// Decides how a field (or `data()` entry) becomes a top-level binding.
/// Returns `None` when the field is dropped.
pub fn plan_field(
    name: &str,
    value: Option<&Expression>,
    annotation: Option<&TSTypeAnnotation>,
    forced_ref: bool,
    prefer_ref: bool,
    indent: usize,
    cx: &mut RunContext,
) -> Option<FieldPlan> {
    if cx.has_prop(name) {
        tracing::debug!(field = name, "field shadows a prop, dropped");
        return None;
    }

    let ty = annotation.map(|a| a.type_annotation.span());
    let inner = value.map(|v| v.without_parentheses());
    let object_kind = if prefer_ref {
        BindingKind::RefBinding
    } else {
        BindingKind::ReactiveBinding
    };

    let (shape, kind) = match inner {
        Some(expr) if is_literal(expr) => (FieldShape::Literal(expr.span()), BindingKind::RefBinding),
        _ if forced_ref => (FieldShape::Null, BindingKind::RefBinding),
        Some(expr) if expr.is_undefined() || expr.is_null() => {
            (FieldShape::Null, BindingKind::RefBinding)
        }
        Some(Expression::ObjectExpression(obj)) => (FieldShape::Reactive(obj.span), object_kind),
        Some(Expression::TSAsExpression(cast)) => (FieldShape::Reactive(cast.span), object_kind),
        None if annotation
            .is_some_and(|a| matches!(a.type_annotation, TSType::TSTypeLiteral(_))) =>
        {
            (FieldShape::TypedReactive, object_kind)
        }
        Some(Expression::ArrayExpression(arr)) => (FieldShape::Array(arr.span), BindingKind::RefBinding),
        Some(Expression::Identifier(id)) => {
            tracing::debug!(field = name, alias = %id.name, "identifier-initialized field dropped");
            return None;
        }
        Some(expr) => (FieldShape::Passthrough(Some(expr.span())), BindingKind::Plain),
        None => (FieldShape::Passthrough(None), BindingKind::Plain),
    };

    cx.classify(name, kind);
    Some(FieldPlan {
        name: name.to_string(),
        shape,
        ty,
        indent,
    })
}

pub fn render_field(plan: &FieldPlan, r: &Renderer) -> String {
    let ty = plan.ty.filter(|_| r.is_ts).map(|s| r.raw(s).to_string());
    let generic = |ty: &Option<String>| ty.as_ref().map(|t| format!("<{}>", t)).unwrap_or_default();
    let value = |span: Span| dedent(&r.text(span), plan.indent);
    let wrapper = match r.table.get(&plan.name) {
        Some(BindingKind::ReactiveBinding) => "reactive",
        _ => "ref",
    };

    match &plan.shape {
        FieldShape::Literal(span) => {
            format!("const {} = ref{}({})", plan.name, generic(&ty), value(*span))
        }
        FieldShape::Null => {
            let ty = ty.map(|t| if t.contains("null") { t } else { format!("{} | null", t) });
            format!("const {} = ref{}(null)", plan.name, generic(&ty))
        }
        FieldShape::Reactive(span) => format!(
            "const {} = {}{}({})",
            plan.name,
            wrapper,
            generic(&ty),
            value(*span)
        ),
        FieldShape::TypedReactive => match ty {
            Some(t) => format!("const {} = {}({{}} as {})", plan.name, wrapper, t),
            None => format!("const {} = {}({{}})", plan.name, wrapper),
        },
        FieldShape::Array(span) => {
            format!("const {} = ref{}({})", plan.name, generic(&ty), value(*span))
        }
        FieldShape::Passthrough(init) => {
            let annotation = ty.map(|t| format!(": {}", t)).unwrap_or_default();
            match init {
                Some(span) => format!("let {}{} = {}", plan.name, annotation, value(*span)),
                None => format!("let {}{}", plan.name, annotation),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BindingKind;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::{ExportDefaultDeclarationKind, Statement};

    fn with_class<R>(src: &str, f: impl FnOnce(&Class) -> R) -> R {
        let allocator = Allocator::default();
        let program = crate::tree::parse(&allocator, src, "test.ts").unwrap();
        for stmt in &program.body {
            if let Statement::ExportDefaultDeclaration(decl) = stmt {
                if let ExportDefaultDeclarationKind::ClassDeclaration(class) = &decl.declaration {
                    return f(&**class);
                }
            }
        }
        panic!("no class in test source");
    }

    fn classify_and_plan(class: &Class, src: &str, cx: &mut RunContext) {
        classify_class(class, src, cx);
        for element in &class.body.body {
            if let ClassElement::PropertyDefinition(field) = element {
                if field.decorators.is_empty() {
                    let name = member_name(&field.key).unwrap();
                    plan_field(&name, field.value.as_ref(), field.type_annotation.as_deref(), false, false, 2, cx);
                }
            }
        }
    }

    const COMPONENT: &str = r#"
@Component({ props: { size: Number, tags: [String, Array] } })
export default class Card extends Vue {
  @Prop({ type: String, default: 'x' }) readonly title!: string
  @Prop(Number) count?: number
  @Getter('cart', 'items') items!: any[]
  @Action('fetch') fetch!: (p?: any) => Promise<void>
  @Ref() readonly input!: HTMLInputElement
  total = 0
  label = 'a'
  size = 3
  user = null
  form = { a: 1 }
  list: string[] = []
  alias = other
  timer = setInterval(() => {}, 10)
  get doubled() { return this.total * 2 }
}
"#;

    #[test]
    fn test_classification_table() {
        with_class(COMPONENT, |class| {
            let mut cx = RunContext::new("Card.vue");
            classify_and_plan(class, COMPONENT, &mut cx);

            let t = &cx.bindings;
            assert_eq!(t.get("title"), Some(BindingKind::PropBinding));
            assert_eq!(t.get("count"), Some(BindingKind::PropBinding));
            assert_eq!(t.get("size"), Some(BindingKind::PropBinding));
            assert_eq!(t.get("items"), Some(BindingKind::RefBinding));
            assert_eq!(t.get("fetch"), Some(BindingKind::StoreBinding));
            assert_eq!(t.get("input"), Some(BindingKind::RefBinding));
            assert_eq!(t.get("total"), Some(BindingKind::RefBinding));
            assert_eq!(t.get("user"), Some(BindingKind::RefBinding));
            assert_eq!(t.get("form"), Some(BindingKind::ReactiveBinding));
            assert_eq!(t.get("list"), Some(BindingKind::RefBinding));
            assert_eq!(t.get("timer"), Some(BindingKind::Plain));
            assert_eq!(t.get("doubled"), Some(BindingKind::RefBinding));
            assert!(!t.has("alias"));

            let names: Vec<&str> = cx.props.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["size", "tags", "title", "count"]);
            assert_eq!(cx.props[1].ty.as_deref(), Some("string | any[]"));
            assert_eq!(cx.props[2].ty.as_deref(), Some("string"));
            assert_eq!(cx.props[2].default_value.as_deref(), Some("'x'"));
            assert!(cx.props[3].optional);
        });
    }

    #[test]
    fn test_classification_is_idempotent() {
        with_class(COMPONENT, |class| {
            let mut cx = RunContext::new("Card.vue");
            classify_and_plan(class, COMPONENT, &mut cx);
            let once = cx.bindings.entries();
            let props_once = cx.props.clone();
            let records_once = cx.store_records.clone();

            classify_and_plan(class, COMPONENT, &mut cx);
            assert_eq!(cx.bindings.entries(), once);
            assert_eq!(cx.props, props_once);
            assert_eq!(cx.store_records, records_once);
        });
    }

    #[test]
    fn test_prop_name_outranks_literal() {
        with_class(COMPONENT, |class| {
            let mut cx = RunContext::new("Card.vue");
            classify_and_plan(class, COMPONENT, &mut cx);
            let size = class
                .body
                .body
                .iter()
                .find_map(|e| match e {
                    ClassElement::PropertyDefinition(f) if f.key.is_specific_id("size") => Some(f),
                    _ => None,
                })
                .unwrap();
            let plan = plan_field("size", size.value.as_ref(), None, false, false, 2, &mut cx);
            assert!(plan.is_none());
        });
    }

    #[test]
    fn test_prefer_ref_for_objects() {
        let src = "export default class A extends Vue {\n  form = { a: 1 }\n}\n";
        with_class(src, |class| {
            let mut cx = RunContext::new("A.vue");
            let ClassElement::PropertyDefinition(field) = &class.body.body[0] else {
                panic!("expected field");
            };
            let plan = plan_field("form", field.value.as_ref(), None, false, true, 2, &mut cx).unwrap();
            assert!(matches!(plan.shape, FieldShape::Reactive(_)));
            assert_eq!(cx.bindings.get("form"), Some(BindingKind::RefBinding));
        });
    }

    #[test]
    fn test_read_decorator_shapes() {
        let src = "export default class A extends Vue {\n  @cart.Getter('items') items!: any\n  @Emit\n  go() {}\n}\n";
        with_class(src, |class| {
            let ClassElement::PropertyDefinition(field) = &class.body.body[0] else {
                panic!("expected field");
            };
            let dec = read_decorator(&field.decorators[0], src).unwrap();
            assert_eq!(dec.name, "Getter");
            assert_eq!(dec.object.as_deref(), Some("cart"));
            assert_eq!(dec.string_arg(0), Some("items"));

            let ClassElement::MethodDefinition(method) = &class.body.body[1] else {
                panic!("expected method");
            };
            let dec = read_decorator(&method.decorators[0], src).unwrap();
            assert_eq!(dec.name, "Emit");
            assert!(dec.args.is_empty());
        });
    }
}
