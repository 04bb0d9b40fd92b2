//! Store-Decorator Converter.
//!
//! Resolves `@State/@Getter/@Action/@Mutation` decorators (and
//! `mapGetters`-style helpers) into [`StoreBindingRecord`]s, and renders one
//! standalone declaration per record.
//!
//! Arity decides the namespace:
//! - `@Getter` / `@Getter()` → key is the local name, no namespace
//! - `@Getter('key')` → no namespace
//! - `@Getter('ns', 'key')` → `ns/key`
//! - `@cart.Getter('key')` → namespace from the `cart` helper (or `cart` itself)
//! - `@CartGetter('key')` where `const CartGetter = namespace('cart', Getter)`

use std::collections::HashMap;

use oxc_ast::ast::{BindingPattern, Expression, Statement, VariableDeclaration};
use oxc_span::Span;

use crate::classify::{read_arg, ArgValue, DecoratorInfo};
use crate::context::{StoreBindingRecord, StoreKind};

pub type NamespaceHelpers = HashMap<String, (String, Option<StoreKind>)>;

/// `Ok(None)` when the decorator is not a store decorator at all,
/// `Err(reason)` for a store decorator whose arguments are not understood.
pub fn resolve_decorator(
    dec: &DecoratorInfo,
    local: &str,
    helpers: &NamespaceHelpers,
) -> Result<Option<StoreBindingRecord>, String> {
    // Which namespace and kind the callee itself implies.
    let (kind, helper_ns) = match (&dec.object, helpers.get(&dec.name)) {
        (None, Some((ns, Some(kind)))) => (*kind, Some(ns.clone())),
        (None, _) => match StoreKind::from_name(&dec.name) {
            Some(kind) => (kind, None),
            None => return Ok(None),
        },
        (Some(object), _) => match StoreKind::from_name(&dec.name) {
            Some(kind) => {
                let ns = helpers
                    .get(object)
                    .map(|(ns, _)| ns.clone())
                    .unwrap_or_else(|| object.clone());
                (kind, Some(ns))
            }
            None => return Ok(None),
        },
    };

    let record = |namespace: Option<String>, key: &str| StoreBindingRecord {
        local_name: local.to_string(),
        kind,
        namespace,
        remote_key: key.to_string(),
    };

    match dec.args.as_slice() {
        [] => Ok(Some(record(helper_ns, local))),
        [key] => match key.as_str() {
            Some(k) => Ok(Some(record(helper_ns, k))),
            None => Err(format!(
                "@{} argument `{}` is not a string key",
                dec.name, key.text
            )),
        },
        [ns, key] if helper_ns.is_none() => match (ns.as_str(), key.as_str()) {
            (Some(ns), Some(k)) => Ok(Some(record(Some(ns.to_string()), k))),
            _ => Err(format!(
                "@{}({}, {}) needs a string namespace and key",
                dec.name, ns.text, key.text
            )),
        },
        _ => Err(format!(
            "@{} with {} arguments is not a recognized store binding",
            dec.name,
            dec.args.len()
        )),
    }
}

/// Recognizes `const cart = namespace('cart')` and
/// `const CartGetter = namespace('cart', Getter)`.
pub fn namespace_helper(
    decl: &VariableDeclaration,
    src: &str,
) -> Option<(String, String, Option<StoreKind>)> {
    if decl.declarations.len() != 1 {
        return None;
    }
    let declarator = &decl.declarations[0];
    let BindingPattern::BindingIdentifier(id) = &declarator.id else {
        return None;
    };
    let Some(Expression::CallExpression(call)) = &declarator.init else {
        return None;
    };
    if !matches!(&call.callee, Expression::Identifier(callee) if callee.name == "namespace") {
        return None;
    }

    let args: Vec<_> = call
        .arguments
        .iter()
        .filter_map(|a| a.as_expression().map(|e| read_arg(e, src)))
        .collect();
    let ns = args.first()?.as_str()?.to_string();
    let kind = match args.get(1).map(|a| &a.value) {
        Some(ArgValue::Ident(name)) => Some(StoreKind::from_name(name)?),
        Some(_) => return None,
        None => None,
    };
    Some((id.name.to_string(), ns, kind))
}

/// Collects namespace helpers from top-level statements. Returns the spans of
/// the helper statements so they can be removed.
pub fn collect_namespace_helpers(
    body: &[Statement],
    src: &str,
    helpers: &mut NamespaceHelpers,
) -> Vec<Span> {
    let mut spans = Vec::new();
    for stmt in body {
        if let Statement::VariableDeclaration(decl) = stmt {
            if let Some((name, ns, kind)) = namespace_helper(decl, src) {
                tracing::debug!(helper = %name, namespace = %ns, "namespace helper");
                helpers.insert(name, (ns, kind));
                spans.push(decl.span);
            }
        }
    }
    spans
}

/// Resolves `mapGetters(..)`-style arguments: `([..])`, `({ local: 'key' })`,
/// `('ns', [..])`, `('ns', { .. })`.
pub fn resolve_map_helper(
    kind: StoreKind,
    args: &[crate::classify::Arg],
) -> Result<Vec<StoreBindingRecord>, String> {
    let (namespace, list) = match args {
        [list] => (None, list),
        [ns, list] => match ns.as_str() {
            Some(ns) => (Some(ns.to_string()), list),
            None => return Err(format!("namespace `{}` is not a string", ns.text)),
        },
        _ => return Err(format!("{} arguments to a map helper", args.len())),
    };

    let record = |local: &str, key: &str| StoreBindingRecord {
        local_name: local.to_string(),
        kind,
        namespace: namespace.clone(),
        remote_key: key.to_string(),
    };

    match &list.value {
        ArgValue::Array(items) => items
            .iter()
            .map(|item| match item.as_str() {
                // `'cart/items'` without a namespace argument keeps its path as
                // the key and binds the last segment locally.
                Some(key) => Ok(record(key.rsplit('/').next().unwrap_or(key), key)),
                None => Err(format!("map entry `{}` is not a string", item.text)),
            })
            .collect(),
        ArgValue::Object(entries) => entries
            .iter()
            .map(|(local, value)| match value.as_str() {
                Some(key) => Ok(record(local, key)),
                None => Err(format!("map entry `{}: {}` is not a string", local, value.text)),
            })
            .collect(),
        _ => Err(format!("map helper argument `{}` not understood", list.text)),
    }
}

fn is_identifier_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn state_path(record: &StoreBindingRecord) -> String {
    let mut path = String::from("store.state");
    let segments = record
        .namespace
        .iter()
        .flat_map(|ns| ns.split('/'))
        .chain(std::iter::once(record.remote_key.as_str()));
    for segment in segments {
        if is_identifier_name(segment) {
            path.push('.');
            path.push_str(segment);
        } else {
            path.push_str(&format!("['{}']", segment));
        }
    }
    path
}

/// Renders the inline declaration for one record.
pub fn render_record(record: &StoreBindingRecord, is_ts: bool) -> String {
    let key = record.qualified_key();
    let params = if is_ts { "params?" } else { "params" };
    match record.kind {
        StoreKind::Getter => format!(
            "const {} = computed(() => store.getters['{}'])",
            record.local_name, key
        ),
        StoreKind::State => format!(
            "const {} = computed(() => {})",
            record.local_name,
            state_path(record)
        ),
        StoreKind::Action => format!(
            "const {} = ({}) => store.dispatch('{}', params)",
            record.local_name, params, key
        ),
        StoreKind::Mutation => format!(
            "const {} = ({}) => store.commit('{}', params)",
            record.local_name, params, key
        ),
    }
}
