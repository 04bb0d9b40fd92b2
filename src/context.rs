//! Per-file run state shared by every pass.
//!
//! A fresh [`RunContext`] is created for each file and dropped at the end of
//! that file's run; nothing here is global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Note;

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Plain,
    RefBinding,
    ReactiveBinding,
    PropBinding,
    StoreBinding,
}

impl BindingKind {
    /// Whether `this.<name>` must become `<name>.value`.
    pub fn needs_value_suffix(self) -> bool {
        matches!(self, BindingKind::RefBinding | BindingKind::PropBinding)
    }
}

/// Name → kind. A name is classified at most once; the table is frozen
/// before the use-site walk and rejects inserts afterwards.
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    bindings: HashMap<String, BindingKind>,
    order: Vec<String>,
    frozen: bool,
}

impl BindingTable {
    pub fn new() -> Self {
        BindingTable::default()
    }

    pub fn add(&mut self, name: &str, kind: BindingKind) -> Result<(), String> {
        if self.frozen {
            return Err(format!(
                "Cannot add binding \"{}\" after table is frozen.",
                name
            ));
        }
        match self.bindings.get(name) {
            Some(existing) if *existing != kind => {
                tracing::debug!(
                    name,
                    ?existing,
                    rejected = ?kind,
                    "binding already classified, keeping first kind"
                );
            }
            Some(_) => {}
            None => {
                self.bindings.insert(name.to_string(), kind);
                self.order.push(name.to_string());
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<BindingKind> {
        self.bindings.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<(String, BindingKind)> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.bindings[name]))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS & MODELS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProp {
    pub name: String,
    /// TypeScript type text, e.g. `number` or `'a' | 'b'`.
    pub ty: Option<String>,
    /// Runtime constructor text for plain-JS output, e.g. `Number`.
    pub runtime: Option<String>,
    pub optional: bool,
    pub default_value: Option<String>,
}

impl ComponentProp {
    pub fn new(name: impl Into<String>, ty: Option<String>) -> Self {
        ComponentProp {
            name: name.into(),
            ty,
            runtime: None,
            optional: false,
            default_value: None,
        }
    }
}

/// Maps a runtime constructor name to its TypeScript type.
pub fn constructor_type(ctor: &str) -> Option<&'static str> {
    Some(match ctor {
        "Number" => "number",
        "String" => "string",
        "Boolean" => "boolean",
        "Array" => "any[]",
        "Object" => "Record<string, any>",
        "Function" => "(...args: any[]) => any",
        "Date" => "Date",
        "Symbol" => "symbol",
        _ => return None,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    Action,
    Getter,
    State,
    Mutation,
}

impl StoreKind {
    pub fn from_name(name: &str) -> Option<StoreKind> {
        Some(match name {
            "Action" | "mapActions" => StoreKind::Action,
            "Getter" | "mapGetters" => StoreKind::Getter,
            "State" | "mapState" => StoreKind::State,
            "Mutation" | "mapMutations" => StoreKind::Mutation,
            _ => return None,
        })
    }

    /// State and getters become value-accessed derived bindings.
    pub fn is_derived(self) -> bool {
        matches!(self, StoreKind::Getter | StoreKind::State)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreBindingRecord {
    pub local_name: String,
    pub kind: StoreKind,
    pub namespace: Option<String>,
    pub remote_key: String,
}

impl StoreBindingRecord {
    /// `namespace/key`, or just `key` without a namespace.
    pub fn qualified_key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.remote_key),
            None => self.remote_key.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HookTarget {
    /// Body statements are emitted directly in setup.
    Inline,
    /// A composition hook imported from the framework.
    Framework(&'static str),
    /// An app-platform page hook (uni-app), imported from its own module.
    AppPage(&'static str),
}

impl HookTarget {
    pub fn call_name(self) -> Option<&'static str> {
        match self {
            HookTarget::Inline => None,
            HookTarget::Framework(name) | HookTarget::AppPage(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRewriteRecord {
    pub method: String,
    pub target: HookTarget,
    pub is_async: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUN CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct RunContext {
    pub file: String,
    pub bindings: BindingTable,
    pub props: Vec<ComponentProp>,
    pub models: Vec<ComponentProp>,
    pub store_records: Vec<StoreBindingRecord>,
    pub lifecycle: Vec<LifecycleRewriteRecord>,
    pub emits: Vec<String>,
    pub notes: Vec<Note>,
    /// Namespace helper name → (namespace, bound decorator kind for
    /// `namespace('ns', Getter)` forms).
    pub namespace_helpers: HashMap<String, (String, Option<StoreKind>)>,
    /// Whether the AST rewriter found a component to convert.
    pub converted_component: bool,
}

impl RunContext {
    pub fn new(file: &str) -> Self {
        RunContext {
            file: file.to_string(),
            ..RunContext::default()
        }
    }

    pub fn classify(&mut self, name: &str, kind: BindingKind) {
        if let Err(e) = self.bindings.add(name, kind) {
            tracing::warn!(file = %self.file, "{}", e);
        }
    }

    pub fn add_prop(&mut self, prop: ComponentProp) {
        if self.props.iter().any(|p| p.name == prop.name) {
            return;
        }
        self.classify(&prop.name, BindingKind::PropBinding);
        self.props.push(prop);
    }

    pub fn add_model(&mut self, model: ComponentProp) {
        if self.models.iter().any(|m| m.name == model.name) {
            return;
        }
        self.classify(&model.name, BindingKind::PropBinding);
        self.models.push(model);
    }

    pub fn has_prop(&self, name: &str) -> bool {
        self.props.iter().any(|p| p.name == name)
    }

    pub fn add_store_record(&mut self, record: StoreBindingRecord) {
        let kind = if record.kind.is_derived() {
            BindingKind::RefBinding
        } else {
            BindingKind::StoreBinding
        };
        self.classify(&record.local_name, kind);
        if !self
            .store_records
            .iter()
            .any(|r| r.local_name == record.local_name)
        {
            self.store_records.push(record);
        }
    }

    pub fn add_emit(&mut self, event: &str) {
        if !self.emits.iter().any(|e| e == event) {
            self.emits.push(event.to_string());
        }
    }

    pub fn note(&mut self, pass: &str, message: impl Into<String>, offset: u32) {
        let note = Note::unrecognized(pass, message, offset);
        tracing::warn!(file = %self.file, pass, offset, "{}", note.message);
        self.notes.push(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_classification_wins() {
        let mut table = BindingTable::new();
        table.add("count", BindingKind::RefBinding).unwrap();
        table.add("count", BindingKind::ReactiveBinding).unwrap();
        table.add("count", BindingKind::RefBinding).unwrap();
        assert_eq!(table.get("count"), Some(BindingKind::RefBinding));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_frozen_table_rejects_inserts() {
        let mut table = BindingTable::new();
        table.add("a", BindingKind::Plain).unwrap();
        table.freeze();
        assert!(table.is_frozen());
        assert!(table.add("b", BindingKind::RefBinding).is_err());
        assert!(!table.has("b"));
    }

    #[test]
    fn test_store_record_classification() {
        let mut cx = RunContext::new("A.vue");
        cx.add_store_record(StoreBindingRecord {
            local_name: "items".into(),
            kind: StoreKind::Getter,
            namespace: Some("cart".into()),
            remote_key: "items".into(),
        });
        cx.add_store_record(StoreBindingRecord {
            local_name: "fetch".into(),
            kind: StoreKind::Action,
            namespace: None,
            remote_key: "fetch".into(),
        });
        assert_eq!(cx.bindings.get("items"), Some(BindingKind::RefBinding));
        assert_eq!(cx.bindings.get("fetch"), Some(BindingKind::StoreBinding));
        assert_eq!(cx.store_records[0].qualified_key(), "cart/items");
        assert_eq!(cx.store_records[1].qualified_key(), "fetch");
    }
}
