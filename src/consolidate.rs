//! Store consolidation.
//!
//! Replaces the per-binding store declarations of each namespace with one
//! module store handle plus destructured bindings. Records without a
//! namespace keep their inline form.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::MigrateOptions;
use crate::context::{RunContext, StoreBindingRecord};
use crate::normalize::ScriptState;
use crate::store::render_record;

lazy_static! {
    static ref STORE_HANDLE_REGEX: Regex = Regex::new(r"(?:^|[^\w$.])store\.").unwrap();
}

/// `user/profile` → `UserProfile`.
fn pascal_case(namespace: &str) -> String {
    namespace
        .split(|c: char| c == '/' || c == '-' || c == '_' || c == '.')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn camel_case(namespace: &str) -> String {
    let pascal = pascal_case(namespace);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => pascal,
    }
}

fn binding(record: &StoreBindingRecord) -> String {
    if record.local_name == record.remote_key {
        record.local_name.clone()
    } else {
        format!("{}: {}", record.remote_key, record.local_name)
    }
}

/// Removes one whole line equal to `line` (ignoring indentation).
fn remove_line(script: &mut String, line: &str) -> bool {
    let mut offset = 0;
    for current in script.split_inclusive('\n') {
        if current.trim() == line {
            script.replace_range(offset..offset + current.len(), "");
            return true;
        }
        offset += current.len();
    }
    false
}

/// Groups namespaced records in first-seen order.
fn by_namespace(records: &[StoreBindingRecord]) -> Vec<(String, Vec<&StoreBindingRecord>)> {
    let mut groups: Vec<(String, Vec<&StoreBindingRecord>)> = Vec::new();
    for record in records {
        let Some(namespace) = &record.namespace else {
            continue;
        };
        match groups.iter_mut().find(|(ns, _)| ns == namespace) {
            Some((_, members)) => members.push(record),
            None => groups.push((namespace.clone(), vec![record])),
        }
    }
    groups
}

pub fn consolidate(state: &mut ScriptState, cx: &mut RunContext, options: &MigrateOptions) {
    let is_ts = state.doc.is_typescript();
    let groups = by_namespace(&cx.store_records);
    if groups.is_empty() {
        return;
    }

    for (namespace, records) in &groups {
        let handle = format!("{}Store", camel_case(namespace));
        let factory = format!("use{}Store", pascal_case(namespace));

        for record in records {
            if !remove_line(&mut state.doc.script, &render_record(record, is_ts)) {
                tracing::debug!(local = %record.local_name, "inline store declaration not found");
            }
        }

        state.add_import(format!(
            "import {{ {} }} from '{}{}'",
            factory, options.store_module_prefix, namespace
        ));
        state.add_prelude(format!("const {} = {}()", handle, factory));

        let direct: Vec<String> = records
            .iter()
            .filter(|r| !r.kind.is_derived())
            .map(|r| binding(r))
            .collect();
        if !direct.is_empty() {
            state.add_prelude(format!("const {{ {} }} = {}", direct.join(", "), handle));
        }

        let derived: Vec<String> = records
            .iter()
            .filter(|r| r.kind.is_derived())
            .map(|r| binding(r))
            .collect();
        if !derived.is_empty() {
            state.add_import("import { storeToRefs } from 'pinia'".to_string());
            state.add_prelude(format!(
                "const {{ {} }} = storeToRefs({})",
                derived.join(", "),
                handle
            ));
        }
        tracing::debug!(namespace = %namespace, bindings = records.len(), "store consolidated");
    }

    if !STORE_HANDLE_REGEX.is_match(&state.doc.script) {
        state.prelude.retain(|line| line != "const store = useStore()");
        state.imports.retain(|line| line != "import { useStore } from 'vuex'");
    }
}
