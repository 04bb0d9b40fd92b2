//! Per-run migration options.

use serde::{Deserialize, Serialize};

/// Which component authoring style the input uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceSyntax {
    /// `@Component` classes (vue-property-decorator, vue-facing-decorator, vuex-class).
    Decorator,
    /// `export default { data, computed, methods }`.
    ObjectConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrateOptions {
    /// `None` detects the syntax from the parsed script.
    pub syntax: Option<SourceSyntax>,
    /// Group namespaced store bindings into pinia store handles.
    pub consolidate_store: bool,
    /// The input is a bare script, not a `.vue` document.
    pub script_only: bool,
    /// Emit `ref(...)` instead of `reactive(...)` for object-shaped fields.
    pub prefer_ref: bool,
    pub router_module: String,
    pub store_module_prefix: String,
    pub app_hooks_module: String,
    /// Rewrite `message.error(...)` style calls to the `Message` service.
    pub rewrite_message_service: bool,
    pub message_module: String,
    /// Name used in diagnostics.
    pub file_name: String,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        MigrateOptions {
            syntax: None,
            consolidate_store: false,
            script_only: false,
            prefer_ref: false,
            router_module: "vue-router".to_string(),
            store_module_prefix: "@/stores/".to_string(),
            app_hooks_module: "@dcloudio/uni-app".to_string(),
            rewrite_message_service: false,
            message_module: "element-ui".to_string(),
            file_name: "<input>".to_string(),
        }
    }
}

impl MigrateOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts =
            MigrateOptions::from_json(r#"{ "consolidateStore": true, "syntax": "objectConfig" }"#)
                .unwrap();
        assert!(opts.consolidate_store);
        assert_eq!(opts.syntax, Some(SourceSyntax::ObjectConfig));
        assert_eq!(opts.router_module, "vue-router");
        assert!(!opts.prefer_ref);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(MigrateOptions::from_json("  ").unwrap(), MigrateOptions::default());
    }
}
