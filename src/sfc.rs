//! Script extraction for single-file components.
//!
//! Everything outside the selected `<script>` block is carried as opaque text
//! and reattached byte-for-byte by [`Document::assemble`].

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_REGEX: Regex =
        Regex::new(r"(?is)(<script\b([^>]*)>)([\s\S]*?)(</script\s*>)").unwrap();

    /// Attribute regex for parsing script attributes
    static ref ATTR_REGEX: Regex =
        Regex::new(r#"(?i)([a-z0-9:@-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub prefix: String,
    pub open_tag: String,
    pub script: String,
    pub close_tag: String,
    pub suffix: String,
    pub attributes: HashMap<String, String>,
}

impl Document {
    /// Selects the first `<script>` block that is not already `setup`.
    /// Returns `None` when the document has nothing to migrate.
    pub fn extract(source: &str) -> Option<Document> {
        for caps in SCRIPT_REGEX.captures_iter(source) {
            let whole = caps.get(0)?;
            let attrs = parse_attributes(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
            if attrs.contains_key("setup") {
                continue;
            }

            return Some(Document {
                prefix: source[..whole.start()].to_string(),
                open_tag: caps.get(1)?.as_str().to_string(),
                script: caps.get(3)?.as_str().to_string(),
                close_tag: caps.get(4)?.as_str().to_string(),
                suffix: source[whole.end()..].to_string(),
                attributes: attrs,
            });
        }
        None
    }

    /// Wraps a bare script so the same pipeline applies.
    pub fn bare(script: &str) -> Document {
        Document {
            prefix: String::new(),
            open_tag: String::new(),
            script: script.to_string(),
            close_tag: String::new(),
            suffix: String::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn has_tag(&self) -> bool {
        !self.open_tag.is_empty()
    }

    pub fn is_typescript(&self) -> bool {
        match self.attributes.get("lang").map(|s| s.as_str()) {
            Some(lang) => matches!(lang, "ts" | "tsx"),
            // Bare scripts and untagged blocks are parsed as TS anyway.
            None => !self.has_tag(),
        }
    }

    pub fn is_setup(&self) -> bool {
        self.attributes.contains_key("setup")
    }

    /// Adds the `setup` attribute to the opening tag.
    pub fn mark_setup(&mut self) {
        if !self.has_tag() || self.is_setup() {
            return;
        }
        if let Some(gt) = self.open_tag.rfind('>') {
            let head = self.open_tag[..gt].trim_end();
            self.open_tag = format!("{} setup>", head);
            self.attributes
                .insert("setup".to_string(), "true".to_string());
        }
    }

    pub fn assemble(&self) -> String {
        let mut out = String::with_capacity(
            self.prefix.len()
                + self.open_tag.len()
                + self.script.len()
                + self.close_tag.len()
                + self.suffix.len(),
        );
        out.push_str(&self.prefix);
        out.push_str(&self.open_tag);
        out.push_str(&self.script);
        out.push_str(&self.close_tag);
        out.push_str(&self.suffix);
        out
    }
}

fn parse_attributes(attr_string: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for attr_caps in ATTR_REGEX.captures_iter(attr_string) {
        if let Some(name) = attr_caps.get(1) {
            let value = attr_caps
                .get(2)
                .or_else(|| attr_caps.get(3))
                .or_else(|| attr_caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "true".to_string());
            attributes.insert(name.as_str().to_lowercase(), value);
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    const SFC: &str = r#"<template>
  <div @click="go">{{ this.count }}</div>
</template>

<script lang="ts">
export default class A {}
</script>

<style scoped>
.a { color: red; }
</style>
"#;

    #[test]
    fn test_extract_and_assemble_is_identity() {
        let doc = Document::extract(SFC).unwrap();
        assert_eq!(doc.open_tag, r#"<script lang="ts">"#);
        assert_eq!(doc.script, "\nexport default class A {}\n");
        assert!(doc.is_typescript());
        assert_eq!(doc.assemble(), SFC);
    }

    #[test]
    fn test_skips_existing_setup_block() {
        let html = "<script setup>\nconst a = 1\n</script>\n<script>\nexport default {}\n</script>";
        let doc = Document::extract(html).unwrap();
        assert_eq!(doc.script, "\nexport default {}\n");
        assert!(doc.prefix.contains("const a = 1"));

        assert!(Document::extract("<script setup>const a = 1</script>").is_none());
        assert!(Document::extract("<template><div/></template>").is_none());
    }

    #[test]
    fn test_mark_setup() {
        let mut doc = Document::extract(SFC).unwrap();
        doc.mark_setup();
        assert_eq!(doc.open_tag, r#"<script lang="ts" setup>"#);
        doc.mark_setup();
        assert_eq!(doc.open_tag, r#"<script lang="ts" setup>"#);

        let mut plain = Document::extract("<script>\n</script>").unwrap();
        assert!(!plain.is_typescript());
        plain.mark_setup();
        assert_eq!(plain.open_tag, "<script setup>");
    }

    #[test]
    fn test_bare_script_has_no_tag() {
        let mut doc = Document::bare("const a = 1\n");
        doc.mark_setup();
        assert_eq!(doc.assemble(), "const a = 1\n");
        assert!(doc.is_typescript());
    }
}
