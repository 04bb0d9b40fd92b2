//! Text Normalizer.
//!
//! Post-print stages over the rewritten script region, in a fixed order with
//! declared preconditions. Stages never add declarations inline; they push
//! them onto [`ScriptState`]'s import and prelude lists, which are written
//! after the last import once every stage has run.

use std::fmt;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::config::MigrateOptions;
use crate::consolidate;
use crate::context::{ComponentProp, HookTarget, RunContext};
use crate::error::MigrationError;
use crate::lifecycle;
use crate::rewriter::run_pass;
use crate::sfc::Document;

// ═══════════════════════════════════════════════════════════════════════════════
// STAGES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// The AST rewrite; always complete before the first text stage.
    Rewrite,
    StripClassImports,
    ExtractEmits,
    InjectStore,
    InjectProps,
    InjectModel,
    MarkSetup,
    InjectRouter,
    StripThis,
    InjectTemplateRefs,
    ConsolidateStore,
    RewriteMessageService,
    InjectVueImports,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Rewrite => "rewrite",
            Stage::StripClassImports => "strip-class-imports",
            Stage::ExtractEmits => "extract-emits",
            Stage::InjectStore => "inject-store",
            Stage::InjectProps => "inject-props",
            Stage::InjectModel => "inject-model",
            Stage::MarkSetup => "mark-setup",
            Stage::InjectRouter => "inject-router",
            Stage::StripThis => "strip-this",
            Stage::InjectTemplateRefs => "inject-template-refs",
            Stage::ConsolidateStore => "consolidate-store",
            Stage::RewriteMessageService => "rewrite-message-service",
            Stage::InjectVueImports => "inject-vue-imports",
        }
    }

    /// Stages that must have completed before this one runs.
    pub fn requires(self) -> &'static [Stage] {
        match self {
            Stage::Rewrite => &[],
            Stage::StripClassImports
            | Stage::ExtractEmits
            | Stage::InjectStore
            | Stage::InjectProps
            | Stage::InjectModel
            | Stage::InjectRouter => &[Stage::Rewrite],
            Stage::MarkSetup => &[Stage::StripClassImports],
            // `this.$emit`, `this.$store` and `this.$route` must already be
            // recognized before `this.` disappears.
            Stage::StripThis => &[Stage::ExtractEmits, Stage::InjectStore, Stage::InjectRouter],
            Stage::InjectTemplateRefs => &[Stage::StripThis],
            Stage::ConsolidateStore => &[Stage::InjectStore, Stage::StripThis],
            Stage::RewriteMessageService => &[Stage::StripThis],
            Stage::InjectVueImports => &[
                Stage::InjectProps,
                Stage::InjectModel,
                Stage::InjectTemplateRefs,
            ],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT STATE
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref IMPORT_REGEX: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s(?:[^;'"]*?\bfrom\s*)?['"][^'"\n]*['"][ \t]*;?"#).unwrap();
    static ref IMPORT_CLAUSE_REGEX: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?([^;'"]*?)\s*\bfrom\s*['"]"#).unwrap();
    static ref CLASS_LIB_IMPORT_REGEX: Regex = Regex::new(
        r#"(?m)^[ \t]*import\s[^;'"]*?\bfrom\s*['"](?:vue-property-decorator|vue-class-component|vue-facing-decorator|vuex-class)['"][ \t]*;?[ \t]*\r?\n?"#
    )
    .unwrap();
    static ref VUE_DEFAULT_IMPORT_REGEX: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s+Vue\s+from\s*['"]vue['"][ \t]*;?[ \t]*\r?\n?"#).unwrap();
    static ref NAMED_IMPORT_REGEX: Regex = Regex::new(
        r#"(?m)^([ \t]*import\s*)\{([^}]*)\}(\s*from\s*['"](vue|vuex|pinia)['"][ \t]*;?)[ \t]*(\r?\n)?"#
    )
    .unwrap();

    static ref EMIT_CALL_REGEX: Regex =
        Regex::new(r#"\$emit\(\s*['"]([^'"]+)['"]"#).unwrap();
    static ref EMIT_DECORATOR_REGEX: Regex =
        Regex::new(r#"@Emit\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();

    static ref STORE_USE_REGEX: Regex =
        Regex::new(r"(?:^|[^\w$.])store\.|\$store\b").unwrap();

    /// Residual `@Prop(..) name: T` text the structural walk did not consume.
    static ref PROP_DECORATOR_REGEX: Regex = Regex::new(
        r"(?m)^[ \t]*@Prop\(([^)]*)\)\s*(?:readonly\s+)?([A-Za-z_$][\w$]*)([!?])?\s*:\s*([^;\n=]+);?[ \t]*\r?\n?"
    )
    .unwrap();

    static ref ROUTER_REGEX: Regex = Regex::new(r"(?:\bthis\.)?\$router\b").unwrap();
    static ref ROUTE_REGEX: Regex = Regex::new(r"(?:\bthis\.)?\$route\b").unwrap();

    static ref THIS_EMIT_REGEX: Regex = Regex::new(r"\bthis\.\$emit\(").unwrap();
    static ref THIS_REFS_REGEX: Regex = Regex::new(r"\bthis\.\$refs\b").unwrap();
    static ref THIS_NEXT_TICK_REGEX: Regex = Regex::new(r"\bthis\.\$nextTick\b").unwrap();
    static ref THIS_STORE_REGEX: Regex = Regex::new(r"\bthis\.\$store\b").unwrap();
    static ref THIS_MEMBER_REGEX: Regex = Regex::new(r"\bthis\.\$?([A-Za-z_][\w$]*)").unwrap();

    static ref TEMPLATE_REF_REGEX: Regex = Regex::new(
        r#"\$refs(?:\.([A-Za-z_$][\w$]*)|\[\s*['"]([^'"]+)['"]\s*\])"#
    )
    .unwrap();

    static ref MESSAGE_REGEX: Regex =
        Regex::new(r"(^|[^\w$.])\$?message\.(error|info|success|warning)\b").unwrap();

    static ref VUE_API_REGEX: Regex = Regex::new(
        r"(?:^|[^\w$.])(ref|reactive|computed|watch|toRefs|nextTick|onBeforeMount|onMounted|onBeforeUpdate|onUpdated|onBeforeUnmount|onUnmounted|onActivated|onDeactivated|onErrorCaptured)\s*[(<]"
    )
    .unwrap();
}

/// Composition APIs in the order they are imported.
const VUE_APIS: &[&str] = &[
    "ref",
    "reactive",
    "computed",
    "watch",
    "toRefs",
    "nextTick",
    "onBeforeMount",
    "onMounted",
    "onBeforeUpdate",
    "onUpdated",
    "onBeforeUnmount",
    "onUnmounted",
    "onActivated",
    "onDeactivated",
    "onErrorCaptured",
];

/// Helper names that stop being needed once a component is converted.
const OBSOLETE_SPECIFIERS: &[&str] = &[
    "defineComponent",
    "mapGetters",
    "mapState",
    "mapActions",
    "mapMutations",
];

/// Local names bound by import statements: default, namespace, named and
/// `as` aliases.
fn import_bindings(script: &str) -> Vec<String> {
    let mut names = Vec::new();
    for caps in IMPORT_CLAUSE_REGEX.captures_iter(script) {
        let clause = &caps[1];
        let (outer, named) = match (clause.find('{'), clause.rfind('}')) {
            (Some(open), Some(close)) if open < close => {
                let outer = format!("{} {}", &clause[..open], &clause[close + 1..]);
                (outer, Some(&clause[open + 1..close]))
            }
            _ => (clause.to_string(), None),
        };
        for part in outer.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let local = part.rsplit(char::is_whitespace).next().unwrap_or(part);
            names.push(local.to_string());
        }
        for spec in named.into_iter().flat_map(|n| n.split(',')) {
            let spec = spec.trim();
            if spec.is_empty() {
                continue;
            }
            let local = match spec.rsplit_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => spec.trim_start_matches("type ").trim(),
            };
            names.push(local.to_string());
        }
    }
    names
}

#[derive(Debug)]
pub struct ScriptState {
    pub doc: Document,
    pub(crate) imports: Vec<String>,
    pub(crate) prelude: Vec<String>,
}

impl ScriptState {
    pub fn new(doc: Document) -> Self {
        ScriptState {
            doc,
            imports: Vec::new(),
            prelude: Vec::new(),
        }
    }

    pub fn body(&self) -> &str {
        &self.doc.script
    }

    pub(crate) fn add_import(&mut self, line: String) {
        if !self.imports.contains(&line) {
            self.imports.push(line);
        }
    }

    pub(crate) fn add_prelude(&mut self, line: String) {
        if !self.prelude.contains(&line) {
            self.prelude.push(line);
        }
    }

    /// Whether `name` is declared or imported in the body, or declared in
    /// the prelude.
    pub(crate) fn declares(&self, name: &str) -> bool {
        if import_bindings(&self.doc.script).iter().any(|b| b == name) {
            return true;
        }
        let pattern = format!(
            r"(?:^|[^\w$.])(?:const|let|var|function|class)\s+{}\b",
            regex::escape(name)
        );
        match Regex::new(&pattern) {
            Ok(re) => re.is_match(&self.doc.script) || self.prelude.iter().any(|l| re.is_match(l)),
            Err(_) => false,
        }
    }

    fn is_empty(&self) -> bool {
        self.doc.script.trim().is_empty() && self.prelude.is_empty() && self.imports.is_empty()
    }

    /// Writes the pending imports after the last import and the prelude
    /// right below them.
    pub fn materialize(&mut self) {
        if self.imports.is_empty() && self.prelude.is_empty() {
            return;
        }
        let body = std::mem::take(&mut self.doc.script);
        let leading = if !self.doc.has_tag() {
            ""
        } else if body.starts_with("\r\n") {
            "\r\n"
        } else if body.starts_with('\n') {
            "\n"
        } else {
            ""
        };
        let trailing = if body.ends_with('\n') { "\n" } else { "" };
        let content = body.trim();

        let split = IMPORT_REGEX
            .find_iter(content)
            .last()
            .map(|m| m.end())
            .unwrap_or(0);
        let head = content[..split].trim_end();
        let rest = content[split..].trim_start();

        let mut import_block: Vec<&str> = Vec::new();
        if !head.is_empty() {
            import_block.push(head);
        }
        import_block.extend(self.imports.iter().map(String::as_str));

        let mut blocks = Vec::new();
        if !import_block.is_empty() {
            blocks.push(import_block.join("\n"));
        }
        if !self.prelude.is_empty() {
            blocks.push(self.prelude.join("\n"));
        }
        if !rest.is_empty() {
            blocks.push(rest.to_string());
        }

        self.doc.script = format!("{}{}{}", leading, blocks.join("\n\n"), trailing);
        self.imports.clear();
        self.prelude.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STAGE BODIES
// ═══════════════════════════════════════════════════════════════════════════════

fn strip_class_imports(state: &mut ScriptState) {
    let stripped = {
        let script = CLASS_LIB_IMPORT_REGEX.replace_all(&state.doc.script, "");
        let script = VUE_DEFAULT_IMPORT_REGEX.replace_all(&script, "");
        strip_obsolete_specifiers(&script)
    };
    state.doc.script = stripped;
}

fn strip_obsolete_specifiers(script: &str) -> String {
    NAMED_IMPORT_REGEX
        .replace_all(script, |caps: &Captures| {
            let kept: Vec<&str> = caps[2]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty() && !OBSOLETE_SPECIFIERS.contains(s))
                .collect();
            if kept.is_empty() {
                return String::new();
            }
            format!(
                "{}{{ {} }}{}{}",
                &caps[1],
                kept.join(", "),
                &caps[3],
                caps.get(5).map(|m| m.as_str()).unwrap_or("")
            )
        })
        .into_owned()
}

fn extract_emits(state: &mut ScriptState, cx: &mut RunContext) {
    let found: Vec<String> = EMIT_CALL_REGEX
        .captures_iter(&state.doc.script)
        .chain(EMIT_DECORATOR_REGEX.captures_iter(&state.doc.script))
        .map(|caps| caps[1].to_string())
        .collect();
    for event in &found {
        cx.add_emit(event);
    }
    if cx.emits.is_empty() {
        return;
    }
    let events: Vec<String> = cx.emits.iter().map(|e| format!("'{}'", e)).collect();
    tracing::debug!(count = events.len(), "emits declared");
    state.add_prelude(format!("const emit = defineEmits([{}])", events.join(", ")));
}

fn inject_store(state: &mut ScriptState) {
    if !STORE_USE_REGEX.is_match(&state.doc.script) || state.declares("store") {
        return;
    }
    state.add_import("import { useStore } from 'vuex'".to_string());
    state.add_prelude("const store = useStore()".to_string());
}

fn residual_props(state: &mut ScriptState) -> Vec<ComponentProp> {
    let mut props = Vec::new();
    for caps in PROP_DECORATOR_REGEX.captures_iter(&state.doc.script) {
        let options = caps[1].trim();
        let mut prop = ComponentProp::new(&caps[2], Some(caps[4].trim().to_string()));
        prop.optional = caps.get(3).is_some_and(|m| m.as_str() == "?");
        if !options.is_empty() {
            prop.runtime = Some(options.to_string());
        }
        props.push(prop);
    }
    if !props.is_empty() {
        tracing::debug!(count = props.len(), "props recovered from residual decorators");
        state.doc.script = PROP_DECORATOR_REGEX
            .replace_all(&state.doc.script, "")
            .into_owned();
    }
    props
}

fn render_props_ts(props: &[ComponentProp]) -> String {
    let fields: Vec<String> = props
        .iter()
        .map(|p| {
            let optional = p.optional || p.default_value.is_some();
            format!(
                "  {}{}: {}",
                p.name,
                if optional { "?" } else { "" },
                p.ty.as_deref().unwrap_or("any")
            )
        })
        .collect();
    let define = format!("defineProps<{{\n{}\n}}>()", fields.join("\n"));

    let defaults: Vec<String> = props
        .iter()
        .filter_map(|p| {
            p.default_value
                .as_ref()
                .map(|d| format!("  {}: {},", p.name, d))
        })
        .collect();
    if defaults.is_empty() {
        format!("const props = {}", define)
    } else {
        format!(
            "const props = withDefaults({}, {{\n{}\n}})",
            define,
            defaults.join("\n")
        )
    }
}

fn render_props_js(props: &[ComponentProp]) -> String {
    let fields: Vec<String> = props
        .iter()
        .map(|p| format!("  {}: {},", p.name, p.runtime.as_deref().unwrap_or("null")))
        .collect();
    format!("const props = defineProps({{\n{}\n}})", fields.join("\n"))
}

fn inject_props(state: &mut ScriptState, cx: &mut RunContext) {
    let mut props = std::mem::take(&mut cx.props);
    if props.is_empty() {
        props = residual_props(state);
    }
    if props.is_empty() {
        return;
    }
    let declaration = if state.doc.is_typescript() {
        render_props_ts(&props)
    } else {
        render_props_js(&props)
    };
    let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
    state.add_prelude(declaration);
    state.add_prelude(format!("const {{ {} }} = toRefs(props)", names.join(", ")));
}

fn inject_model(state: &mut ScriptState, cx: &RunContext) {
    let is_ts = state.doc.is_typescript();
    for model in &cx.models {
        let generic = match (&model.ty, is_ts) {
            (Some(ty), true) => format!("<{}>", ty),
            _ => String::new(),
        };
        state.add_prelude(format!(
            "const {} = defineModel{}('{}')",
            model.name, generic, model.name
        ));
    }
}

fn inject_router(state: &mut ScriptState, options: &MigrateOptions) {
    let uses_router = ROUTER_REGEX.is_match(&state.doc.script);
    let uses_route = ROUTE_REGEX.is_match(&state.doc.script);
    if !uses_router && !uses_route {
        return;
    }
    let script = ROUTER_REGEX.replace_all(&state.doc.script, "router");
    let script = ROUTE_REGEX.replace_all(&script, "route").into_owned();
    state.doc.script = script;

    let mut names = Vec::new();
    if uses_router {
        names.push("useRouter");
        state.add_prelude("const router = useRouter()".to_string());
    }
    if uses_route {
        names.push("useRoute");
        state.add_prelude("const route = useRoute()".to_string());
    }
    state.add_import(format!(
        "import {{ {} }} from '{}'",
        names.join(", "),
        options.router_module
    ));
}

fn strip_this(state: &mut ScriptState) {
    let script = THIS_EMIT_REGEX.replace_all(&state.doc.script, "emit(");
    let script = THIS_REFS_REGEX.replace_all(&script, "$$refs");
    let script = THIS_NEXT_TICK_REGEX.replace_all(&script, "nextTick");
    let script = THIS_STORE_REGEX.replace_all(&script, "store");
    let script = THIS_MEMBER_REGEX.replace_all(&script, "$1").into_owned();
    state.doc.script = script;
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn inject_template_refs(state: &mut ScriptState, cx: &mut RunContext) {
    let mut names: Vec<String> = Vec::new();
    let script = TEMPLATE_REF_REGEX.replace_all(&state.doc.script, |caps: &Captures| {
        let whole = caps[0].to_string();
        let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return whole;
        };
        if !is_identifier(name) {
            return whole;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        format!("{}.value", name)
    });
    let script = script.into_owned();
    if let Some(offset) = script.find("$refs") {
        cx.note(
            Stage::InjectTemplateRefs.name(),
            "template ref access not rewritten",
            offset as u32,
        );
    }
    state.doc.script = script;
    for name in names {
        if !state.declares(&name) {
            state.add_prelude(format!("const {} = ref()", name));
        }
    }
}

fn rewrite_message_service(state: &mut ScriptState, options: &MigrateOptions) {
    if !MESSAGE_REGEX.is_match(&state.doc.script) {
        return;
    }
    state.doc.script = MESSAGE_REGEX
        .replace_all(&state.doc.script, "${1}Message.$2")
        .into_owned();
    state.add_import(format!("import {{ Message }} from '{}'", options.message_module));
}

fn inject_vue_imports(state: &mut ScriptState, cx: &RunContext, options: &MigrateOptions) {
    let mut haystack = state.prelude.join("\n");
    haystack.push('\n');
    haystack.push_str(&state.doc.script);

    let used: Vec<&str> = VUE_APIS
        .iter()
        .copied()
        .filter(|api| {
            VUE_API_REGEX
                .captures_iter(&haystack)
                .any(|caps| &caps[1] == *api)
        })
        .collect();

    if !used.is_empty() {
        merge_vue_import(state, &used);
    }

    let app_hooks: Vec<&str> = lifecycle::app_page_hook_names()
        .filter(|hook| {
            cx.lifecycle
                .iter()
                .any(|r| r.target == HookTarget::AppPage(*hook))
        })
        .collect();
    if !app_hooks.is_empty() {
        state.add_import(format!(
            "import {{ {} }} from '{}'",
            app_hooks.join(", "),
            options.app_hooks_module
        ));
    }
}

fn merge_vue_import(state: &mut ScriptState, used: &[&str]) {
    let existing = NAMED_IMPORT_REGEX
        .captures_iter(&state.doc.script)
        .find(|caps| &caps[4] == "vue")
        .and_then(|caps| {
            let mut names: Vec<String> = caps[2]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            for api in used {
                if !names.iter().any(|n| n == api) {
                    names.push(api.to_string());
                }
            }
            let replacement = format!(
                "{}{{ {} }}{}{}",
                &caps[1],
                names.join(", "),
                &caps[3],
                caps.get(5).map(|m| m.as_str()).unwrap_or("")
            );
            caps.get(0).map(|m| (m.range(), replacement))
        });

    match existing {
        Some((range, replacement)) => state.doc.script.replace_range(range, &replacement),
        None => state
            .imports
            .insert(0, format!("import {{ {} }} from 'vue'", used.join(", "))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Pipeline { stages }
    }

    /// The fixed stage order, minus the stages the options turn off.
    pub fn standard(options: &MigrateOptions) -> Self {
        let mut stages = vec![
            Stage::StripClassImports,
            Stage::ExtractEmits,
            Stage::InjectStore,
            Stage::InjectProps,
            Stage::InjectModel,
        ];
        if !options.script_only {
            stages.push(Stage::MarkSetup);
        }
        stages.extend([Stage::InjectRouter, Stage::StripThis, Stage::InjectTemplateRefs]);
        if options.consolidate_store {
            stages.push(Stage::ConsolidateStore);
        }
        if options.rewrite_message_service {
            stages.push(Stage::RewriteMessageService);
        }
        stages.push(Stage::InjectVueImports);
        Pipeline { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage in order and materializes the pending declarations.
    /// Returns the completed stages, starting with [`Stage::Rewrite`].
    pub fn run(
        &self,
        state: &mut ScriptState,
        cx: &mut RunContext,
        options: &MigrateOptions,
    ) -> Result<Vec<Stage>, MigrationError> {
        let file = cx.file.clone();
        let mut completed = vec![Stage::Rewrite];

        for &stage in &self.stages {
            if let Some(&missing) = stage.requires().iter().find(|r| !completed.contains(r)) {
                return Err(MigrationError::StageOrder { stage, missing });
            }
            run_pass(&file, stage.name(), || apply(stage, state, cx, options))?;
            tracing::trace!(stage = %stage, "stage complete");
            completed.push(stage);
        }

        // Stages may empty the body temporarily; only the final text counts.
        if state.is_empty() {
            let stage = completed.last().copied().unwrap_or(Stage::Rewrite);
            return Err(MigrationError::EmptyOutput { file, stage });
        }
        state.materialize();
        Ok(completed)
    }
}

fn apply(stage: Stage, state: &mut ScriptState, cx: &mut RunContext, options: &MigrateOptions) {
    match stage {
        Stage::Rewrite => {}
        Stage::StripClassImports => strip_class_imports(state),
        Stage::ExtractEmits => extract_emits(state, cx),
        Stage::InjectStore => inject_store(state),
        Stage::InjectProps => inject_props(state, cx),
        Stage::InjectModel => inject_model(state, cx),
        Stage::MarkSetup => state.doc.mark_setup(),
        Stage::InjectRouter => inject_router(state, options),
        Stage::StripThis => strip_this(state),
        Stage::InjectTemplateRefs => inject_template_refs(state, cx),
        Stage::ConsolidateStore => consolidate::consolidate(state, cx, options),
        Stage::RewriteMessageService => rewrite_message_service(state, options),
        Stage::InjectVueImports => inject_vue_imports(state, cx, options),
    }
}
