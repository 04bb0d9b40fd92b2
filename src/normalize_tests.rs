#[cfg(test)]
mod tests {
    use crate::config::MigrateOptions;
    use crate::context::{ComponentProp, RunContext};
    use crate::error::MigrationError;
    use crate::normalize::{Pipeline, ScriptState, Stage};
    use crate::sfc::Document;
    use pretty_assertions::assert_eq;

    const THIS_STAGES: &[Stage] = &[
        Stage::ExtractEmits,
        Stage::InjectStore,
        Stage::InjectRouter,
        Stage::StripThis,
    ];

    fn script_only() -> MigrateOptions {
        MigrateOptions {
            script_only: true,
            ..MigrateOptions::default()
        }
    }

    fn run_stages(stages: &[Stage], doc: Document, cx: &mut RunContext, options: &MigrateOptions) -> String {
        let mut state = ScriptState::new(doc);
        Pipeline::new(stages.to_vec())
            .run(&mut state, cx, options)
            .unwrap();
        state.doc.script
    }

    fn run_standard(script: &str) -> String {
        let options = script_only();
        let mut cx = RunContext::new("t.ts");
        let mut state = ScriptState::new(Document::bare(script));
        Pipeline::standard(&options)
            .run(&mut state, &mut cx, &options)
            .unwrap();
        state.doc.script
    }

    fn ts_prop(name: &str, ty: &str, default: Option<&str>) -> ComponentProp {
        let mut prop = ComponentProp::new(name, Some(ty.to_string()));
        prop.default_value = default.map(str::to_string);
        prop
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ORDERING
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_missing_precondition_is_reported() {
        let mut state = ScriptState::new(Document::bare("const a = 1\n"));
        let mut cx = RunContext::new("t.ts");
        let err = Pipeline::new(vec![Stage::StripThis])
            .run(&mut state, &mut cx, &MigrateOptions::default())
            .unwrap_err();
        match err {
            MigrationError::StageOrder { stage, missing } => {
                assert_eq!(stage, Stage::StripThis);
                assert_eq!(missing, Stage::ExtractEmits);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_standard_pipeline_satisfies_its_own_preconditions() {
        for (consolidate, script_only, message) in [(false, false, false), (true, true, true)] {
            let options = MigrateOptions {
                consolidate_store: consolidate,
                script_only,
                rewrite_message_service: message,
                ..MigrateOptions::default()
            };
            let pipeline = Pipeline::standard(&options);
            let stages = pipeline.stages();
            for (i, stage) in stages.iter().enumerate() {
                for required in stage.requires() {
                    assert!(
                        *required == Stage::Rewrite || stages[..i].contains(required),
                        "{stage} runs before {required}"
                    );
                }
            }
            assert_eq!(stages.contains(&Stage::MarkSetup), !script_only);
            assert_eq!(stages.contains(&Stage::ConsolidateStore), consolidate);
            assert_eq!(stages.last(), Some(&Stage::InjectVueImports));
        }
    }

    #[test]
    fn test_empty_result_is_an_error() {
        let mut state = ScriptState::new(Document::bare("import Vue from 'vue'\n"));
        let mut cx = RunContext::new("t.ts");
        let err = Pipeline::new(vec![Stage::StripClassImports])
            .run(&mut state, &mut cx, &MigrateOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "MIGRATE-EMPTY");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAGES
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_class_imports_removed_and_vue_import_merged() {
        let out = run_standard(
            "import Vue from 'vue'\nimport { Component, Prop } from 'vue-property-decorator'\nimport { watchEffect } from 'vue'\nimport api from '@/api'\n\nconst count = ref(0)\nwatchEffect(() => api.log(count.value))\n",
        );
        assert_eq!(
            out,
            "import { watchEffect, ref } from 'vue'\nimport api from '@/api'\n\nconst count = ref(0)\nwatchEffect(() => api.log(count.value))\n"
        );
    }

    #[test]
    fn test_instance_members_become_composition_calls() {
        let out = run_standard(
            "const go = () => {\n  this.$router.push('/home')\n  this.$emit('done', this.$route.params.id)\n  this.$nextTick(() => this.$refs.form.validate())\n}\n",
        );
        assert_eq!(
            out,
            "import { ref, nextTick } from 'vue'\nimport { useRouter, useRoute } from 'vue-router'\n\nconst emit = defineEmits(['done'])\nconst router = useRouter()\nconst route = useRoute()\nconst form = ref()\n\nconst go = () => {\n  router.push('/home')\n  emit('done', route.params.id)\n  nextTick(() => form.value.validate())\n}\n"
        );
    }

    #[test]
    fn test_store_handle_injected_once() {
        let out = run_standard("const items = computed(() => this.$store.getters.items)\n");
        assert_eq!(
            out,
            "import { computed } from 'vue'\nimport { useStore } from 'vuex'\n\nconst store = useStore()\n\nconst items = computed(() => store.getters.items)\n"
        );
    }

    #[test]
    fn test_imported_store_is_not_redeclared() {
        let out = run_standard(
            "import store from '@/store'\n\nconst n = computed(() => this.$store.getters.count)\n",
        );
        assert_eq!(
            out,
            "import store from '@/store'\nimport { computed } from 'vue'\n\nconst n = computed(() => store.getters.count)\n"
        );
    }

    #[test]
    fn test_import_bindings_count_as_declarations() {
        let state = ScriptState::new(Document::bare(
            "import api, { list as fetchList, type Item } from '@/api'\nimport * as utils from './utils'\nimport { panel } from './refs'\n",
        ));
        for name in ["api", "fetchList", "Item", "utils", "panel"] {
            assert!(state.declares(name), "{name} should be declared");
        }
        assert!(!state.declares("list"));
        assert!(!state.declares("store"));
    }

    #[test]
    fn test_imported_template_ref_name_is_not_redeclared() {
        let mut cx = RunContext::new("t.ts");
        let mut stages = THIS_STAGES.to_vec();
        stages.push(Stage::InjectTemplateRefs);
        let out = run_stages(
            &stages,
            Document::bare("import { panel } from './refs'\nconst f = () => this.$refs.panel.open()\n"),
            &mut cx,
            &MigrateOptions::default(),
        );
        assert_eq!(out, "import { panel } from './refs'\nconst f = () => panel.value.open()\n");
    }

    #[test]
    fn test_export_default_text_in_strings_is_kept() {
        let out = run_standard("const hint = 'export default config'\n");
        assert_eq!(out, "const hint = 'export default config'\n");
    }

    #[test]
    fn test_typed_props_with_defaults() {
        let mut cx = RunContext::new("t.ts");
        cx.props = vec![
            ts_prop("title", "string", None),
            ts_prop("count", "number", Some("0")),
        ];
        let out = run_stages(
            &[Stage::InjectProps],
            Document::bare("const a = 1\n"),
            &mut cx,
            &MigrateOptions::default(),
        );
        assert_eq!(
            out,
            "const props = withDefaults(defineProps<{\n  title: string\n  count?: number\n}>(), {\n  count: 0,\n})\nconst { title, count } = toRefs(props)\n\nconst a = 1\n"
        );
        assert!(cx.props.is_empty(), "props are consumed");
    }

    #[test]
    fn test_runtime_props_for_plain_scripts() {
        let mut cx = RunContext::new("t.vue");
        let mut title = ComponentProp::new("title", Some("string".into()));
        title.runtime = Some("String".into());
        let mut count = ComponentProp::new("count", Some("number".into()));
        count.runtime = Some("{ type: Number, default: 0 }".into());
        count.default_value = Some("0".into());
        cx.props = vec![title, count];

        let doc = Document::extract("<script>\nconst a = 1\n</script>").unwrap();
        let out = run_stages(&[Stage::InjectProps], doc, &mut cx, &MigrateOptions::default());
        assert_eq!(
            out,
            "\nconst props = defineProps({\n  title: String,\n  count: { type: Number, default: 0 },\n})\nconst { title, count } = toRefs(props)\n\nconst a = 1\n"
        );
    }

    #[test]
    fn test_residual_prop_decorators_are_recovered() {
        let mut cx = RunContext::new("t.ts");
        let out = run_stages(
            &[Stage::InjectProps],
            Document::bare("@Prop({ default: 'x' }) label?: string\nconst a = 1\n"),
            &mut cx,
            &MigrateOptions::default(),
        );
        assert_eq!(
            out,
            "const props = defineProps<{\n  label?: string\n}>()\nconst { label } = toRefs(props)\n\nconst a = 1\n"
        );
    }

    #[test]
    fn test_models_use_define_model() {
        let mut cx = RunContext::new("t.ts");
        cx.models = vec![ComponentProp::new("value", Some("string".into()))];
        let out = run_stages(
            &[Stage::InjectModel],
            Document::bare("const a = 1\n"),
            &mut cx,
            &MigrateOptions::default(),
        );
        assert_eq!(out, "const value = defineModel<string>('value')\n\nconst a = 1\n");
    }

    #[test]
    fn test_existing_template_ref_declaration_is_reused() {
        let mut cx = RunContext::new("t.ts");
        let mut stages = THIS_STAGES.to_vec();
        stages.push(Stage::InjectTemplateRefs);
        let out = run_stages(
            &stages,
            Document::bare("const form = ref()\nconst f = () => this.$refs['form'].reset()\n"),
            &mut cx,
            &MigrateOptions::default(),
        );
        assert_eq!(out, "const form = ref()\nconst f = () => form.value.reset()\n");
        assert!(cx.notes.is_empty());
    }

    #[test]
    fn test_message_service_rewrite() {
        let mut cx = RunContext::new("t.ts");
        let mut stages = THIS_STAGES.to_vec();
        stages.push(Stage::RewriteMessageService);
        let out = run_stages(
            &stages,
            Document::bare("const f = () => this.$message.error('x')\n"),
            &mut cx,
            &MigrateOptions::default(),
        );
        assert_eq!(
            out,
            "import { Message } from 'element-ui'\n\nconst f = () => Message.error('x')\n"
        );
    }

    #[test]
    fn test_materialize_after_last_import() {
        let mut state = ScriptState::new(Document::bare(
            "\nimport a from 'a'\nimport { b } from \"b\";\n\nfoo()\n",
        ));
        state.add_import("import c from 'c'".to_string());
        state.add_prelude("const d = 1".to_string());
        state.materialize();
        assert_eq!(
            state.body(),
            "import a from 'a'\nimport { b } from \"b\";\nimport c from 'c'\n\nconst d = 1\n\nfoo()\n"
        );
    }
}
