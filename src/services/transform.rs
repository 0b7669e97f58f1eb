//! Transform pipeline applied to fetched text before change detection.

use std::sync::Arc;

use crate::models::{Job, TransformRegistration};
use crate::plugins::PluginRegistry;

/// Result of running a job's transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub text: String,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct TransformPipeline {
    registry: Arc<PluginRegistry>,
}

impl TransformPipeline {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// Run every registration in ascending priority, feeding each output to
    /// the next one.
    ///
    /// Within a module, a variant for the job's document and language is
    /// preferred over a document-only variant, which is preferred over the
    /// plugin's default transform. A module missing from the registry is
    /// skipped with a warning.
    pub fn apply(
        &self,
        job: &Job,
        registrations: &[TransformRegistration],
        raw: String,
    ) -> TransformOutput {
        let mut ordered: Vec<&TransformRegistration> = registrations.iter().collect();
        ordered.sort_by_key(|r| (r.execution_priority, r.id));

        let mut text = raw;
        let mut warnings = Vec::new();

        for registration in ordered {
            let Some(plugin) = self.registry.get(&registration.module) else {
                let warning = format!(
                    "Transform module \"{}\" for {} is not registered, passing text through",
                    registration.module, job
                );
                tracing::warn!(instance_id = job.instance_id, "{}", warning);
                warnings.push(warning);
                continue;
            };

            let variant = plugin
                .variant(&job.document_name, Some(&job.language_code))
                .or_else(|| plugin.variant(&job.document_name, None));

            text = match variant {
                Some(transform) => transform.apply(&text),
                None => plugin.transform(&text),
            };
        }

        TransformOutput { text, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentInstanceGraph;
    use crate::plugins::{Plugin, Transform};

    /// Appends a tag so the order of application is visible.
    struct Tagger {
        module: &'static str,
        doc_variant: Option<Box<dyn Transform>>,
        lang_variant: Option<Box<dyn Transform>>,
    }

    impl Tagger {
        fn new(module: &'static str) -> Self {
            Self {
                module,
                doc_variant: None,
                lang_variant: None,
            }
        }
    }

    impl Plugin for Tagger {
        fn module(&self) -> &str {
            self.module
        }

        fn get_models(&self) -> Vec<DocumentInstanceGraph> {
            Vec::new()
        }

        fn transform(&self, text: &str) -> String {
            format!("{}+{}", text, self.module)
        }

        fn variant(&self, document: &str, language: Option<&str>) -> Option<&dyn Transform> {
            if document != "Terms of Use" {
                return None;
            }
            match language {
                Some("en") => self.lang_variant.as_deref(),
                Some(_) => None,
                None => self.doc_variant.as_deref(),
            }
        }
    }

    fn job(language_code: &str) -> Job {
        Job {
            instance_id: 1,
            document_id: 1,
            url: "example.test/tos".into(),
            is_enabled: true,
            company_name: "Test Inc".into(),
            service_name: "Test".into(),
            document_name: "Terms of Use".into(),
            language_code: language_code.into(),
            language_name: "English".into(),
        }
    }

    fn registration(id: i32, module: &str, execution_priority: i32) -> TransformRegistration {
        TransformRegistration {
            id,
            document_id: 1,
            module: module.into(),
            execution_priority,
        }
    }

    fn pipeline(plugins: Vec<Tagger>) -> TransformPipeline {
        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry.register(Arc::new(plugin));
        }
        TransformPipeline::new(Arc::new(registry))
    }

    #[test]
    fn test_no_registrations_pass_through() {
        let output = pipeline(vec![]).apply(&job("en"), &[], "raw".into());
        assert_eq!(output.text, "raw");
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_ascending_priority_order() {
        let output = pipeline(vec![Tagger::new("a"), Tagger::new("b"), Tagger::new("c")]).apply(
            &job("en"),
            &[
                registration(1, "c", 3),
                registration(2, "a", -1),
                registration(3, "b", 0),
            ],
            "raw".into(),
        );
        assert_eq!(output.text, "raw+a+b+c");
    }

    #[test]
    fn test_missing_module_is_identity_with_warning() {
        let output = pipeline(vec![Tagger::new("a")]).apply(
            &job("en"),
            &[registration(1, "gone", 0), registration(2, "a", 1)],
            "raw".into(),
        );
        assert_eq!(output.text, "raw+a");
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("\"gone\""));
    }

    #[test]
    fn test_variant_resolution_prefers_language() {
        let mut tagger = Tagger::new("a");
        tagger.doc_variant = Some(Box::new(|t: &str| format!("{}+doc", t)));
        tagger.lang_variant = Some(Box::new(|t: &str| format!("{}+lang", t)));
        let pipeline = pipeline(vec![tagger]);
        let regs = [registration(1, "a", 0)];

        assert_eq!(pipeline.apply(&job("en"), &regs, "raw".into()).text, "raw+lang");
        assert_eq!(pipeline.apply(&job("fr"), &regs, "raw".into()).text, "raw+doc");
    }

    #[test]
    fn test_document_variant_falls_back_to_default() {
        let mut tagger = Tagger::new("a");
        tagger.lang_variant = Some(Box::new(|t: &str| format!("{}+lang", t)));
        let pipeline = pipeline(vec![tagger]);
        let regs = [registration(1, "a", 0)];

        assert_eq!(pipeline.apply(&job("fr"), &regs, "raw".into()).text, "raw+a");
    }
}
