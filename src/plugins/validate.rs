//! Install-time checks on the graphs a plugin supplies.

use thiserror::Error;

use crate::http_client::normalize_url;
use crate::models::DocumentInstanceGraph;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Module \"{module}\" returned no models")]
    EmptyModels { module: String },

    #[error("Model {index} is missing at least one instance of the following entity: {entity}")]
    MissingEntity { index: usize, entity: &'static str },

    #[error("Model {index} has an invalid ISO 639-1 language code \"{code}\"")]
    InvalidLanguageCode { index: usize, code: String },

    #[error("Model {index} has an invalid url \"{url}\"")]
    InvalidUrl { index: usize, url: String },
}

/// Check that every graph carries a full ancestor chain before anything is
/// written.
pub fn validate_models(
    module: &str,
    models: &[DocumentInstanceGraph],
) -> Result<(), ValidationError> {
    if models.is_empty() {
        return Err(ValidationError::EmptyModels {
            module: module.to_string(),
        });
    }

    for (index, graph) in models.iter().enumerate() {
        let chain = [
            ("Company", graph.company.name.as_str()),
            ("Service", graph.service.name.as_str()),
            ("Document", graph.document.name.as_str()),
            ("Language", graph.language.code.as_str()),
            ("DocumentInstance", graph.url.as_str()),
        ];
        if let Some((entity, _)) = chain.iter().find(|(_, key)| key.trim().is_empty()) {
            return Err(ValidationError::MissingEntity { index, entity });
        }

        let code = &graph.language.code;
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::InvalidLanguageCode {
                index,
                code: code.clone(),
            });
        }

        if normalize_url(&graph.url).is_err() {
            return Err(ValidationError::InvalidUrl {
                index,
                url: graph.url.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageNode;

    fn graph() -> DocumentInstanceGraph {
        DocumentInstanceGraph::new(
            "Test Inc",
            "Test",
            "Terms of Use",
            LanguageNode::new("English", "en"),
            "example.test/tos",
        )
    }

    #[test]
    fn test_complete_graph_passes() {
        assert_eq!(validate_models("tests", &[graph()]), Ok(()));
    }

    #[test]
    fn test_empty_models() {
        assert_eq!(
            validate_models("tests", &[]),
            Err(ValidationError::EmptyModels {
                module: "tests".into()
            })
        );
    }

    #[test]
    fn test_missing_ancestor_is_named() {
        let mut incomplete = graph();
        incomplete.service.name = "  ".into();

        let err = validate_models("tests", &[graph(), incomplete]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingEntity {
                index: 1,
                entity: "Service"
            }
        );
        assert_eq!(
            err.to_string(),
            "Model 1 is missing at least one instance of the following entity: Service"
        );
    }

    #[test]
    fn test_language_code_shape() {
        for code in ["eng", "EN", "e1"] {
            let mut g = graph();
            g.language.code = code.into();
            assert!(matches!(
                validate_models("tests", &[g]),
                Err(ValidationError::InvalidLanguageCode { .. })
            ));
        }
    }

    #[test]
    fn test_bad_url() {
        let g = graph().with_url("http://exa mple.test/");
        assert!(matches!(
            validate_models("tests", &[g]),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }
}
