//! Plugin-supplied entity graphs.
//!
//! A graph is the full ancestor chain of one document instance, built by a
//! plugin and handed by value to the loader. Nothing in here has a database
//! id; the loader resolves every node by its natural key.

/// Company at the top of the hierarchy. Keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyNode {
    pub name: String,
    pub website: Option<String>,
}

/// Service offered by a company. Keyed by (company, name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNode {
    pub name: String,
    pub website: Option<String>,
}

/// Document published for a service. Keyed by (service, name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    pub name: String,
}

/// Language keyed by its two-letter ISO 639-1 code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageNode {
    pub name: String,
    pub code: String,
}

/// One (document, language) pairing together with every ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInstanceGraph {
    pub company: CompanyNode,
    pub service: ServiceNode,
    pub document: DocumentNode,
    pub language: LanguageNode,
    pub url: String,
    pub is_enabled: bool,
    /// Priority of the transform registered for the document's module.
    pub transform_priority: i32,
}

impl DocumentInstanceGraph {
    /// Build an enabled graph without websites.
    pub fn new(
        company: impl Into<String>,
        service: impl Into<String>,
        document: impl Into<String>,
        language: LanguageNode,
        url: impl Into<String>,
    ) -> Self {
        Self {
            company: CompanyNode {
                name: company.into(),
                website: None,
            },
            service: ServiceNode {
                name: service.into(),
                website: None,
            },
            document: DocumentNode {
                name: document.into(),
            },
            language,
            url: url.into(),
            is_enabled: true,
            transform_priority: 0,
        }
    }

    pub fn with_company_website(mut self, website: impl Into<String>) -> Self {
        self.company.website = Some(website.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    /// Human-readable natural key of the instance, e.g. `Terms of Use [en]`.
    pub fn instance_key(&self) -> String {
        format!("{} [{}]", self.document.name, self.language.code)
    }
}

impl LanguageNode {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}
