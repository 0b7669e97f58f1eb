//! Watch jobs and their per-run failure classification.

use std::fmt;

/// An enabled document instance together with the names of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub instance_id: i32,
    pub document_id: i32,
    pub url: String,
    pub is_enabled: bool,
    pub company_name: String,
    pub service_name: String,
    pub document_name: String,
    pub language_code: String,
    pub language_name: String,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} [{}]",
            self.company_name, self.service_name, self.document_name, self.language_code
        )
    }
}

/// A transform module registered against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRegistration {
    pub id: i32,
    pub document_id: i32,
    pub module: String,
    pub execution_priority: i32,
}

/// Why a job ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    NetworkError,
    HttpStatusError,
    Timeout,
    StorageError,
    Panicked,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network-error",
            Self::HttpStatusError => "http-status-error",
            Self::Timeout => "timeout",
            Self::StorageError => "storage-error",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
