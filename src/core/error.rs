//! Error taxonomy for the analysis pipeline

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the DFM pipeline and its surroundings
#[derive(Debug, Error, Diagnostic)]
pub enum DfmError {
    #[error("No active document: there is no CAD data to analyze")]
    #[diagnostic(
        code(dfm::geometry::no_document),
        help("Open a shape document or pass --shape <FILE>")
    )]
    NoActiveDocument,

    #[error("Geometry extraction failed on face {face}: {reason}")]
    #[diagnostic(code(dfm::geometry::extraction))]
    GeometryExtraction { face: usize, reason: String },

    #[error("Rule evaluation failed: {0}")]
    #[diagnostic(code(dfm::rules::evaluation))]
    RuleEvaluation(String),

    #[error("Cache entry {path} is unreadable: {reason}")]
    #[diagnostic(code(dfm::cache::corruption))]
    CacheCorruption { path: PathBuf, reason: String },

    #[error("Invalid or missing API key")]
    #[diagnostic(
        code(dfm::auth::unauthorized),
        help("Pass the shared key with --api-key or set DFM_API_KEY")
    )]
    Unauthorized,

    #[error("Invalid request: {0}")]
    #[diagnostic(code(dfm::request::invalid))]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(dfm::io))]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(dfm::json))]
    Json(#[from] serde_json::Error),
}

pub type DfmResult<T> = Result<T, DfmError>;

impl DfmError {
    pub fn geometry(face: usize, reason: impl Into<String>) -> Self {
        Self::GeometryExtraction {
            face,
            reason: reason.into(),
        }
    }

    pub fn rules(reason: impl Into<String>) -> Self {
        Self::RuleEvaluation(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DfmError::geometry(7, "zero-length normal");
        assert_eq!(
            err.to_string(),
            "Geometry extraction failed on face 7: zero-length normal"
        );
        assert!(DfmError::NoActiveDocument
            .to_string()
            .contains("No active document"));
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = DfmError::rules("no constraints for casting");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("dfm::rules::evaluation"));
    }
}
