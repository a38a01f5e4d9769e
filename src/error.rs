//! Error taxonomy.
//!
//! Two families, kept apart on purpose:
//! - Schema/data problems in a parsed document are *accumulated* as
//!   [`ApiError`] records over the whole parse attempt and surfaced
//!   together in one [`Error::Document`].
//! - Model/metadata problems (missing metadata, bad lookups, duplicate
//!   registrations) abort immediately with a single descriptive error.

use serde::{Deserialize, Serialize};

use crate::coerce::ScalarKind;

pub type Result<T> = std::result::Result<T, Error>;

/// One structured diagnostic for a malformed document.
///
/// `source` is a JSON-pointer-like path into the offending document
/// (`/data/relationships/author`). Callers should expect many of these
/// per failed parse, not just the first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub title: String,
    pub detail: String,
    pub source: String,
}

impl ApiError {
    pub fn new(
        title: impl Into<String>,
        detail: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every schema diagnostic collected over one parse attempt.
    #[error("document failed to parse with {} error(s)", .0.len())]
    Document(Vec<ApiError>),

    /// Input was not even JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A document shape this crate deliberately does not handle.
    #[error("unsupported document shape: {detail}")]
    Unsupported { detail: String },

    /// Required metadata absent on an otherwise registered type.
    #[error("{owner}: missing {what} metadata")]
    MetadataMissing {
        owner: String,
        what: &'static str,
    },

    /// A named member (attribute, relationship, link) was not declared.
    #[error("{owner}: no {what} named `{name}`")]
    MemberMissing {
        owner: String,
        what: &'static str,
        name: String,
    },

    /// A service-model lookup missed entirely.
    #[error("service model: no {kind} registered for {key}")]
    ModelLookup {
        kind: &'static str,
        key: String,
    },

    /// Model construction/initialization defect (duplicate registration,
    /// dangling complex-type reference, home-type miscount).
    #[error("service model: {detail}")]
    Model { detail: String },

    /// Scalar conversion failure.
    #[error("cannot coerce {from} to {to}: {detail}")]
    Coerce {
        from: ScalarKind,
        to: ScalarKind,
        detail: String,
    },

    /// Textual value did not parse as the requested scalar kind.
    #[error("cannot parse `{text}` as {kind}")]
    Parse { text: String, kind: ScalarKind },
}

impl Error {
    /// The accumulated diagnostics, when this is a document error.
    pub fn document_errors(&self) -> Option<&[ApiError]> {
        match self {
            Error::Document(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_error_reports_count() {
        let err = Error::Document(vec![
            ApiError::new("a", "b", "/data"),
            ApiError::new("c", "d", "/meta"),
        ]);
        assert_eq!(err.to_string(), "document failed to parse with 2 error(s)");
        assert_eq!(err.document_errors().unwrap().len(), 2);
    }

    #[test]
    fn member_missing_names_owner_and_key() {
        let err = Error::MemberMissing {
            owner: "ResourceType<Article>".into(),
            what: "relationship",
            name: "author".into(),
        };
        assert_eq!(
            err.to_string(),
            "ResourceType<Article>: no relationship named `author`"
        );
    }
}
