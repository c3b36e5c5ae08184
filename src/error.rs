//! Error types for blueprinting, collection, rendering and interlinks.

use thiserror::Error;

/// Errors raised by the documentation pipeline.
///
/// Configuration problems carry remediation text; lookup problems name the
/// exact path that was attempted.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Unsupported option values, conflicting fields and similar user mistakes
    #[error("Configuration error: {0}")]
    Config(String),

    /// A config document failed to parse, with the location of the bad element
    #[error("Validation error: {0}")]
    Validation(String),

    /// The object loader could not find an object.
    ///
    /// Kept apart from any other "missing key" condition so that callers never
    /// confuse it with a missing handler.
    #[error(
        "Cannot find an object named: {path}. Does an object with the path {path} exist?"
    )]
    ObjectLookup { path: String },

    #[error("Alias chain starting at `{path}` did not resolve after {hops} hops. Is it cyclic?")]
    CyclicAlias { path: String, hops: usize },

    #[error("Could not resolve alias `{path}` (target `{target}`). Is the target module available?")]
    UnresolvedAlias { path: String, target: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("No page detected above current element: {0}")]
    NoPageDetected(String),

    /// A transformer or renderer was handed a node kind it has no handler for
    #[error("{operation} has no handler for node kind `{kind}`")]
    UnsupportedNode { operation: &'static str, kind: String },

    #[error("Reference syntax error: {0}")]
    RefSyntax(String),

    #[error("Inventory lookup error: {0}")]
    InvLookup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl BuildError {
    /// Whether the error was caused by user configuration rather than a lookup.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BuildError::Config(_) | BuildError::Validation(_) | BuildError::NotImplemented(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_names_path() {
        let err = BuildError::ObjectLookup {
            path: "quartodoc.bbb.ccc".to_string(),
        };
        assert!(err
            .to_string()
            .contains("Does an object with the path quartodoc.bbb.ccc exist?"));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_config_errors_are_flagged() {
        assert!(BuildError::Config("bad".into()).is_config_error());
        assert!(BuildError::NotImplemented("include".into()).is_config_error());
    }
}
