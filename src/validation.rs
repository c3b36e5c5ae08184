//! Path-annotated configuration errors.
//!
//! Layout parsing tracks where it is in the user's `sections` tree. When an
//! element is rejected the location is rendered the way a user would search
//! for it in `_quarto.yml`, e.g. "`name` for element 1 in the list for
//! `contents` located in element 0 in the list for `sections`".

use std::fmt;

use crate::error::BuildError;

/// One step into the configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of an element within the configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPath {
    segments: Vec<PathSegment>,
}

impl ConfigPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self { segments }
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Describe `field` of the element at this location.
    pub fn describe(&self, field: Option<&str>) -> String {
        let mut lists: Vec<String> = Vec::new();
        let mut pending_key: Option<&str> = None;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => pending_key = Some(key),
                PathSegment::Index(i) => {
                    let list = pending_key.take().unwrap_or("contents");
                    lists.push(format!("element {} in the list for `{}`", i, list));
                }
            }
        }
        // a trailing key (e.g. `options`) reads as part of the field name
        let field = match (pending_key, field) {
            (Some(key), Some(field)) => Some(format!("{}.{}", key, field)),
            (Some(key), None) => Some(key.to_string()),
            (None, field) => field.map(str::to_string),
        };

        if lists.is_empty() {
            return match field {
                Some(field) => format!("from root level: `{}`", field),
                None => "at root level".to_string(),
            };
        }

        lists.reverse();
        let located = lists.join(" located in ");
        match field {
            Some(field) => format!("`{}` for {}", field, located),
            None => format!("for {}", located),
        }
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) if first => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
            first = false;
        }
        Ok(())
    }
}

/// What went wrong with a configuration element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    MissingField,
    ExtraField,
    Invalid(String),
}

/// A single rejected configuration element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub path: ConfigPath,
    pub field: Option<String>,
    /// The `kind:` the element was parsed as, when it explains the failure
    pub element_kind: Option<String>,
}

impl ValidationIssue {
    pub fn missing(path: &ConfigPath, field: &str, element_kind: &str) -> Self {
        Self {
            kind: IssueKind::MissingField,
            path: path.clone(),
            field: Some(field.to_string()),
            element_kind: Some(element_kind.to_string()),
        }
    }

    pub fn extra(path: &ConfigPath, field: &str) -> Self {
        Self {
            kind: IssueKind::ExtraField,
            path: path.clone(),
            field: Some(field.to_string()),
            element_kind: None,
        }
    }

    pub fn invalid(path: &ConfigPath, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::Invalid(message.into()),
            path: path.clone(),
            field: field.map(str::to_string),
            element_kind: None,
        }
    }

    pub fn format(&self) -> String {
        let head = match &self.kind {
            IssueKind::MissingField => "Missing field".to_string(),
            IssueKind::ExtraField => "Extra fields not permitted:".to_string(),
            IssueKind::Invalid(message) => format!("{}:", message),
        };
        let mut msg = format!("{} {}", head, self.path.describe(self.field.as_deref()));
        if let Some(kind) = &self.element_kind {
            msg.push_str(&format!(", which you need when setting `kind: {}`.", kind));
        }
        msg
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl From<ValidationIssue> for BuildError {
    fn from(issue: ValidationIssue) -> Self {
        BuildError::Validation(issue.format())
    }
}

/// Render several issues as one message for the CLI.
pub fn format_issues(issues: &[ValidationIssue]) -> String {
    let mut msg = String::from("Configuration error(s) for YAML:");
    for issue in issues {
        msg.push_str("\n - ");
        msg.push_str(&issue.format());
    }
    msg
}
