use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a single top-level schema fails to compile. None of these abort a
/// lenient run; the orchestrator decides what a failure means.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("{schema}: reference `{pointer}` does not resolve")]
    UnresolvedReference { schema: String, pointer: String },

    #[error("{schema}: invalid additionalProperties: {reason}")]
    InvalidOpenMapShape { schema: String, reason: String },

    #[error("{schema}: allOf member #{member} {reason}")]
    InvalidCompositionMember { schema: String, member: usize, reason: String },

    #[error("{schema}: invalid enum: {reason}")]
    InvalidEnumShape { schema: String, reason: String },

    #[error("{schema}: top-level {shape} needs boxing, which is disabled")]
    UnsupportedTopLevelShape { schema: String, shape: &'static str },

    #[error("{schema}: oneOf alternatives collide on field `{field}`")]
    DuplicateAlternative { schema: String, field: String },

    #[error("{schema}: array has no `items`")]
    MissingItems { schema: String },

    #[error("{schema}: x-properties-order names unknown property `{property}`")]
    UnknownOrderedProperty { schema: String, property: String },

    #[error("{schema}: reference cycle through `{pointer}`")]
    CyclicReference { schema: String, pointer: String },

    #[error("{schema}: no `type` and no composition keyword, cannot pick a scalar")]
    UntypedSchema { schema: String },
}

/// Failures reading a document or a config file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("at {path}: {message}")]
    Syntax { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// Something worth telling the user about a run that did not stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub schema: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, schema: schema.into(), message: message.into() }
    }

    pub fn error(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, schema: schema.into(), message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: [{}] {}", self.schema, self.message)
    }
}
