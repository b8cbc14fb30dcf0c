//! Error types for the stories transform.
//!
//! Every variant is fatal to the file being transformed. Nothing is retried
//! and no partial output is produced.

use thiserror::Error;

use crate::splice::SpliceError;

#[derive(Error, Debug)]
pub enum CsfError {
    #[error("failed to extract a component name from filename: {filename}")]
    UnresolvableComponentName { filename: String },

    #[error(
        "stories file `{filename}` doesn't have any <script> tag with logic; \
         add a <script module> block that calls defineMeta"
    )]
    MissingInstanceScript { filename: String },

    #[error("compiled output of `{filename}` has no default export")]
    MissingDefaultExport { filename: String },

    #[error("compiled output of `{filename}` has {count} default exports, expected exactly one")]
    MultipleDefaultExports { filename: String, count: usize },

    #[error("stories in `{filename}` could not be correlated: {reason}")]
    StoryCorrelationMismatch { filename: String, reason: String },

    #[error("`{filename}` doesn't declare its meta with a defineMeta({{ ... }}) call")]
    MissingMetaDeclaration { filename: String },

    #[error("unexpected node in `{filename}`: {message}")]
    UnexpectedNode { filename: String, message: String },

    #[error("`{filename}` has already been transformed")]
    AlreadyTransformed { filename: String },

    #[error("failed to parse `{filename}`: {message}")]
    Parse { filename: String, message: String },

    #[error("preprocessing `{filename}` failed: {message}")]
    Preprocess { filename: String, message: String },

    #[error("invalid plugin option: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CsfError {
    pub(crate) fn unexpected(filename: &str, message: impl Into<String>) -> Self {
        Self::UnexpectedNode {
            filename: filename.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = CsfError> = std::result::Result<T, E>;
