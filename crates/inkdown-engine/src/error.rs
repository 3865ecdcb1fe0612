use std::path::PathBuf;

/// Tree → markdown or markdown → tree produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("document nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
    #[error("conversion produced empty markdown from non-empty content")]
    EmptyOutput,
}

/// An autoformat transform could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("no node at transform target")]
    MissingNode,
    #[error("{rule} transform left the block empty")]
    EmptiedBlock { rule: &'static str },
}

/// The shrink guard refused a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("refusing to replace {previous_len} chars of content with {new_len} chars")]
pub struct GuardRejection {
    pub previous_len: usize,
    pub new_len: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid notes directory: {0}")]
    InvalidNotesDir(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Guard(#[from] GuardRejection),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no document is open")]
    NoDocument,
    #[error("checkbox {0} not found in source")]
    CheckboxNotFound(usize),
    #[error("no fenced code block matches the selected block")]
    CodeBlockNotFound,
    #[error("image {0} not found in source")]
    ImageNotFound(String),
}

/// Non-blocking message surfaced to the user by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// User-facing form of an error.
    pub fn from_error(error: &EditorError) -> Self {
        let title = match error {
            EditorError::Conversion(_) => "Conversion Error",
            EditorError::Transform(_) => "Formatting Error",
            EditorError::Guard(_) => "Save Prevented",
            EditorError::Storage(_) => "Save Error",
            EditorError::NoDocument => "No Document",
            EditorError::CheckboxNotFound(_) => "Checkbox Error",
            EditorError::CodeBlockNotFound => "Code Block Error",
            EditorError::ImageNotFound(_) => "Image Error",
        };
        Self::new(title, error.to_string())
    }
}
