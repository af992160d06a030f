//! Error types for the mail merge engine.

use thiserror::Error;

/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that abort a merge.
///
/// Missing placeholders and unsupported instruction kinds are not errors;
/// they are logged and skipped by the orchestrator.
#[derive(Error, Debug)]
pub enum MergeError {
    /// The template payload is not a base64 DOCX data URI.
    #[error("the supplied template is not a base64-encoded .docx data URI (expected prefix {0:?})")]
    Envelope(&'static str),

    /// A base64 payload could not be decoded.
    #[error("base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// An image payload is not a usable `data:image/...;base64,` URI.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// An instruction's content does not fit its kind. Reported by
    /// [`Instruction::parse_list`](crate::Instruction::parse_list); when an
    /// `Instruction` is deserialized as part of a larger value, serde carries
    /// the same message inside [`MergeError::Json`].
    #[error("invalid instruction for placeholder {placeholder:?}: {reason}")]
    InvalidInstruction { placeholder: String, reason: String },

    /// The instruction list is not valid JSON.
    #[error("invalid instruction list: {0}")]
    Json(#[from] serde_json::Error),

    /// The relationship table already uses the largest representable id.
    #[error("no relationship id left after {0}")]
    RelationshipIdsExhausted(String),

    /// A part the merge needs is absent from the archive.
    #[error("archive entry not found: {0}")]
    MissingEntry(String),

    /// Reading or writing the zip container failed.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while reading or writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A markup part could not be parsed.
    #[error("XML error in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },

    /// A markup part is not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    Utf8(String),
}

impl From<quick_xml::Error> for MergeError {
    fn from(source: quick_xml::Error) -> Self {
        MergeError::xml("output", source)
    }
}

impl MergeError {
    pub(crate) fn xml(part: &str, source: impl Into<quick_xml::Error>) -> Self {
        MergeError::Xml {
            part: part.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn invalid_instruction(placeholder: &str, reason: impl Into<String>) -> Self {
        MergeError::InvalidInstruction {
            placeholder: placeholder.to_string(),
            reason: reason.into(),
        }
    }
}
