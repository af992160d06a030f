//! Merge instructions and their JSON form.
//!
//! ```json
//! [
//!   { "type": "text",  "placeholder": "{{NAME}}",  "content": "World" },
//!   { "type": "image", "placeholder": "{{LOGO}}",  "content": "data:image/png;base64,...", "width": 4, "height": 2 },
//!   { "type": "table", "placeholder": "{{ITEMS}}", "content": [["Item", "Qty"], ["Pen", 2]] }
//! ]
//! ```
//!
//! `kind` is accepted as an alias of `type`.

use crate::error::{MergeError, Result};
use serde::Deserialize;
use serde_json::Value;

/// What to put in place of a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Literal text; `\n` starts a new paragraph.
    Text(String),
    /// A `data:image/...;base64,` URI with an optional size in centimeters.
    Image {
        data_uri: String,
        width_cm: Option<f64>,
        height_cm: Option<f64>,
    },
    /// Rows of cell text; the first row sets the column count.
    Table(Vec<Vec<String>>),
    /// A kind this engine does not know. Skipped during the merge.
    Unsupported(String),
}

impl Content {
    pub fn kind(&self) -> &str {
        match self {
            Content::Text(_) => "text",
            Content::Image { .. } => "image",
            Content::Table(_) => "table",
            Content::Unsupported(kind) => kind,
        }
    }
}

/// One placeholder fill.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawInstruction")]
pub struct Instruction {
    pub placeholder: String,
    pub content: Content,
}

impl Instruction {
    pub fn text(placeholder: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            content: Content::Text(text.into()),
        }
    }

    pub fn image(
        placeholder: impl Into<String>,
        data_uri: impl Into<String>,
        width_cm: Option<f64>,
        height_cm: Option<f64>,
    ) -> Self {
        Self {
            placeholder: placeholder.into(),
            content: Content::Image {
                data_uri: data_uri.into(),
                width_cm,
                height_cm,
            },
        }
    }

    pub fn table(placeholder: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            placeholder: placeholder.into(),
            content: Content::Table(rows),
        }
    }

    /// Parse a JSON array of instructions.
    ///
    /// Malformed JSON is [`MergeError::Json`]; content that does not fit its
    /// kind is [`MergeError::InvalidInstruction`].
    pub fn parse_list(json: &str) -> Result<Vec<Instruction>> {
        let raw: Vec<RawInstruction> = serde_json::from_str(json)?;
        raw.into_iter().map(Instruction::try_from).collect()
    }
}

#[derive(Deserialize)]
struct RawInstruction {
    #[serde(default, rename = "type", alias = "kind")]
    kind: Option<Value>,
    #[serde(default)]
    placeholder: String,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

/// Scalars become their JSON text; null becomes an empty string.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn table_rows(placeholder: &str, content: &Value) -> Result<Vec<Vec<String>>> {
    let invalid = |reason: &str| MergeError::invalid_instruction(placeholder, reason);
    let rows = content
        .as_array()
        .ok_or_else(|| invalid("table content must be an array of rows"))?;
    if rows.is_empty() {
        return Err(invalid("table content must contain at least one row"));
    }
    rows.iter()
        .map(|row| -> Result<Vec<String>> {
            row.as_array()
                .ok_or_else(|| invalid("each table row must be an array of cells"))?
                .iter()
                .map(|cell| scalar_text(cell).ok_or_else(|| invalid("table cells must be scalars")))
                .collect()
        })
        .collect()
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = MergeError;

    fn try_from(raw: RawInstruction) -> Result<Self> {
        let RawInstruction {
            kind,
            placeholder,
            content,
            width,
            height,
        } = raw;

        let name = match &kind {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let kind = kind.as_ref().and_then(Value::as_str);
        let known = matches!(kind, Some("text" | "image" | "table"));
        if known && placeholder.is_empty() {
            return Err(MergeError::invalid_instruction(
                &placeholder,
                "placeholder must not be empty",
            ));
        }

        let content = match kind {
            Some("text") => Content::Text(scalar_text(&content).ok_or_else(|| {
                MergeError::invalid_instruction(&placeholder, "text content must be a string")
            })?),
            Some("image") => Content::Image {
                data_uri: content
                    .as_str()
                    .ok_or_else(|| {
                        MergeError::invalid_instruction(
                            &placeholder,
                            "image content must be a data URI string",
                        )
                    })?
                    .to_string(),
                width_cm: width,
                height_cm: height,
            },
            Some("table") => Content::Table(table_rows(&placeholder, &content)?),
            _ => Content::Unsupported(name),
        };
        Ok(Self {
            placeholder,
            content,
        })
    }
}
