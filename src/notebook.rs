use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::NotebookError;

/// A parsed notebook document.
///
/// Only the fields the normalizer touches are modelled; everything else
/// (`nbformat`, `nbformat_minor`, custom keys) is kept in `extra` and written
/// back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Notebook-level metadata. `Some(Value::Null)` means the key was present
    /// but null, `None` means it was absent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub metadata: Option<Value>,
    pub cells: Vec<Cell>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One notebook cell, discriminated by its `cell_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Code(CodeCell),
    Markdown(TextCell),
    Raw(TextCell),
}

/// Fields of a code cell.
///
/// Every optional field keeps three states: absent (`None`), explicit null,
/// and a value. Anything the normalizer does not edit is held as raw
/// `Value` so it is written back exactly as read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeCell {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub source: Option<Option<Source>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub metadata: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub execution_count: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub outputs: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields shared by markdown and raw cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextCell {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub source: Option<Option<Source>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cell source: nbformat allows either a single string or a list of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Text(String),
    Lines(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

const CELL_TYPES: &[&str] = &["code", "markdown", "raw"];

/// Deserialize a field that was present in the input, keeping explicit nulls
/// distinguishable from a missing key (paired with `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Notebook {
    /// Parse and validate a notebook from raw bytes.
    ///
    /// Rejects anything the normalizer cannot handle completely: invalid
    /// UTF-8 or JSON, a non-object root, a missing or non-array `cells`, and
    /// cells without a recognized `cell_type`.
    pub fn from_slice(data: &[u8]) -> Result<Self, NotebookError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| NotebookError::malformed(format!("invalid UTF-8: {e}")))?;

        let root: Value = serde_json::from_str(text)
            .map_err(|e| NotebookError::malformed(format!("invalid JSON: {e}")))?;

        Self::from_value(root)
    }

    /// Validate and convert an already-parsed JSON value.
    pub fn from_value(root: Value) -> Result<Self, NotebookError> {
        let obj = root
            .as_object()
            .ok_or_else(|| NotebookError::malformed("notebook root is not a JSON object"))?;

        let cells = obj
            .get("cells")
            .and_then(|v| v.as_array())
            .ok_or_else(|| NotebookError::malformed("notebook missing \"cells\" array"))?;

        for (i, cell) in cells.iter().enumerate() {
            let cell = cell
                .as_object()
                .ok_or_else(|| NotebookError::malformed(format!("cell {i} is not a JSON object")))?;
            match cell.get("cell_type").and_then(|v| v.as_str()) {
                Some(cell_type) if CELL_TYPES.contains(&cell_type) => {}
                Some(cell_type) => {
                    return Err(NotebookError::malformed(format!(
                        "cell {i}: unknown cell type \"{cell_type}\""
                    )));
                }
                None => {
                    return Err(NotebookError::malformed(format!(
                        "cell {i}: missing \"cell_type\""
                    )));
                }
            }
        }

        serde_json::from_value(root).map_err(|e| NotebookError::malformed(e.to_string()))
    }

    /// Render the notebook in canonical form: keys sorted at every depth,
    /// one-space indentation, non-ASCII written verbatim, trailing newline.
    pub fn to_canonical_string(&self) -> Result<String, NotebookError> {
        // Going through `Value` sorts every object's keys, including the
        // flattened pass-through fields.
        let value = serde_json::to_value(self)?;

        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
        value.serialize(&mut ser)?;

        let mut text = String::from_utf8(buf)?;
        text.push('\n');
        Ok(text)
    }

    /// The notebook-level metadata as a map, if it is one.
    pub fn metadata_map(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref().and_then(|m| m.as_object())
    }
}

impl Cell {
    pub fn cell_type(&self) -> CellType {
        match self {
            Cell::Code(_) => CellType::Code,
            Cell::Markdown(_) => CellType::Markdown,
            Cell::Raw(_) => CellType::Raw,
        }
    }

    /// The cell source, if present and not null.
    pub fn source(&self) -> Option<&Source> {
        let source = match self {
            Cell::Code(c) => &c.source,
            Cell::Markdown(c) | Cell::Raw(c) => &c.source,
        };
        source.as_ref().and_then(Option::as_ref)
    }

    /// The cell metadata, if it is a JSON object.
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        let metadata = match self {
            Cell::Code(c) => &c.metadata,
            Cell::Markdown(c) | Cell::Raw(c) => &c.metadata,
        };
        metadata.as_ref().and_then(Value::as_object)
    }

    /// True when the source is missing, null, or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.source().is_none_or(Source::is_blank)
    }
}

impl Source {
    /// The source as one string, concatenating line lists.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Source::Text(s) => Cow::Borrowed(s.as_str()),
            Source::Lines(lines) => Cow::Owned(lines.concat()),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

impl CellType {
    pub fn as_str(self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
