use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    MissingAttribute,
    MissingElement,
    InvalidValue,
    DuplicateName,
}

/// A content document that could not be read or decoded.
#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentError {}

pub(crate) fn parse_document<'input>(
    file_path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentError> {
    Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

pub(crate) fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentError {
    let pos = doc.text_pos_at(node.range().start);
    ContentError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

pub(crate) fn read_error(path: &Path, source: std::io::Error) -> ContentError {
    ContentError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    }
}

pub(crate) fn required_attribute<'a>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'a, '_>,
    name: &str,
) -> Result<&'a str, ContentError> {
    match node.attribute(name).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(error_at_node(
            ContentErrorCode::MissingAttribute,
            format!(
                "<{}> requires a non-empty '{}' attribute",
                node.tag_name().name(),
                name
            ),
            file_path,
            doc,
            node,
        )),
    }
}

pub(crate) fn parse_number_attribute<T: std::str::FromStr>(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<T>, ContentError> {
    let Some(raw) = node.attribute(name) else {
        return Ok(None);
    };
    raw.trim().parse::<T>().map(Some).map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("attribute '{name}' must be a number, got '{raw}'"),
            file_path,
            doc,
            node,
        )
    })
}
