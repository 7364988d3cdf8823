//! Loading the specification and context documents.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::redact::redact;

/// Errors reading input documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("reading spec file {path}: {source}")]
    Spec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("loading context file {path}: {source}")]
    Context {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A specification file with its hash and line-numbered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: String,
    /// `sha256:<hex>` over the original bytes
    pub hash: String,
    pub raw: String,
    /// Every line prefixed with `L{n}: `
    pub numbered: String,
    pub line_count: usize,
}

impl SourceDocument {
    /// Read a specification from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Spec {
            path: path.to_path_buf(),
            source,
        })?;

        let hash = content_hash(&bytes);
        let raw = String::from_utf8_lossy(&bytes).into_owned();

        Ok(Self::with_hash(path.display().to_string(), hash, raw))
    }

    /// Build a document from in-memory text.
    pub fn from_text(path: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let hash = content_hash(raw.as_bytes());
        Self::with_hash(path.into(), hash, raw)
    }

    fn with_hash(path: String, hash: String, raw: String) -> Self {
        let (numbered, line_count) = number_lines(&raw);
        Self {
            path,
            hash,
            raw,
            numbered,
            line_count,
        }
    }

    /// A copy with secrets redacted from both views.
    ///
    /// The hash still identifies the original file and the line count is
    /// unchanged.
    pub fn redacted(&self) -> Self {
        Self {
            path: self.path.clone(),
            hash: self.hash.clone(),
            raw: redact(&self.raw),
            numbered: redact(&self.numbered),
            line_count: self.line_count,
        }
    }
}

/// `sha256:<hex>` digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(bytes))
}

/// Prefix every line with `L{n}: ` and count lines.
///
/// A trailing newline does not produce an extra numbered line.
pub fn number_lines(content: &str) -> (String, usize) {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }

    let mut out = String::with_capacity(content.len() + lines.len() * 6);
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        // Writing to a String cannot fail.
        let _ = write!(out, "L{}: {}", idx + 1, line);
    }

    (out, lines.len())
}

/// A grounding document supplied alongside the specification, redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFile {
    pub path: String,
    pub content: String,
}

impl ContextFile {
    /// Read and redact each path in order.
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Self>, DocumentError> {
        paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                let bytes = std::fs::read(path).map_err(|source| DocumentError::Context {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self {
                    path: path.display().to_string(),
                    content: redact(&String::from_utf8_lossy(&bytes)),
                })
            })
            .collect()
    }

    /// File name used in the prompt tag.
    pub fn display_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }
}

/// Wrap each context file in `<context file="name">` tags.
pub fn format_context_for_prompt(files: &[ContextFile]) -> String {
    let mut out = String::new();
    for file in files {
        let _ = writeln!(out, "<context file={:?}>", file.display_name());
        out.push_str(&file.content);
        if !file.content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("</context>\n");
    }
    out
}
