//! Candidate validation for the pending selection.
//!
//! A candidate comes either from the path prompt or from a paste, which is what
//! terminals deliver when a file is dropped onto them.

use crate::error::SelectionError;
use crate::model::{CandidateFile, MediaType, SelectedFile};
use crate::preview::Preview;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tracing::debug;

impl CandidateFile {
    /// Read a file from disk and declare its media type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let bytes = std::fs::read(path).map_err(|source| SelectionError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let declared_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| path.display().to_string());
        debug!(%name, %declared_type, size = bytes.len(), "read candidate file");
        Ok(Self {
            name,
            declared_type,
            bytes: Bytes::from(bytes),
        })
    }
}

/// Accept or reject a candidate.
///
/// Type checking happens before any decoding so an unsupported file never
/// costs a decode. Decoding happens before acceptance so a selection always
/// has a preview.
pub fn validate(candidate: CandidateFile) -> Result<(SelectedFile, Preview), SelectionError> {
    let media_type: MediaType = candidate
        .declared_type
        .parse()
        .map_err(|_| SelectionError::UnsupportedType(candidate.declared_type.clone()))?;

    let preview = Preview::decode(&candidate.bytes).map_err(|source| {
        SelectionError::Undecodable {
            name: candidate.name.clone(),
            source,
        }
    })?;

    Ok((
        SelectedFile {
            name: candidate.name,
            media_type,
            bytes: candidate.bytes,
        },
        preview,
    ))
}

/// Turn pasted text (a dropped file, usually) into a path.
///
/// Handles the forms terminals commonly emit: quoted paths, percent-encoded
/// `file://` URIs and backslash-escaped spaces. Only the first line is considered.
pub fn path_from_paste(text: &str) -> Option<PathBuf> {
    let line = text.lines().find(|l| !l.trim().is_empty())?.trim();
    let unquoted = line
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| line.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(line);
    let unescaped = match unquoted.strip_prefix("file://") {
        Some(uri_path) => percent_decode_str(uri_path).decode_utf8_lossy().into_owned(),
        None => unquoted.replace("\\ ", " "),
    };
    if unescaped.is_empty() {
        return None;
    }
    Some(PathBuf::from(unescaped))
}
