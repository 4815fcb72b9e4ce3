//! Summary builders for non-interactive output.

use crate::model::{Phase, SelectedFile};
use crate::preview::Preview;
use crate::upload::ViewState;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Machine-readable result of one cycle.
#[derive(Debug, Serialize)]
pub(crate) struct JsonSummary {
    pub timestamp_utc: String,
    pub file: String,
    pub media_type: &'static str,
    pub bytes: usize,
    pub phase: Phase,
    pub title: String,
    pub processed_image: String,
    pub original_preview: Option<Dimensions>,
    pub processed_preview: Option<Dimensions>,
    pub saved_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<&Preview> for Dimensions {
    fn from(p: &Preview) -> Self {
        Self {
            width: p.source_width,
            height: p.source_height,
        }
    }
}

/// Shorten a long image reference for display; data URIs can be megabytes.
fn abbreviate(source: &str) -> String {
    const MAX: usize = 72;
    if source.chars().count() <= MAX {
        return source.to_string();
    }
    let head: String = source.chars().take(MAX).collect();
    format!("{head}… ({} chars)", source.chars().count())
}

pub(crate) fn build_text_summary(
    selected: &SelectedFile,
    view: &ViewState,
    saved_to: Option<&Path>,
) -> Result<TextSummary> {
    let processed = view
        .processed
        .as_ref()
        .context("no processed image to summarize")?;
    let mut lines = Vec::new();

    let dims = view
        .preview
        .as_ref()
        .map(|p| format!(" {}x{}", p.source_width, p.source_height))
        .unwrap_or_default();
    lines.push(format!(
        "Original: {} ({}, {} bytes{})",
        selected.name,
        selected.media_type.as_mime(),
        selected.bytes.len(),
        dims
    ));
    lines.push(processed.title.clone());
    lines.push(format!("Source: {}", abbreviate(&processed.source)));
    if let Some(p) = view.processed_preview.as_ref() {
        lines.push(format!("Size: {}x{}", p.source_width, p.source_height));
    }
    if let Some(path) = saved_to {
        lines.push(format!("Saved: {}", path.display()));
    }

    Ok(TextSummary { lines })
}

pub(crate) fn build_json_summary(
    selected: &SelectedFile,
    view: &ViewState,
    saved_to: Option<&Path>,
) -> Result<JsonSummary> {
    let processed = view
        .processed
        .as_ref()
        .context("no processed image to summarize")?;
    Ok(JsonSummary {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        file: selected.name.clone(),
        media_type: selected.media_type.as_mime(),
        bytes: selected.bytes.len(),
        phase: processed.phase,
        title: processed.title.clone(),
        processed_image: processed.source.clone(),
        original_preview: view.preview.as_ref().map(Dimensions::from),
        processed_preview: view.processed_preview.as_ref().map(Dimensions::from),
        saved_to: saved_to.map(|p| p.display().to_string()),
    })
}
