//! Saving processed images to disk.

use crate::client::ProcessClient;
use crate::model::{MediaType, ProcessedImage};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

/// Split a `data:<mime>;base64,<payload>` URI into its mime type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URI has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("only base64 data URIs are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .context("decode base64 payload")?;
    Ok((mime.to_string(), bytes))
}

fn extension_for(mime: &str) -> &'static str {
    mime.parse::<MediaType>()
        .map(MediaType::extension)
        .unwrap_or("img")
}

/// Default file name for a processed image, e.g. `processed-venous-2024-05-01_10-00-00Z.png`.
pub fn default_file_name(image: &ProcessedImage, mime: &str) -> String {
    let ts = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into());
    let ts = ts.split('.').next().unwrap_or(&ts).trim_end_matches('Z');
    format!(
        "processed-{}-{}Z.{}",
        image.phase.as_form_value(),
        ts.replace(':', "-").replace('T', "_"),
        extension_for(mime)
    )
}

/// Write the processed image to `dest`, or to a default name in the current directory.
///
/// Inline `data:` sources are decoded; `http(s)` sources are downloaded with `client`.
/// Returns the absolute path written.
pub async fn save_processed(
    client: &ProcessClient,
    image: &ProcessedImage,
    dest: Option<&Path>,
) -> Result<PathBuf> {
    let (mime, bytes) = if image.source.starts_with("data:") {
        decode_data_uri(&image.source)?
    } else if image.source.starts_with("http://") || image.source.starts_with("https://") {
        let bytes = client
            .fetch_image(&image.source)
            .await
            .with_context(|| format!("download {}", image.source))?;
        let mime = mime_guess::from_path(&image.source)
            .first_raw()
            .unwrap_or("image/png")
            .to_string();
        (mime, bytes)
    } else {
        return Err(anyhow!("unsupported image reference"));
    };

    let path = match dest {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()
            .context("get current directory")?
            .join(default_file_name(image, &mime)),
    };
    write_bytes(&path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved processed image");
    Ok(path)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}
