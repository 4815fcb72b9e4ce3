use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Imaging phase the backend applies to the submitted image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Arterial,
    Venous,
}

impl Phase {
    /// Value sent in the `phase` multipart field.
    pub fn as_form_value(self) -> &'static str {
        match self {
            Phase::Arterial => "arterial",
            Phase::Venous => "venous",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Arterial => "Arterial Phase",
            Phase::Venous => "Venous Phase",
        }
    }

    /// Title shown above the processed image.
    pub fn display_title(self) -> String {
        format!("Processed Image ({})", self.label())
    }

    pub fn toggled(self) -> Self {
        match self {
            Phase::Arterial => Phase::Venous,
            Phase::Venous => Phase::Arterial,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_form_value())
    }
}

/// Media types the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    pub fn as_mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
        }
    }
}

impl FromStr for MediaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            _ => Err(()),
        }
    }
}

/// A file offered for selection, before validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    /// Media type as declared by the source (extension guess for files on disk).
    pub declared_type: String,
    pub bytes: Bytes,
}

/// An accepted selection awaiting submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Bytes,
}

/// JSON body returned by `POST /process`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub processed_image: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
}

/// A processed image ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedImage {
    pub phase: Phase,
    pub title: String,
    /// Displayable image reference (a `data:` URI or URL).
    pub source: String,
}

/// JSON body returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Identifies one submission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket(pub u64);

/// Everything the orchestrator needs to run one submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub ticket: Ticket,
    pub file: SelectedFile,
    pub phase: Phase,
}

/// Events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug)]
pub enum AppEvent {
    SubmitCompleted {
        ticket: Ticket,
        outcome: Result<ProcessResponse, ClientError>,
    },
    Health(Result<HealthStatus, ClientError>),
    /// Result of saving a processed image; the error is already rendered.
    Saved(Result<std::path::PathBuf, String>),
    Info(InfoEvent),
}

/// Structured info events for status lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Submitting { name: String, phase: Phase },
    Cancelling,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Submitting { name, phase } => {
                format!("Submitting {} ({})", name, phase.label())
            }
            InfoEvent::Cancelling => "Cancelling…".to_string(),
        }
    }
}
