use thiserror::Error;

/// Message shown when the backend gives no better explanation.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Processing failed";

/// Why a candidate file was not accepted as the pending selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Declared media type is not `image/jpeg` or `image/png`
    #[error("Please select a JPG or PNG image file.")]
    UnsupportedType(String),

    /// Bytes could not be decoded for the preview
    #[error("Could not decode {name} as an image.")]
    Undecodable {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// File could not be read from disk
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a submission could not start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Please select an image first.")]
    NoSelection,

    #[error("A submission is already in progress.")]
    InFlight,
}

/// Failures of a `/process` or `/health` round trip.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// Body was not the expected JSON
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// `success: false` with the server-provided (or default) message
    #[error("{0}")]
    Application(String),

    /// `success: true` without a `processed_image`
    #[error("response did not include a processed image")]
    MissingImage,

    #[error("request timed out")]
    Timeout,

    /// The submission task panicked or was torn down
    #[error("submission task failed: {0}")]
    TaskFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

impl ClientError {
    /// The message surfaced to the user for this failure.
    ///
    /// Transport-class failures collapse to the generic message; only
    /// application failures carry server text.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Application(msg) => msg.clone(),
            ClientError::Cancelled => "Cancelled".to_string(),
            _ => DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Alert text for a failed submission.
pub fn failure_alert(message: &str) -> String {
    format!("Error processing image: {message}")
}
