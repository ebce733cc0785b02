//! # Domain Models
//!
//! These structs represent the core entities of Captionary.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Model identifier stamped on a record at creation, before the describer
/// has reported which backend actually produced the caption.
pub const DEFAULT_AI_MODEL: &str = "gemini-pro-vision";

/// Lifecycle of an image record. Transitions are monotonic:
/// `Uploaded -> Processing -> Completed | Error`, with both
/// `Completed` and `Error` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

impl ImageStatus {
    /// Stable string form used by the record store and JSON payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Uploaded => "UPLOADED",
            ImageStatus::Processing => "PROCESSING",
            ImageStatus::Completed => "COMPLETED",
            ImageStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<ImageStatus> {
        match s {
            "UPLOADED" => Some(ImageStatus::Uploaded),
            "PROCESSING" => Some(ImageStatus::Processing),
            "COMPLETED" => Some(ImageStatus::Completed),
            "ERROR" => Some(ImageStatus::Error),
            _ => None,
        }
    }

    /// True once no further automatic transition will occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageStatus::Completed | ImageStatus::Error)
    }
}

/// The persisted metadata for one submitted image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    /// Opaque identifier of the submitting user. Validated upstream.
    pub owner_id: String,
    pub original_filename: String,
    /// Collision-resistant name derived at creation (`image_<millis><ext>`).
    pub stored_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: ImageStatus,
    /// Caption text on `Completed`, or an error summary on `Error`.
    pub description: Option<String>,
    /// Describer backend; corrected to the actual model on completion.
    pub ai_model: String,
    /// Wall-clock duration of the describer call. Only set on `Completed`.
    pub processing_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Validated upload metadata handed to `ImageRepo::create`.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub owner_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl NewImage {
    /// Materializes the initial `Uploaded` record: assigns the id,
    /// timestamps, default model, and the derived stored filename.
    pub fn into_record(self) -> ImageRecord {
        let created_at = Utc::now();
        let stored_filename = derive_stored_filename(&self.original_filename, created_at);
        ImageRecord {
            id: Uuid::now_v7(),
            owner_id: self.owner_id,
            original_filename: self.original_filename,
            stored_filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            status: ImageStatus::Uploaded,
            description: None,
            ai_model: DEFAULT_AI_MODEL.to_string(),
            processing_time_ms: None,
            created_at,
        }
    }
}

/// Output of one describer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    /// Identifier of the model that actually produced the text.
    pub model_id: String,
}

/// Per-owner counters; `processing` is derived as
/// `total - completed - errors` and so folds `Uploaded` in with
/// `Processing` (defined behavior, inherited from the source system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerStats {
    pub total: i64,
    pub completed: i64,
    pub errors: i64,
    pub processing: i64,
}

/// Timestamp-prefixed filename keeping the original extension, so two
/// uploads of `cat.jpg` never collide in listings or exports.
fn derive_stored_filename(original: &str, at: DateTime<Utc>) -> String {
    let extension = original
        .rfind('.')
        .map(|dot| &original[dot..])
        .unwrap_or("");
    format!("image_{}{}", at.timestamp_millis(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_filename_keeps_extension() {
        let record = NewImage {
            owner_id: "u1".into(),
            original_filename: "holiday.photo.jpg".into(),
            content_type: "image/jpeg".into(),
            size_bytes: 1024,
        }
        .into_record();

        assert!(record.stored_filename.starts_with("image_"));
        assert!(record.stored_filename.ends_with(".jpg"));
        assert_eq!(record.status, ImageStatus::Uploaded);
        assert_eq!(record.ai_model, DEFAULT_AI_MODEL);
        assert!(record.description.is_none());
        assert!(record.processing_time_ms.is_none());
    }

    #[test]
    fn stored_filename_without_extension() {
        let record = NewImage {
            owner_id: "u1".into(),
            original_filename: "raw-upload".into(),
            content_type: "image/png".into(),
            size_bytes: 10,
        }
        .into_record();

        assert!(!record.stored_filename.contains('.'));
    }

    #[test]
    fn status_round_trips_through_store_form() {
        for status in [
            ImageStatus::Uploaded,
            ImageStatus::Processing,
            ImageStatus::Completed,
            ImageStatus::Error,
        ] {
            assert_eq!(ImageStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ImageStatus::parse("DONE"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(ImageStatus::Completed.is_terminal());
        assert!(ImageStatus::Error.is_terminal());
        assert!(!ImageStatus::Uploaded.is_terminal());
        assert!(!ImageStatus::Processing.is_terminal());
    }
}
