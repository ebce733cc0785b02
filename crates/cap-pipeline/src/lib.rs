//! # cap-pipeline
//!
//! Orchestrates the image lifecycle: upload validation, record creation,
//! the single describer call, and the transition to a terminal state.

pub mod queries;

use std::sync::Arc;
use std::time::Instant;

use cap_core::error::{AppError, Result};
use cap_core::models::{ImageRecord, ImageStatus, NewImage};
use cap_core::traits::{Describer, ImageRepo};

/// Hard cap on upload size: 10 MiB.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Content types the pipeline accepts for analysis.
pub const ACCEPTED_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Drives an image record from upload to a terminal state.
///
/// Each `submit` runs synchronously within the caller's lifetime and
/// blocks on the one outbound describer call; there is no queueing and
/// no background work.
pub struct ImagePipeline {
    repo: Arc<dyn ImageRepo>,
    describer: Arc<dyn Describer>,
}

impl ImagePipeline {
    pub fn new(repo: Arc<dyn ImageRepo>, describer: Arc<dyn Describer>) -> Self {
        Self { repo, describer }
    }

    /// Processes one upload end to end.
    ///
    /// Validation failures reject the request before any record exists.
    /// Once a record is created it always reaches `Completed` or `Error`
    /// and is returned to the caller either way; a describer failure is
    /// encoded in the record, not surfaced as an operation failure.
    /// Store failures do propagate.
    pub async fn submit(
        &self,
        bytes: &[u8],
        original_filename: &str,
        owner_id: &str,
        content_type: &str,
    ) -> Result<ImageRecord> {
        validate_upload(bytes, content_type)?;

        let mut record = self
            .repo
            .create(NewImage {
                owner_id: owner_id.to_string(),
                original_filename: original_filename.to_string(),
                content_type: content_type.to_string(),
                size_bytes: bytes.len() as i64,
            })
            .await?;

        log::info!(
            "image {} accepted ({} bytes, {}) for owner {}",
            record.id,
            record.size_bytes,
            record.content_type,
            record.owner_id
        );

        // The Processing write must land before the describer call so a
        // reader polling mid-pipeline never sees a jump straight from
        // Uploaded to a terminal state.
        record.status = ImageStatus::Processing;
        record = self.repo.update(&record).await?;

        let started = Instant::now();
        match self.describer.describe(bytes, content_type).await {
            Ok(caption) => {
                record.description = Some(caption.text);
                record.ai_model = caption.model_id;
                record.processing_time_ms = Some(started.elapsed().as_millis() as i64);
                record.status = ImageStatus::Completed;
                log::info!(
                    "image {} described in {}ms",
                    record.id,
                    record.processing_time_ms.unwrap_or_default()
                );
            }
            Err(err) => {
                log::warn!("image {} describer call failed: {err}", record.id);
                record.description = Some(format!("AI analysis failed: {err}"));
                record.status = ImageStatus::Error;
            }
        }

        let record = self.repo.update(&record).await?;
        Ok(record)
    }
}

fn validate_upload(bytes: &[u8], content_type: &str) -> Result<()> {
    if bytes.is_empty() {
        return Err(AppError::Validation("no image data provided".into()));
    }
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
        return Err(AppError::Validation(format!(
            "unsupported content type '{content_type}'; use JPEG, PNG, GIF or WebP"
        )));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(
            "image too large; maximum size is 10 MiB".into(),
        ));
    }
    Ok(())
}
