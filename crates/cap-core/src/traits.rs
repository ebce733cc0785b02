//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DescriberError;
use crate::models::{Caption, ImageRecord, ImageStatus, NewImage};

/// Persistence contract for image records.
///
/// `update` is a full replace with last-write-wins semantics: no version
/// token, no lost-update detection. A delete racing an in-flight update on
/// the same id is unspecified (known gap).
#[async_trait]
pub trait ImageRepo: Send + Sync {
    /// Persists a new record, assigning id, `created_at`, the default
    /// `Uploaded` status, and the default model identifier.
    async fn create(&self, new: NewImage) -> anyhow::Result<ImageRecord>;

    /// Replaces the stored record wholesale and returns the stored state.
    async fn update(&self, record: &ImageRecord) -> anyhow::Result<ImageRecord>;

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImageRecord>>;

    /// All records for an owner, newest first (`created_at` descending).
    async fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<ImageRecord>>;

    async fn list_by_owner_and_status(
        &self,
        owner_id: &str,
        status: ImageStatus,
    ) -> anyhow::Result<Vec<ImageRecord>>;

    async fn count_by_owner(&self, owner_id: &str) -> anyhow::Result<i64>;

    /// Substring match on the original filename, scoped to one owner.
    async fn search_by_filename(
        &self,
        owner_id: &str,
        term: &str,
    ) -> anyhow::Result<Vec<ImageRecord>>;

    /// Hard delete. Returns `false` when the id was already absent;
    /// absence is a result, not an error.
    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Contract with the external vision model.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Produces a natural-language caption for the given image bytes.
    ///
    /// Makes exactly one outbound call; retry policy belongs to the
    /// caller. `bytes` is non-empty and `mime_type` is one of the
    /// accepted image types (the pipeline validates both upstream).
    async fn describe(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> std::result::Result<Caption, DescriberError>;
}
