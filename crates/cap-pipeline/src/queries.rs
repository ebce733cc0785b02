//! Read-side facade over the record store.
//!
//! Pure projection: no business rules beyond the derived `processing`
//! bucket in the stats view.

use std::sync::Arc;

use cap_core::error::{AppError, Result};
use cap_core::models::{ImageRecord, ImageStatus, OwnerStats};
use cap_core::traits::ImageRepo;
use uuid::Uuid;

pub struct ImageQueries {
    repo: Arc<dyn ImageRepo>,
}

impl ImageQueries {
    pub fn new(repo: Arc<dyn ImageRepo>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: Uuid) -> Result<ImageRecord> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("image".into(), id.to_string()))
    }

    /// All of an owner's records, newest first. An owner with no uploads
    /// gets an empty list, not an error.
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ImageRecord>> {
        Ok(self.repo.list_by_owner(owner_id).await?)
    }

    /// Filename substring search scoped to one owner.
    pub async fn search(&self, owner_id: &str, term: &str) -> Result<Vec<ImageRecord>> {
        Ok(self.repo.search_by_filename(owner_id, term).await?)
    }

    /// Hard delete. `false` means the id was already absent.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.repo.delete_by_id(id).await?)
    }

    /// Per-owner counters. `processing` is `total - completed - errors`,
    /// which folds `Uploaded` in with `Processing` (defined behavior).
    pub async fn stats(&self, owner_id: &str) -> Result<OwnerStats> {
        let total = self.repo.count_by_owner(owner_id).await?;
        let completed = self
            .repo
            .list_by_owner_and_status(owner_id, ImageStatus::Completed)
            .await?
            .len() as i64;
        let errors = self
            .repo
            .list_by_owner_and_status(owner_id, ImageStatus::Error)
            .await?
            .len() as i64;

        Ok(OwnerStats {
            total,
            completed,
            errors,
            processing: total - completed - errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cap_core::models::NewImage;

    use super::*;
    use crate::testing::MemRepo;

    fn new_image(owner: &str, filename: &str) -> NewImage {
        NewImage {
            owner_id: owner.into(),
            original_filename: filename.into(),
            content_type: "image/jpeg".into(),
            size_bytes: 100,
        }
    }

    #[tokio::test]
    async fn empty_owner_lists_nothing() {
        let queries = ImageQueries::new(Arc::new(MemRepo::default()));
        assert!(queries.list_for_owner("nobody").await.unwrap().is_empty());

        let stats = queries.stats("nobody").await.unwrap();
        assert_eq!(
            stats,
            OwnerStats {
                total: 0,
                completed: 0,
                errors: 0,
                processing: 0
            }
        );
    }

    #[tokio::test]
    async fn stats_buckets_sum_to_total() {
        let repo = Arc::new(MemRepo::default());
        let queries = ImageQueries::new(repo.clone());

        let mut completed = repo.create(new_image("alice", "a.jpg")).await.unwrap();
        completed.status = ImageStatus::Completed;
        repo.update(&completed).await.unwrap();

        let mut errored = repo.create(new_image("alice", "b.jpg")).await.unwrap();
        errored.status = ImageStatus::Error;
        repo.update(&errored).await.unwrap();

        // One left in Uploaded: counts toward the processing bucket.
        repo.create(new_image("alice", "c.jpg")).await.unwrap();
        // Another owner's record must not leak in.
        repo.create(new_image("bob", "d.jpg")).await.unwrap();

        let stats = queries.stats("alice").await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.total, stats.completed + stats.errors + stats.processing);
    }

    #[tokio::test]
    async fn get_is_idempotent_after_terminal_state() {
        let repo = Arc::new(MemRepo::default());
        let queries = ImageQueries::new(repo.clone());

        let mut record = repo.create(new_image("alice", "a.jpg")).await.unwrap();
        record.status = ImageStatus::Completed;
        record.description = Some("A dog.".into());
        repo.update(&record).await.unwrap();

        let first = queries.get(record.id).await.unwrap();
        let second = queries.get(record.id).await.unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.description, second.description);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn delete_then_get_reports_absent() {
        let repo = Arc::new(MemRepo::default());
        let queries = ImageQueries::new(repo.clone());

        let record = repo.create(new_image("alice", "a.jpg")).await.unwrap();

        assert!(queries.delete(record.id).await.unwrap());
        assert!(matches!(
            queries.get(record.id).await,
            Err(AppError::NotFound(_, _))
        ));
        // Deleting again is still "absent", not an error.
        assert!(!queries.delete(record.id).await.unwrap());

        let stats = queries.stats("alice").await.unwrap();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn search_matches_original_filename_substring() {
        let repo = Arc::new(MemRepo::default());
        let queries = ImageQueries::new(repo.clone());

        repo.create(new_image("alice", "summer-beach.jpg")).await.unwrap();
        repo.create(new_image("alice", "winter-hike.png")).await.unwrap();
        repo.create(new_image("bob", "beach-house.jpg")).await.unwrap();

        let hits = queries.search("alice", "beach").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].original_filename, "summer-beach.jpg");
    }
}
