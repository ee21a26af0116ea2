//! Book instance service

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{BookInstance, BookInstanceDetails, BookInstanceDraft, BookTitle},
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct BookInstanceService {
    store: Arc<dyn CatalogStore>,
}

impl BookInstanceService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    pub async fn list(&self) -> AppResult<Vec<BookInstanceDetails>> {
        self.store.book_instances_list().await
    }

    /// Books offered in the copy form
    pub async fn book_titles(&self) -> AppResult<Vec<BookTitle>> {
        self.store.book_titles().await
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<BookInstanceDetails>> {
        self.store.book_instances_find(id).await
    }

    /// Get a copy for the detail page
    pub async fn get(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book copy not found".to_string()))
    }

    /// Load a copy and the book list in parallel, for the update form
    pub async fn get_for_update(&self, id: Uuid) -> AppResult<(BookInstanceDetails, Vec<BookTitle>)> {
        let (instance, books) = tokio::try_join!(self.find(id), self.book_titles())?;
        let instance =
            instance.ok_or_else(|| AppError::NotFound("Book instance not found".to_string()))?;
        Ok((instance, books))
    }

    /// Apply defaults to a validated draft and persist it as a new copy
    pub async fn create(&self, draft: BookInstanceDraft) -> AppResult<BookInstance> {
        let instance = draft.into_instance(Utc::now())?;
        let created = self.store.book_instances_create(&instance).await?;
        tracing::info!(id = %created.id, book = %created.book, "book instance created");
        Ok(created)
    }

    /// Replace every field of copy `id` with the draft
    pub async fn update(&self, id: Uuid, draft: BookInstanceDraft) -> AppResult<BookInstance> {
        let instance = draft.with_id(id).into_instance(Utc::now())?;
        let updated = self
            .store
            .book_instances_update(&instance)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book instance {} vanished before update", id)))?;
        tracing::info!(id = %updated.id, status = %updated.status, "book instance updated");
        Ok(updated)
    }

    /// Delete copy `id`; deleting an absent copy is not an error
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if self.store.book_instances_delete(id).await? {
            tracing::info!(%id, "book instance deleted");
        } else {
            tracing::debug!(%id, "book instance already absent");
        }
        Ok(())
    }
}
