//! Repository layer for database operations

pub mod book_instances;
pub mod books;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BookInstance, BookInstanceDetails, BookTitle},
};

/// Persistence operations the catalog handlers rely on.
///
/// Lookups by id return `Ok(None)` when nothing matches; `Err` is reserved
/// for store failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()>;

    /// All books, id and title only, ordered by title
    async fn book_titles(&self) -> AppResult<Vec<BookTitle>>;

    /// All copies with their book eager-loaded
    async fn book_instances_list(&self) -> AppResult<Vec<BookInstanceDetails>>;

    /// One copy with its book eager-loaded
    async fn book_instances_find(&self, id: Uuid) -> AppResult<Option<BookInstanceDetails>>;

    async fn book_instances_create(&self, instance: &BookInstance) -> AppResult<BookInstance>;

    /// Replace every field of the copy with `instance.id`; `None` if no such copy
    async fn book_instances_update(&self, instance: &BookInstance) -> AppResult<Option<BookInstance>>;

    /// Returns whether a copy was removed
    async fn book_instances_delete(&self, id: Uuid) -> AppResult<bool>;
}

/// PostgreSQL-backed store holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub book_instances: book_instances::BookInstancesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            book_instances: book_instances::BookInstancesRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn book_titles(&self) -> AppResult<Vec<BookTitle>> {
        self.books.list_titles().await
    }

    async fn book_instances_list(&self) -> AppResult<Vec<BookInstanceDetails>> {
        self.book_instances.list().await
    }

    async fn book_instances_find(&self, id: Uuid) -> AppResult<Option<BookInstanceDetails>> {
        self.book_instances.find_by_id(id).await
    }

    async fn book_instances_create(&self, instance: &BookInstance) -> AppResult<BookInstance> {
        self.book_instances.create(instance).await
    }

    async fn book_instances_update(&self, instance: &BookInstance) -> AppResult<Option<BookInstance>> {
        self.book_instances.update(instance).await
    }

    async fn book_instances_delete(&self, id: Uuid) -> AppResult<bool> {
        self.book_instances.delete(id).await
    }
}
