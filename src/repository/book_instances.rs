//! Book instances repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BookInstance, BookInstanceDetails, BookInstanceStatus, BookTitle},
};

const SELECT_WITH_BOOK: &str = r#"
    SELECT bi.id, bi.book_id, bi.imprint, bi.status, bi.due_back,
           b.title AS book_title
    FROM book_instances bi
    LEFT JOIN books b ON b.id = bi.book_id
"#;

/// Row of `book_instances` joined with its (possibly missing) book
#[derive(FromRow)]
struct BookInstanceRow {
    id: Uuid,
    book_id: Uuid,
    imprint: String,
    status: BookInstanceStatus,
    due_back: DateTime<Utc>,
    book_title: Option<String>,
}

impl From<BookInstanceRow> for BookInstanceDetails {
    fn from(row: BookInstanceRow) -> Self {
        let book = row.book_title.map(|title| BookTitle {
            id: row.book_id,
            title,
        });
        BookInstanceDetails {
            instance: BookInstance {
                id: row.id,
                book: row.book_id,
                imprint: row.imprint,
                status: row.status,
                due_back: row.due_back,
            },
            book,
        }
    }
}

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all copies with their book
    pub async fn list(&self) -> AppResult<Vec<BookInstanceDetails>> {
        let query = format!("{} ORDER BY b.title NULLS LAST, bi.crea_date", SELECT_WITH_BOOK);
        let rows = sqlx::query_as::<_, BookInstanceRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a copy with its book
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<BookInstanceDetails>> {
        let query = format!("{} WHERE bi.id = $1", SELECT_WITH_BOOK);
        let row = sqlx::query_as::<_, BookInstanceRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Insert a copy
    pub async fn create(&self, instance: &BookInstance) -> AppResult<BookInstance> {
        let row = sqlx::query_as::<_, BookInstance>(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, status, due_back)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, book_id, imprint, status, due_back
            "#,
        )
        .bind(instance.id)
        .bind(instance.book)
        .bind(&instance.imprint)
        .bind(instance.status)
        .bind(instance.due_back)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Replace all fields of an existing copy
    pub async fn update(&self, instance: &BookInstance) -> AppResult<Option<BookInstance>> {
        let row = sqlx::query_as::<_, BookInstance>(
            r#"
            UPDATE book_instances
            SET book_id = $2, imprint = $3, status = $4, due_back = $5, modif_date = $6
            WHERE id = $1
            RETURNING id, book_id, imprint, status, due_back
            "#,
        )
        .bind(instance.id)
        .bind(instance.book)
        .bind(&instance.imprint)
        .bind(instance.status)
        .bind(instance.due_back)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Delete a copy
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
