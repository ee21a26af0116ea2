//! Book instance (physical copy) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::BookTitle,
};

/// Circulation status of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookInstanceStatus {
    #[default]
    Maintenance,
    Available,
    Loaned,
    Reserved,
}

impl BookInstanceStatus {
    /// Allowed values, in display order
    pub const ALL: [BookInstanceStatus; 4] = [
        BookInstanceStatus::Maintenance,
        BookInstanceStatus::Available,
        BookInstanceStatus::Loaned,
        BookInstanceStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookInstanceStatus::Maintenance => "Maintenance",
            BookInstanceStatus::Available => "Available",
            BookInstanceStatus::Loaned => "Loaned",
            BookInstanceStatus::Reserved => "Reserved",
        }
    }
}

impl std::fmt::Display for BookInstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookInstanceStatus {
    type Err = String;

    /// Exact match only: form values come from the fixed `ALL` list
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookInstanceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid book instance status: {}", s))
    }
}

// SQLx conversion for BookInstanceStatus (stored as TEXT)
impl sqlx::Type<Postgres> for BookInstanceStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BookInstanceStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BookInstanceStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// A physical copy of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BookInstance {
    pub id: Uuid,
    /// Referenced book (not enforced by a foreign key)
    #[sqlx(rename = "book_id")]
    pub book: Uuid,
    pub imprint: String,
    pub status: BookInstanceStatus,
    pub due_back: DateTime<Utc>,
}

impl BookInstance {
    /// Canonical detail page path
    pub fn url(&self) -> String {
        format!("/catalog/bookinstance/{}", self.id)
    }

    /// `MM/DD, YYYY`
    pub fn due_back_formatted(&self) -> String {
        self.due_back.format("%m/%d, %Y").to_string()
    }

    /// `YYYY-MM-DD`, the value format of an `<input type="date">`
    pub fn due_back_edit_format(&self) -> String {
        self.due_back.format("%Y-%m-%d").to_string()
    }

    pub fn status_list(&self) -> &'static [BookInstanceStatus] {
        &BookInstanceStatus::ALL
    }
}

/// Book instance with its book eager-loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookInstanceDetails {
    pub instance: BookInstance,
    /// `None` when the referenced book no longer exists
    pub book: Option<BookTitle>,
}

/// Candidate book instance built from request input
///
/// Fields left `None` fall back to schema defaults in [`BookInstanceDraft::into_instance`],
/// except `book` and `imprint` which are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookInstanceDraft {
    pub id: Option<Uuid>,
    pub book: Option<Uuid>,
    pub imprint: Option<String>,
    pub status: Option<BookInstanceStatus>,
    pub due_back: Option<DateTime<Utc>>,
}

impl BookInstanceDraft {
    /// Carry an existing identifier so the draft replaces that record
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Apply defaults and check required fields.
    ///
    /// A new id is assigned when the draft has none. `now` is the default `due_back`.
    pub fn into_instance(self, now: DateTime<Utc>) -> AppResult<BookInstance> {
        let mut missing = Vec::new();
        if self.book.is_none() {
            missing.push("book");
        }
        if self.imprint.as_deref().map_or(true, str::is_empty) {
            missing.push("imprint");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "BookInstance is missing required field(s): {}",
                missing.join(", ")
            )));
        }

        Ok(BookInstance {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            book: self.book.unwrap_or_default(),
            imprint: self.imprint.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            due_back: self.due_back.unwrap_or(now),
        })
    }
}
