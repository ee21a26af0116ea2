//! Book instance (copy) pages
//!
//! Mutating handlers validate the posted form first. Rejected input is
//! rendered back into the form with its errors; accepted input is persisted
//! and answered with a redirect.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    forms::{BookInstanceForm, DeleteBookInstanceForm},
    views::FormPage,
    AppState,
};

const LIST_URL: &str = "/catalog/bookinstances";
const CREATE_TITLE: &str = "Create BookInstance";
const UPDATE_TITLE: &str = "Update book instance";

/// Path ids that are not UUIDs cannot name a stored copy
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// List all copies
pub async fn list(State(state): State<AppState>) -> AppResult<Html<String>> {
    let instances = state.services.book_instances.list().await?;
    tracing::debug!(count = instances.len(), "listing book instances");
    state.views.list(&instances)
}

/// Show one copy
pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Html<String>> {
    let id = parse_id(&id).ok_or_else(|| AppError::NotFound("Book copy not found".to_string()))?;
    let details = state.services.book_instances.get(id).await?;
    state.views.detail(&details)
}

/// Empty create form
pub async fn create_form(State(state): State<AppState>) -> AppResult<Html<String>> {
    let books = state.services.book_instances.book_titles().await?;
    state.views.form(&FormPage::new(CREATE_TITLE, &books))
}

/// Handle the create form
pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<BookInstanceForm>,
) -> AppResult<Response> {
    let service = &state.services.book_instances;
    let form = form.sanitize();

    match form.validate_draft() {
        Ok(draft) => {
            let created = service.create(draft).await?;
            Ok(Redirect::to(&created.url()).into_response())
        }
        Err(errors) => {
            tracing::debug!(errors = errors.len(), "book instance create rejected");
            let books = service.book_titles().await?;
            let page = FormPage::new(CREATE_TITLE, &books).with_rejected(&form, &errors);
            Ok(state.views.form(&page)?.into_response())
        }
    }
}

/// Update form prefilled with the stored copy
pub async fn update_form(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Html<String>> {
    let id = parse_id(&id).ok_or_else(|| AppError::NotFound("Book instance not found".to_string()))?;
    let (details, books) = state.services.book_instances.get_for_update(id).await?;
    state
        .views
        .form(&FormPage::new(UPDATE_TITLE, &books).with_instance(&details.instance))
}

/// Handle the update form; the path id names the copy to replace.
///
/// The form is validated before the id is looked at, so rejected input is
/// always redisplayed. Accepted input on an id that names no copy fails
/// the same way as a copy that vanished.
pub async fn update(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Form(form): Form<BookInstanceForm>,
) -> AppResult<Response> {
    let service = &state.services.book_instances;
    let form = form.sanitize();

    match form.validate_draft() {
        Ok(draft) => {
            let id = parse_id(&raw_id)
                .ok_or_else(|| AppError::Internal(format!("Book instance {} vanished before update", raw_id)))?;
            let updated = service.update(id, draft).await?;
            Ok(Redirect::to(&updated.url()).into_response())
        }
        Err(errors) => {
            tracing::debug!(id = %raw_id, errors = errors.len(), "book instance update rejected");
            let books = service.book_titles().await?;
            let mut page = FormPage::new(UPDATE_TITLE, &books).with_rejected(&form, &errors);
            page.bookinstance.id = parse_id(&raw_id);
            Ok(state.views.form(&page)?.into_response())
        }
    }
}

/// Delete confirmation; an unknown copy sends the user back to the list
pub async fn delete_form(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    let found = match parse_id(&id) {
        Some(id) => state.services.book_instances.find(id).await?,
        None => None,
    };

    match found {
        Some(details) => Ok(state.views.delete(&details)?.into_response()),
        None => {
            tracing::debug!(%id, "delete requested for unknown book instance");
            Ok(Redirect::to(LIST_URL).into_response())
        }
    }
}

/// Handle the delete confirmation; the copy is named by the posted
/// `bookinstanceid`, not the path
pub async fn delete(
    State(state): State<AppState>,
    Form(form): Form<DeleteBookInstanceForm>,
) -> AppResult<Redirect> {
    let id = form
        .bookinstanceid
        .as_deref()
        .and_then(parse_id)
        .ok_or_else(|| AppError::BadRequest("Missing or invalid book instance id".to_string()))?;
    state.services.book_instances.delete(id).await?;
    Ok(Redirect::to(LIST_URL))
}
