//! Server-side HTML rendering with Tera
//!
//! Templates are compiled into the binary; a configured glob replaces them
//! wholesale (useful while editing markup).

use axum::response::Html;
use serde::Serialize;
use tera::{Context, Tera};
use uuid::Uuid;

use crate::{
    config::TemplatesConfig,
    error::AppResult,
    forms::{FieldErrors, SanitizedBookInstanceForm},
    models::{BookInstance, BookInstanceDetails, BookInstanceStatus, BookTitle},
};

const EMBEDDED_TEMPLATES: [(&str, &str); 5] = [
    ("layout.html", include_str!("../../templates/layout.html")),
    ("bookinstance_list.html", include_str!("../../templates/bookinstance_list.html")),
    ("bookinstance_detail.html", include_str!("../../templates/bookinstance_detail.html")),
    ("bookinstance_form.html", include_str!("../../templates/bookinstance_form.html")),
    ("bookinstance_delete.html", include_str!("../../templates/bookinstance_delete.html")),
];

/// Template engine shared by all handlers
pub struct Views {
    tera: Tera,
}

impl Views {
    /// Build from the configured directory, or the embedded templates when none is set
    pub fn load(config: &TemplatesConfig) -> AppResult<Self> {
        match config.dir.as_deref() {
            Some(glob) => {
                tracing::info!(%glob, "loading templates from disk");
                Ok(Self { tera: Tera::new(glob)? })
            }
            None => Self::embedded(),
        }
    }

    pub fn embedded() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED_TEMPLATES)?;
        Ok(Self { tera })
    }

    fn render<T: Serialize>(&self, template: &str, page: &T) -> AppResult<Html<String>> {
        let context = Context::from_serialize(page)?;
        Ok(Html(self.tera.render(template, &context)?))
    }

    pub fn list(&self, instances: &[BookInstanceDetails]) -> AppResult<Html<String>> {
        self.render(
            "bookinstance_list.html",
            &ListPage {
                title: "Book Instance List",
                bookinstance_list: instances.iter().map(BookInstanceView::from).collect(),
            },
        )
    }

    pub fn detail(&self, details: &BookInstanceDetails) -> AppResult<Html<String>> {
        let view = BookInstanceView::from(details);
        self.render(
            "bookinstance_detail.html",
            &DetailPage {
                title: format!("Copy: {}", view.book_label()),
                bookinstance: view,
            },
        )
    }

    pub fn form(&self, page: &FormPage<'_>) -> AppResult<Html<String>> {
        self.render("bookinstance_form.html", page)
    }

    pub fn delete(&self, details: &BookInstanceDetails) -> AppResult<Html<String>> {
        self.render(
            "bookinstance_delete.html",
            &DetailPage {
                title: format!("Delete book copy of {}", details.instance.id),
                bookinstance: BookInstanceView::from(details),
            },
        )
    }
}

/// A copy prepared for display, derived fields included
#[derive(Debug, Serialize)]
pub struct BookInstanceView {
    pub id: Uuid,
    pub url: String,
    pub book: Option<BookTitle>,
    pub imprint: String,
    pub status: BookInstanceStatus,
    pub due_back_formatted: String,
    pub due_back_edit_format: String,
}

impl BookInstanceView {
    fn book_label(&self) -> String {
        self.book
            .as_ref()
            .map(|book| book.title.clone())
            .unwrap_or_else(|| "(unknown book)".to_string())
    }
}

impl From<&BookInstanceDetails> for BookInstanceView {
    fn from(details: &BookInstanceDetails) -> Self {
        let instance = &details.instance;
        Self {
            id: instance.id,
            url: instance.url(),
            book: details.book.clone(),
            imprint: instance.imprint.clone(),
            status: instance.status,
            due_back_formatted: instance.due_back_formatted(),
            due_back_edit_format: instance.due_back_edit_format(),
        }
    }
}

/// Values shown in the copy form inputs
#[derive(Debug, Default, Serialize)]
pub struct BookInstanceFormView {
    pub id: Option<Uuid>,
    pub imprint: String,
    pub status: String,
    pub due_back: String,
}

impl From<&BookInstance> for BookInstanceFormView {
    fn from(instance: &BookInstance) -> Self {
        Self {
            id: Some(instance.id),
            imprint: instance.imprint.clone(),
            status: instance.status.to_string(),
            due_back: instance.due_back_edit_format(),
        }
    }
}

impl From<&SanitizedBookInstanceForm> for BookInstanceFormView {
    fn from(form: &SanitizedBookInstanceForm) -> Self {
        Self {
            id: None,
            imprint: form.imprint.clone(),
            status: form.status.clone(),
            due_back: form.due_back.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct ListPage {
    title: &'static str,
    bookinstance_list: Vec<BookInstanceView>,
}

#[derive(Serialize)]
struct DetailPage {
    title: String,
    bookinstance: BookInstanceView,
}

/// Data bag for `bookinstance_form.html`
#[derive(Debug, Serialize)]
pub struct FormPage<'a> {
    pub title: &'static str,
    pub book_list: &'a [BookTitle],
    pub selected_book: Option<Uuid>,
    pub bookinstance: BookInstanceFormView,
    pub errors: Option<&'a FieldErrors>,
    pub status_list: &'static [BookInstanceStatus],
}

impl<'a> FormPage<'a> {
    pub fn new(title: &'static str, book_list: &'a [BookTitle]) -> Self {
        Self {
            title,
            book_list,
            selected_book: None,
            bookinstance: BookInstanceFormView::default(),
            errors: None,
            status_list: &BookInstanceStatus::ALL,
        }
    }

    /// Prefill with a stored copy
    pub fn with_instance(mut self, instance: &BookInstance) -> Self {
        self.selected_book = Some(instance.book);
        self.bookinstance = BookInstanceFormView::from(instance);
        self
    }

    /// Echo back rejected input alongside its errors
    pub fn with_rejected(mut self, form: &SanitizedBookInstanceForm, errors: &'a FieldErrors) -> Self {
        self.selected_book = form.selected_book();
        self.bookinstance = BookInstanceFormView::from(form);
        self.errors = Some(errors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::BookInstanceForm;
    use chrono::{TimeZone, Utc};

    fn details() -> BookInstanceDetails {
        let book = Uuid::new_v4();
        BookInstanceDetails {
            instance: BookInstance {
                id: Uuid::new_v4(),
                book,
                imprint: "Gollancz, 2015".to_string(),
                status: BookInstanceStatus::Loaned,
                due_back: Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap(),
            },
            book: Some(BookTitle {
                id: book,
                title: "Dune <first edition>".to_string(),
            }),
        }
    }

    #[test]
    fn test_embedded_templates_compile() {
        assert!(Views::embedded().is_ok());
    }

    #[test]
    fn test_list_renders_rows() {
        let views = Views::embedded().unwrap();
        let item = details();
        let html = views.list(std::slice::from_ref(&item)).unwrap().0;
        assert!(html.contains("Book Instance List"));
        assert!(html.contains(&item.instance.url()));
        assert!(html.contains("Dune &lt;first edition&gt;"));
        assert!(html.contains("03/07, 2024"));
    }

    #[test]
    fn test_list_empty() {
        let views = Views::embedded().unwrap();
        let html = views.list(&[]).unwrap().0;
        assert!(html.contains("There are no book copies in this library."));
    }

    #[test]
    fn test_detail_with_dangling_book() {
        let views = Views::embedded().unwrap();
        let mut item = details();
        item.book = None;
        let html = views.detail(&item).unwrap().0;
        assert!(html.contains("Copy: (unknown book)"));
    }

    #[test]
    fn test_form_marks_selected_book_and_errors() {
        let views = Views::embedded().unwrap();
        let books = vec![
            BookTitle { id: Uuid::new_v4(), title: "Emma".to_string() },
            BookTitle { id: Uuid::new_v4(), title: "Persuasion".to_string() },
        ];
        let form = BookInstanceForm {
            book: Some(books[1].id.to_string()),
            imprint: Some(String::new()),
            ..Default::default()
        }
        .sanitize();
        let errors = form.validate_draft().unwrap_err();

        let html = views
            .form(&FormPage::new("Create BookInstance", &books).with_rejected(&form, &errors))
            .unwrap()
            .0;
        assert!(html.contains(&format!("value=\"{}\" selected", books[1].id)));
        assert!(!html.contains(&format!("value=\"{}\" selected", books[0].id)));
        assert!(html.contains("Imprint must be specified"));
    }

    #[test]
    fn test_edit_form_prefills_values() {
        let views = Views::embedded().unwrap();
        let item = details();
        let books = vec![item.book.clone().unwrap()];
        let html = views
            .form(&FormPage::new("Update book instance", &books).with_instance(&item.instance))
            .unwrap()
            .0;
        assert!(html.contains("value=\"2024-03-07\""));
        assert!(html.contains("value=\"Loaned\" selected"));
        assert!(html.contains("Gollancz, 2015"));
    }
}
