//! View-models handed to the rendering layer, and the responses that carry them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::catalog::CatalogError;
use crate::models::{Book, BookDraft, Violation};
use crate::query::{BookPage, ListQuery};

pub const BOOKS_PATH: &str = "/books";

pub const BOOK_NOT_FOUND: &str = "Looks like the book you requested doesn't exist";
pub const PAGE_NOT_FOUND: &str = "Looks like the page you requested doesn't exist";
pub const STORE_UNAVAILABLE: &str = "The book catalog is temporarily unavailable";
pub const GENERIC_FAILURE: &str = "Oops! Something went wrong. :(";

pub const INDEX_TEMPLATE: &str = "index";
pub const NEW_BOOK_TEMPLATE: &str = "books/new-book";
pub const UPDATE_BOOK_TEMPLATE: &str = "books/update-book";
pub const NOT_FOUND_TEMPLATE: &str = "page-not-found";
pub const ERROR_TEMPLATE: &str = "error";

/// A view-model paired with the template that renders it.
#[derive(Debug, Serialize)]
pub struct Rendered<M> {
    #[serde(skip)]
    pub status: StatusCode,
    pub template: &'static str,
    pub model: M,
}

impl<M> Rendered<M> {
    pub fn new(template: &'static str, model: M) -> Self {
        Rendered {
            status: StatusCode::OK,
            template,
            model,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<M: Serialize> IntoResponse for Rendered<M> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub books: Vec<Book>,
    pub page: i64,
    pub size: i64,
    pub page_count: i64,
    pub total_matching: i64,
    pub search_query: Option<String>,
    pub next_search_url_prefix: String,
    pub title: &'static str,
}

pub fn list_view(query: &ListQuery, page: BookPage) -> ListView {
    ListView {
        books: page.books,
        page: query.page,
        size: query.size,
        page_count: page.page_count,
        total_matching: page.total_matching,
        search_query: query.search_text().map(str::to_string),
        next_search_url_prefix: search_url_prefix(BOOKS_PATH, query.search_text()),
        title: "Books",
    }
}

/// The listing URL that page links extend with `page=..&size=..`, keeping the active search.
pub fn search_url_prefix(base: &str, search: Option<&str>) -> String {
    match search {
        Some(search) => {
            let encoded: String = url::form_urlencoded::byte_serialize(search.as_bytes()).collect();
            format!("{base}?searchQuery={encoded}&")
        }
        None => format!("{base}?"),
    }
}

#[derive(Debug, Serialize)]
pub struct BookFormView {
    pub book: BookDraft,
    pub errors: Vec<Violation>,
    pub title: String,
}

pub fn new_book_view() -> BookFormView {
    BookFormView {
        book: BookDraft::default(),
        errors: Vec::new(),
        title: "New Book".to_string(),
    }
}

pub fn edit_book_view(book: &Book) -> BookFormView {
    BookFormView {
        book: BookDraft::from(book),
        errors: Vec::new(),
        title: edit_title(&book.title),
    }
}

/// A rejected form for redisplay. Drafts with an ID came from the edit form.
pub fn rejected_view(book: BookDraft, violations: Vec<Violation>) -> BookFormView {
    let title = match book.id {
        Some(_) => edit_title(&book.title),
        None => "New Book".to_string(),
    };

    BookFormView {
        book,
        errors: violations,
        title,
    }
}

fn edit_title(title: &str) -> String {
    format!("Edit Book: {title}")
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub status: u16,
}

/// Everything a handler can fail with once validation has been dealt with.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Failure { status: StatusCode, message: String },
}

impl AppError {
    pub fn book_not_found() -> Self {
        AppError::NotFound {
            message: BOOK_NOT_FOUND.to_string(),
        }
    }

    pub fn page_not_found() -> Self {
        AppError::NotFound {
            message: PAGE_NOT_FOUND.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Failure { status, .. } => *status,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound { id } => {
                warn!("No book found with ID: {}", id);
                AppError::book_not_found()
            }
            CatalogError::StoreUnavailable(source) => {
                error!("Book store unavailable: {}", source);
                AppError::Failure {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: STORE_UNAVAILABLE.to_string(),
                }
            }
            CatalogError::Unexpected(source) => {
                error!("Unexpected book store failure: {}", source);
                AppError::Failure {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: GENERIC_FAILURE.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let template = if status == StatusCode::NOT_FOUND {
            NOT_FOUND_TEMPLATE
        } else {
            ERROR_TEMPLATE
        };
        let model = ErrorView {
            message: self.to_string(),
            status: status.as_u16(),
        };

        Rendered::new(template, model)
            .with_status(status)
            .into_response()
    }
}
