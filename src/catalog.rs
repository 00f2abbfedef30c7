//! Catalog operations: listing, lookup and validated mutations of books.

use std::error::Error;

use crate::models::{Book, BookDraft, BookForm, Violation};
use crate::query::{page_count, BookPage, ListQuery};
use crate::repo::{BookRepo, StoreError};

/// A form that failed validation, with the entered values kept for redisplay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub book: BookDraft,
    pub violations: Vec<Violation>,
}

/// The outcome of a create or update that reached the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Saved(Book),
    Rejected(Rejection),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("no book found with ID: {id}")]
    NotFound { id: i32 },
    #[error("the book store is unavailable")]
    StoreUnavailable(#[source] Box<dyn Error + Send + Sync>),
    #[error("unexpected failure in the book store")]
    Unexpected(#[source] Box<dyn Error + Send + Sync>),
}

impl CatalogError {
    fn from_store<E: StoreError>(error: E) -> Self {
        if error.is_unavailable() {
            CatalogError::StoreUnavailable(Box::new(error))
        } else {
            CatalogError::Unexpected(Box::new(error))
        }
    }
}

pub async fn list_books<R: BookRepo>(
    repo: &R,
    query: &ListQuery,
) -> Result<BookPage, CatalogError> {
    let search = query.search.as_ref();

    let books = repo
        .find_books(search, query.limit(), query.offset())
        .await
        .map_err(CatalogError::from_store)?;
    let total_matching = repo
        .count_books(search)
        .await
        .map_err(CatalogError::from_store)?;

    Ok(BookPage {
        books,
        total_matching,
        page_count: page_count(total_matching, query.size),
    })
}

pub async fn find_book<R: BookRepo>(repo: &R, id: i32) -> Result<Book, CatalogError> {
    repo.get_book(id)
        .await
        .map_err(CatalogError::from_store)?
        .ok_or(CatalogError::NotFound { id })
}

pub async fn create_book<R: BookRepo>(
    repo: &mut R,
    form: BookForm,
) -> Result<Mutation, CatalogError> {
    let new_book = match form.validate() {
        Ok(new_book) => new_book,
        Err(violations) => return Ok(rejected(&form, None, violations)),
    };

    repo.insert_book(new_book)
        .await
        .map(Mutation::Saved)
        .map_err(CatalogError::from_store)
}

/// The book must exist before the form is validated; a rejected form keeps the route's ID.
pub async fn update_book<R: BookRepo>(
    repo: &mut R,
    id: i32,
    form: BookForm,
) -> Result<Mutation, CatalogError> {
    find_book(&*repo, id).await?;

    let new_book = match form.validate() {
        Ok(new_book) => new_book,
        Err(violations) => return Ok(rejected(&form, Some(id), violations)),
    };

    // The book can disappear between the lookup and the write
    repo.update_book(id, new_book)
        .await
        .map_err(CatalogError::from_store)?
        .map(Mutation::Saved)
        .ok_or(CatalogError::NotFound { id })
}

fn rejected(form: &BookForm, id: Option<i32>, violations: Vec<Violation>) -> Mutation {
    Mutation::Rejected(Rejection {
        book: form.build_unsaved(id),
        violations,
    })
}

pub async fn delete_book<R: BookRepo>(repo: &mut R, id: i32) -> Result<(), CatalogError> {
    find_book(&*repo, id).await?;

    let deleted = repo
        .delete_book(id)
        .await
        .map_err(CatalogError::from_store)?;

    if deleted {
        Ok(())
    } else {
        Err(CatalogError::NotFound { id })
    }
}

pub async fn check_store<R: BookRepo>(repo: &R) -> Result<(), CatalogError> {
    repo.check_connection()
        .await
        .map_err(CatalogError::from_store)
}
