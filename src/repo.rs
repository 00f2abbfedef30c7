use crate::models::{Book, NewBook};
use crate::query::BookSearch;
use std::error::Error;
use std::future::Future;

/// Lets the catalog tell a store that cannot be reached apart from one that failed a statement.
pub trait StoreError: Error + Send + Sync + 'static {
    fn is_unavailable(&self) -> bool;
}

pub trait BookRepo {
    type Error: StoreError;

    /// Books matching the search (all books if `None`), ordered by ID
    fn find_books(
        &self,
        search: Option<&BookSearch>,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;

    fn count_books(
        &self,
        search: Option<&BookSearch>,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    fn get_book(&self, id: i32) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send;

    fn insert_book(
        &mut self,
        new_book: NewBook,
    ) -> impl Future<Output = Result<Book, Self::Error>> + Send;

    fn update_book(
        &mut self,
        id: i32,
        new_book: NewBook,
    ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send;

    /// Returns true if the book existed and was deleted, false otherwise
    fn delete_book(&mut self, id: i32) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn check_connection(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
