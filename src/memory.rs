//! A book store kept in process memory, used when no database is configured.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{Book, NewBook};
use crate::query::BookSearch;
use crate::repo::{BookRepo, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("the in-memory book store has been taken offline")]
    Unavailable,
}

impl StoreError for MemoryStoreError {
    fn is_unavailable(&self) -> bool {
        matches!(self, MemoryStoreError::Unavailable)
    }
}

#[derive(Debug, Default)]
struct Shelf {
    last_id: i32,
    books: BTreeMap<i32, Book>,
}

#[derive(Debug, Clone)]
pub struct MemoryBookRepo {
    shelf: Arc<RwLock<Shelf>>,
    online: Arc<AtomicBool>,
}

impl Default for MemoryBookRepo {
    fn default() -> Self {
        MemoryBookRepo {
            shelf: Arc::default(),
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryBookRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (or regaining) the connection to the store. Clones share the flag.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), MemoryStoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MemoryStoreError::Unavailable)
        }
    }
}

fn book_from(id: i32, new_book: NewBook) -> Book {
    Book {
        id,
        title: new_book.title,
        author: new_book.author,
        genre: new_book.genre,
        year: new_book.year,
    }
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

impl BookRepo for MemoryBookRepo {
    type Error = MemoryStoreError;

    async fn find_books(
        &self,
        search: Option<&BookSearch>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Book>, MemoryStoreError> {
        self.ensure_online()?;
        let shelf = self.shelf.read().await;

        let books = shelf
            .books
            .values()
            .filter(|book| search.map_or(true, |search| search.matches(book)))
            .skip(to_usize(offset))
            .take(to_usize(limit))
            .cloned()
            .collect();

        Ok(books)
    }

    async fn count_books(&self, search: Option<&BookSearch>) -> Result<i64, MemoryStoreError> {
        self.ensure_online()?;
        let shelf = self.shelf.read().await;

        let count = shelf
            .books
            .values()
            .filter(|book| search.map_or(true, |search| search.matches(book)))
            .count();

        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn get_book(&self, id: i32) -> Result<Option<Book>, MemoryStoreError> {
        self.ensure_online()?;
        Ok(self.shelf.read().await.books.get(&id).cloned())
    }

    async fn insert_book(&mut self, new_book: NewBook) -> Result<Book, MemoryStoreError> {
        self.ensure_online()?;
        let mut shelf = self.shelf.write().await;

        shelf.last_id += 1;
        let book = book_from(shelf.last_id, new_book);
        shelf.books.insert(book.id, book.clone());

        Ok(book)
    }

    async fn update_book(
        &mut self,
        id: i32,
        new_book: NewBook,
    ) -> Result<Option<Book>, MemoryStoreError> {
        self.ensure_online()?;
        let mut shelf = self.shelf.write().await;

        let updated_book = shelf.books.get_mut(&id).map(|book| {
            *book = book_from(id, new_book);
            book.clone()
        });

        Ok(updated_book)
    }

    async fn delete_book(&mut self, id: i32) -> Result<bool, MemoryStoreError> {
        self.ensure_online()?;
        Ok(self.shelf.write().await.books.remove(&id).is_some())
    }

    async fn check_connection(&self) -> Result<(), MemoryStoreError> {
        self.ensure_online()
    }
}
