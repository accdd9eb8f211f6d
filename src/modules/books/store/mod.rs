//! Persistence gateway for book records.
//!
//! Each method is a single call against the backing store; nothing is cached.

mod memory;
mod postgres;

pub use memory::MemoryBookStore;
pub use postgres::PgBookStore;

use std::sync::Arc;

use async_trait::async_trait;

use super::models::{Book, BookChanges, BookFilter, BookId, NewBook, Window};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a record; the store assigns the id.
    async fn create(&self, book: NewBook) -> Result<Book, StoreError>;

    /// Records matching `filter`, in id order, windowed by `skip`/`take`.
    async fn find_many(&self, filter: &BookFilter, window: Window)
        -> Result<Vec<Book>, StoreError>;

    async fn find_unique(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// Apply `changes`; `None` when no record has `id`.
    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Option<Book>, StoreError>;

    /// Hard delete; `false` when no record has `id`.
    async fn delete(&self, id: BookId) -> Result<bool, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn BookStore>;
