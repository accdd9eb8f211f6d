use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookChanges, BookFilter, BookId, NewBook, Window};

#[derive(Debug, Default)]
struct Table {
    last_id: BookId,
    rows: BTreeMap<BookId, Book>,
}

/// Process-local store for running without PostgreSQL.
///
/// Ids start at 1 and are never reissued, matching a `SERIAL` column.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    table: RwLock<Table>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clamp(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn create(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut table = self.table.write().await;
        let id = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Unavailable("book id sequence exhausted".to_string()))?;
        table.last_id = id;

        let created = book.into_book(id);
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn find_many(
        &self,
        filter: &BookFilter,
        window: Window,
    ) -> Result<Vec<Book>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|book| filter.matches(book))
            .skip(clamp(window.skip))
            .take(clamp(window.take))
            .cloned()
            .collect())
    }

    async fn find_unique(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Option<Book>, StoreError> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|book| {
            changes.apply(book);
            book.clone()
        }))
    }

    async fn delete(&self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn new_book(name: &str) -> NewBook {
        NewBook {
            name: name.to_string(),
            description: format!("About {name}"),
            publish_date: Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap(),
            price: 10.0,
        }
    }

    #[tokio::test]
    async fn ids_are_fresh_even_after_delete() {
        let store = MemoryBookStore::new();
        let first = store.create(new_book("One")).await.unwrap();
        let second = store.create(new_book("Two")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        assert!(store.delete(second.id).await.unwrap());
        let third = store.create(new_book("Three")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn find_many_windows_the_filtered_set() {
        let store = MemoryBookStore::new();
        for i in 1..=12 {
            let name = if i % 2 == 0 { "Even" } else { "Odd" };
            store.create(new_book(&format!("{name} {i}"))).await.unwrap();
        }

        let filter = BookFilter {
            name: Some("Even".to_string()),
            description: None,
        };
        let page = store
            .find_many(&filter, Window { skip: 2, take: 2 })
            .await
            .unwrap();
        let ids: Vec<BookId> = page.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![6, 8]);

        let past_end = store
            .find_many(&filter, Window { skip: 10, take: 5 })
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = MemoryBookStore::new();
        let changes = BookChanges {
            price: Some(1.0),
            ..BookChanges::default()
        };
        assert!(store.update(99, changes).await.unwrap().is_none());
        assert!(!store.delete(99).await.unwrap());
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let store = MemoryBookStore::new();
        let created = store.create(new_book("One")).await.unwrap();

        let updated = store
            .update(
                created.id,
                BookChanges {
                    name: Some("Uno".to_string()),
                    ..BookChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Uno");
        assert_eq!(updated.description, created.description);
        assert_eq!(store.find_unique(created.id).await.unwrap(), Some(updated));
    }
}
