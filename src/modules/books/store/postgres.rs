use async_trait::async_trait;
use libris_db::DbPool;
use sqlx::{Postgres, QueryBuilder};

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookChanges, BookFilter, BookId, NewBook, Window};

/// Column list for `books` queries.
const BOOK_COLUMNS: &str = "id, name, description, publish_date, price";

/// Book records in the PostgreSQL `books` table.
#[derive(Clone)]
pub struct PgBookStore {
    pool: DbPool,
}

impl PgBookStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Wrap a user-supplied needle for `LIKE`, escaping its wildcards.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn create(&self, book: NewBook) -> Result<Book, StoreError> {
        let query = format!(
            "INSERT INTO books (name, description, publish_date, price) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {BOOK_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Book>(&query)
            .bind(&book.name)
            .bind(&book.description)
            .bind(book.publish_date)
            .bind(book.price)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_many(
        &self,
        filter: &BookFilter,
        window: Window,
    ) -> Result<Vec<Book>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE TRUE"));

        if let Some(name) = &filter.name {
            builder.push(" AND name LIKE ").push_bind(contains_pattern(name));
        }
        if let Some(description) = &filter.description {
            builder
                .push(" AND description LIKE ")
                .push_bind(contains_pattern(description));
        }
        builder
            .push(" ORDER BY id LIMIT ")
            .push_bind(window.take)
            .push(" OFFSET ")
            .push_bind(window.skip);

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_unique(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Option<Book>, StoreError> {
        if changes.is_empty() {
            return self.find_unique(id).await;
        }

        let query = format!(
            "UPDATE books SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 publish_date = COALESCE($4, publish_date), \
                 price = COALESCE($5, price) \
             WHERE id = $1 \
             RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.description)
            .bind(changes.publish_date)
            .bind(changes.price)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn delete(&self, id: BookId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        libris_db::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Dune"), "%Dune%");
        assert_eq!(contains_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(contains_pattern(""), "%%");
    }
}
