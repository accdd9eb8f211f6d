use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier type of the `books` table (`SERIAL`).
pub type BookId = i32;

/// A row from the `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Assigned by the store on creation
    pub id: BookId,
    pub name: String,
    pub description: String,
    pub publish_date: DateTime<Utc>,
    /// Always strictly positive
    pub price: f64,
}

/// Fields of a book about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub name: String,
    pub description: String,
    pub publish_date: DateTime<Utc>,
    pub price: f64,
}

impl NewBook {
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            name: self.name,
            description: self.description,
            publish_date: self.publish_date,
            price: self.price,
        }
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub price: Option<f64>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.publish_date.is_none()
            && self.price.is_none()
    }

    pub fn apply(self, book: &mut Book) {
        if let Some(name) = self.name {
            book.name = name;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(publish_date) = self.publish_date {
            book.publish_date = publish_date;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
    }
}

/// Substring filters, AND-combined. Matching is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .map_or(true, |needle| book.name.contains(needle));
        let description_ok = self
            .description
            .as_deref()
            .map_or(true, |needle| book.description.contains(needle));
        name_ok && description_ok
    }
}

/// Pagination window over the filtered, id-ordered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: i64,
    pub take: i64,
}
