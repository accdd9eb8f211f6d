//! HTTP handlers for the books module.
//!
//! Every handler validates first (through its extractors), makes exactly one
//! store call, then shapes the response.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use libris_http::{AppError, Envelope, ValidatedJson, ValidatedQuery};

use super::models::Book;
use super::store::{SharedStore, StoreError};
use super::validation::{CreateBookRequest, ListBooksQuery, PathId, UpdateBookRequest};

/// Routes relative to the module mount path.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

/// Store failures surface as 400 with the operation named.
fn persistence_error(action: &str, err: StoreError) -> AppError {
    tracing::error!(error = %err, action, "book store call failed");
    AppError::persistence(format!("Failed to {action}: {err}"))
}

fn book_not_found() -> AppError {
    AppError::not_found("Book not found")
}

async fn create_book(
    State(store): State<SharedStore>,
    ValidatedJson(payload): ValidatedJson<CreateBookRequest>,
) -> Result<Envelope<Book>, AppError> {
    let book = store
        .create(payload.into())
        .await
        .map_err(|e| persistence_error("create a new book", e))?;

    tracing::info!(book_id = book.id, "book created");
    Ok(Envelope::new(book))
}

async fn list_books(
    State(store): State<SharedStore>,
    ValidatedQuery(query): ValidatedQuery<ListBooksQuery>,
) -> Result<Envelope<Vec<Book>>, AppError> {
    let window = query.window()?;
    let books = store
        .find_many(&query.filter(), window)
        .await
        .map_err(|e| persistence_error("fetch books", e))?;

    tracing::debug!(count = books.len(), skip = window.skip, take = window.take, "books listed");
    Ok(Envelope::new(books))
}

async fn get_book(
    State(store): State<SharedStore>,
    PathId(id): PathId,
) -> Result<Envelope<Book>, AppError> {
    store
        .find_unique(id)
        .await
        .map_err(|e| persistence_error("fetch the book", e))?
        .map(Envelope::new)
        .ok_or_else(book_not_found)
}

async fn update_book(
    State(store): State<SharedStore>,
    PathId(id): PathId,
    ValidatedJson(payload): ValidatedJson<UpdateBookRequest>,
) -> Result<Envelope<Book>, AppError> {
    let book = store
        .update(id, payload.into())
        .await
        .map_err(|e| persistence_error("update the book", e))?
        .ok_or_else(book_not_found)?;

    tracing::info!(book_id = book.id, "book updated");
    Ok(Envelope::new(book))
}

async fn delete_book(
    State(store): State<SharedStore>,
    PathId(id): PathId,
) -> Result<StatusCode, AppError> {
    let deleted = store
        .delete(id)
        .await
        .map_err(|e| persistence_error("delete the book", e))?;

    if !deleted {
        return Err(book_not_found());
    }
    tracing::info!(book_id = id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Health check endpoint
async fn health_check(State(store): State<SharedStore>) -> Result<&'static str, AppError> {
    store
        .ping()
        .await
        .map_err(|e| persistence_error("reach the book store", e))?;
    Ok("books module is healthy")
}
