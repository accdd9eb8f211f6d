//! Browser client: one static page that lists books in a table.

use axum::{response::Html, routing::get, Router};

const INDEX_HTML: &str = include_str!("index.html");

/// Routes served from the site root.
pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
