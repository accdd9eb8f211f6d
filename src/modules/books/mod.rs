pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::{InitCtx, Migration, Module};

use store::SharedStore;

/// Books module: CRUD and filtered listing over the `books` table
pub struct BooksModule {
    store: SharedStore,
}

impl BooksModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.store))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id           SERIAL PRIMARY KEY,
                    name         TEXT NOT NULL CHECK (name <> ''),
                    description  TEXT NOT NULL CHECK (description <> ''),
                    publish_date TIMESTAMPTZ NOT NULL,
                    price        DOUBLE PRECISION NOT NULL CHECK (price > 0)
                );
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.store.ping().await?;
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_envelope(description: &str, many: bool) -> serde_json::Value {
    let data = if many {
        serde_json::json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } })
    } else {
        serde_json::json!({ "$ref": "#/components/schemas/Book" })
    };
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": { "data": data },
                    "required": ["data"]
                }
            }
        }
    })
}

fn json_body(schema: &str) -> serde_json::Value {
    serde_json::json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int32" }
    });
    let query_param = |name: &str, kind: &str, description: &str| {
        serde_json::json!({
            "name": name,
            "in": "query",
            "required": false,
            "description": description,
            "schema": { "type": kind }
        })
    };

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("name", "string", "Substring of the name"),
                        query_param("description", "string", "Substring of the description"),
                        query_param("page", "integer", "1-based page number, default 1"),
                        query_param("limit", "integer", "Page size, default 10")
                    ],
                    "responses": {
                        "200": book_envelope("Matching books", true),
                        "400": error_response("Invalid query")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": json_body("CreateBook"),
                    "responses": {
                        "200": book_envelope("Created book", false),
                        "400": error_response("Invalid payload or store failure")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        },
                        "400": error_response("Store unreachable")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": book_envelope("The book", false),
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update some fields of a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": json_body("UpdateBook"),
                    "responses": {
                        "200": book_envelope("Updated book", false),
                        "400": error_response("Invalid book ID or payload"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int32" },
                        "name": { "type": "string" },
                        "description": { "type": "string" },
                        "publishDate": { "type": "string", "format": "date-time" },
                        "price": { "type": "number", "exclusiveMinimum": 0 }
                    },
                    "required": ["id", "name", "description", "publishDate", "price"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "description": { "type": "string", "minLength": 1 },
                        "publishDate": { "type": "string", "format": "date" },
                        "price": { "type": "number", "exclusiveMinimum": 0 }
                    },
                    "required": ["name", "description", "publishDate", "price"],
                    "additionalProperties": false
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "description": { "type": "string", "minLength": 1 },
                        "publishDate": { "type": "string", "format": "date" },
                        "price": { "type": "number", "exclusiveMinimum": 0 }
                    },
                    "minProperties": 1
                }
            }
        }
    })
}

/// Create the books module over the given store
pub fn create_module(store: SharedStore) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryBookStore;

    #[test]
    fn module_mounts_at_books() {
        let module = BooksModule::new(Arc::new(MemoryBookStore::new()));
        assert_eq!(module.mount_path(), "/books");
    }

    #[test]
    fn openapi_documents_every_operation() {
        let spec = openapi_fragment();
        let paths = &spec["paths"];
        for (path, method) in [
            ("/", "get"),
            ("/", "post"),
            ("/{id}", "get"),
            ("/{id}", "put"),
            ("/{id}", "delete"),
        ] {
            assert!(paths[path][method].is_object(), "{method} {path}");
        }
        assert!(spec["components"]["schemas"]["Book"].is_object());
    }

    #[test]
    fn migration_creates_books_table() {
        let module = BooksModule::new(Arc::new(MemoryBookStore::new()));
        let migrations = module.migrations();
        assert_eq!(migrations.len(), 1);
        assert!(migrations[0].up.contains("CREATE TABLE IF NOT EXISTS books"));
        assert!(migrations[0].up.contains("CHECK (price > 0)"));
    }
}
