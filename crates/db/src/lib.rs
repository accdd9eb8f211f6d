//! PostgreSQL pool factory, health check, and the migration runner for
//! module-contributed schema changes.

use async_trait::async_trait;
use libris_kernel::settings::DatabaseSettings;
use libris_kernel::{InitCtx, Migration, Module};
use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Ledger table recording which module migrations have been applied.
const LEDGER_TABLE: &str = "_libris_migrations";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

/// Create a connection pool from the database settings.
pub async fn create_pool(settings: &DatabaseSettings) -> Result<DbPool, DbError> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await
        .map_err(DbError::Connect)
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply every migration not yet recorded in the ledger.
///
/// Migrations are applied in the order given, each inside its own
/// transaction together with its ledger row. Returns how many were applied.
pub async fn apply_migrations(
    pool: &DbPool,
    migrations: &[(String, Migration)],
) -> Result<usize, DbError> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (\
             module TEXT NOT NULL, \
             id TEXT NOT NULL, \
             applied_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
             PRIMARY KEY (module, id))"
    ))
    .execute(pool)
    .await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {LEDGER_TABLE} WHERE module = $1 AND id = $2"
        ))
        .bind(module)
        .bind(migration.id)
        .fetch_optional(pool)
        .await?;

        if already.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let wrap = |source: sqlx::Error| DbError::Migration {
            module: module.clone(),
            id: migration.id,
            source,
        };

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        sqlx::query(&format!(
            "INSERT INTO {LEDGER_TABLE} (module, id) VALUES ($1, $2)"
        ))
        .bind(module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await
        .map_err(wrap)?;
        tx.commit().await?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

/// Core module owning the connection pool lifecycle.
pub struct DatabaseModule {
    pool: DbPool,
}

impl DatabaseModule {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            url = %ctx.settings.database.redacted_url(),
            max_connections = ctx.settings.database.max_connections,
            "database module initialized"
        );
        Ok(())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        health_check(&self.pool).await?;
        tracing::info!(module = self.name(), "database health check passed");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        tracing::info!(module = self.name(), "database pool closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_error_names_module_and_id() {
        let err = DbError::Migration {
            module: "books".to_string(),
            id: "001_init",
            source: sqlx::Error::RowNotFound,
        };
        assert!(err.to_string().starts_with("migration books/001_init failed"));
    }

    #[tokio::test]
    async fn module_reports_db_name() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@127.0.0.1:1/unused")
            .unwrap();
        let module = DatabaseModule::new(pool);
        assert_eq!(module.name(), "db");
        assert!(module.migrations().is_empty());
    }
}
