//! Wires settings, the selected store backend, and the module registry into a
//! runnable application.

use std::sync::Arc;

use anyhow::Context;
use libris_db::{DatabaseModule, DbPool};
use libris_kernel::settings::{Settings, StoreBackend};
use libris_kernel::{InitCtx, ModuleRegistry};

use crate::modules::{
    self,
    books::store::{MemoryBookStore, PgBookStore, SharedStore},
};

/// A fully registered application, ready to migrate or serve.
pub struct Application {
    registry: ModuleRegistry,
    pool: Option<DbPool>,
}

impl Application {
    /// Connect the configured backend and register every module.
    pub async fn build(settings: &Settings) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();

        let (store, pool): (SharedStore, Option<DbPool>) = match settings.database.backend {
            StoreBackend::Postgres => {
                let pool = libris_db::create_pool(&settings.database)
                    .await
                    .with_context(|| {
                        format!(
                            "failed to connect to {}",
                            settings.database.redacted_url()
                        )
                    })?;
                registry.register_core(Arc::new(DatabaseModule::new(pool.clone())));
                let store: SharedStore = Arc::new(PgBookStore::new(pool.clone()));
                (store, Some(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("using the in-memory book store; records are lost on exit");
                let store: SharedStore = Arc::new(MemoryBookStore::new());
                (store, None)
            }
        };

        Ok(Self::with_store(registry, store, pool))
    }

    /// Register the project modules over an already constructed store.
    pub fn with_store(
        mut registry: ModuleRegistry,
        store: SharedStore,
        pool: Option<DbPool>,
    ) -> Self {
        modules::register_all(&mut registry, store);
        Self { registry, pool }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply pending module migrations. The memory backend has none to apply.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let Some(pool) = &self.pool else {
            tracing::info!("memory backend selected; no migrations to apply");
            return Ok(0);
        };

        let migrations = self.registry.collect_migrations();
        let applied = libris_db::apply_migrations(pool, &migrations)
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, total = migrations.len(), "migrations complete");
        Ok(applied)
    }

    /// Run the full lifecycle: init, migrate, start, serve until a shutdown
    /// signal, then stop every module.
    pub async fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let ctx = InitCtx { settings };

        self.registry.init_all(&ctx).await?;
        self.migrate().await?;
        self.registry.start_all(&ctx).await?;

        let served =
            libris_http::start_server(&self.registry, settings, crate::client::router()).await;

        // Modules are stopped even when the server failed
        let stopped = self.registry.stop_all().await;
        served?;
        stopped?;

        tracing::info!("graceful shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_builds_without_database() {
        let settings = Settings {
            database: libris_kernel::settings::DatabaseSettings {
                backend: StoreBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        };

        let app = Application::build(&settings).await.unwrap();
        assert!(app.registry().get_module("books").is_some());
        assert!(app.registry().get_module("db").is_none());
        assert_eq!(app.migrate().await.unwrap(), 0);
    }
}
