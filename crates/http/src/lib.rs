//! HTTP server facade for libris with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{routing::get, Router};

use libris_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod extract;
pub mod response;
pub mod router;

pub use error::AppError;
pub use extract::{ValidatedJson, ValidatedQuery};
pub use response::Envelope;
use router::RouterBuilder;

/// Start the HTTP server and run until SIGINT/SIGTERM
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &Settings,
    pages: Router,
) -> anyhow::Result<()> {
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings, pages).context("failed to build HTTP router")?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to address {}", address))?;

    serve(listener, app, shutdown_signal()).await
}

/// Serve `app` on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    tracing::info!("HTTP server listening on http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped accepting connections");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
///
/// `pages` carries stateless routes served from the root (e.g. the browser
/// client).
pub fn build_router(
    registry: &ModuleRegistry,
    settings: &Settings,
    pages: Router,
) -> anyhow::Result<Router> {
    let mut router_builder = RouterBuilder::new()
        .route("/healthz", get(health_check))
        .merge(pages);

    for module in registry.modules() {
        let mount_path = module.mount_path();

        tracing::info!(
            module = module.name(),
            "mounting module routes under {}",
            mount_path
        );
        router_builder = router_builder.mount_module(&mount_path, module.routes());
    }

    // Global middlewares go on last so they wrap every route above
    let router = router_builder
        .with_openapi(registry)
        .with_timeout(settings.server.request_timeout_ms)
        .with_cors(&settings.server.cors_origins)?
        .with_tracing()
        .with_request_id()
        .build();

    Ok(router)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_and_pages_are_routed() {
        let registry = ModuleRegistry::new();
        let settings = Settings::default();
        let pages = Router::new().route("/", get(|| async { "index" }));
        let app = build_router(&registry, &settings, pages).unwrap();

        let response = app
            .clone()
            .oneshot(axum::http::Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let response = app
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/healthz", get(health_check));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, app, async {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"));
        assert!(raw.ends_with("ok"));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
