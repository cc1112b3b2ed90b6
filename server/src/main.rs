//! Concord Server - HTTP document API with ETag optimistic concurrency.
//!
//! Documents are read with their entity tag, replaced only under a matching
//! `If-Match`, and can be reconciled server-side with a bounded retry loop
//! driven by a conflict policy.

mod auth;
mod config;
mod db;
mod diagnostics;
mod error;
mod handlers;
mod routes;
mod seed;

use crate::config::Config;
use crate::diagnostics::TracingSink;
use axum::Router;
use concord_engine::{ConflictResolver, DocumentStore, MemoryStore, Schema};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub schema: Arc<Schema>,
    /// Which backend `store` is, for the health check
    pub store_kind: &'static str,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config, store_kind: &'static str) -> Self {
        Self {
            store,
            schema: Arc::new(config.containers.clone()),
            config: Arc::new(config),
            store_kind,
        }
    }

    /// Resolver over the shared store, logging through `tracing`.
    pub fn resolver(&self) -> ConflictResolver<dyn DocumentStore> {
        ConflictResolver::new(Arc::clone(&self.store))
            .with_schema(Arc::clone(&self.schema))
            .with_sink(Arc::new(TracingSink))
    }
}

/// Build the application router with its middleware stack.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
                    .expose_headers([axum::http::header::ETAG]),
            ),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concord_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Concord Server on {}:{}", config.host, config.port);

    let (store, store_kind): (Arc<dyn DocumentStore>, &'static str) = match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(database_url, config.store_timeout).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;

            (Arc::new(db::PgStore::new(pool, config.store_timeout)), "postgres")
        }
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory only");
            (Arc::new(MemoryStore::new()), "memory")
        }
    };

    if config.seed_demo_data {
        let created = seed::seed_demo_data(store.as_ref(), &config.containers).await?;
        tracing::info!("Seeded {} demo documents", created);
    }

    let addr = format!("{}:{}", config.host, config.port);
    let app = build_app(AppState::new(store, config, store_kind));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
