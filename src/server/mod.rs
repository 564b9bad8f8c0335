// ABOUTME: HTTP adapter exposing a graph engine over JSON routes
// ABOUTME: Exports the axum router, shared state, and the listening server

pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::GraphEngine;

pub use state::AppState;

/// Build the router serving `engine`
pub fn router(engine: Arc<GraphEngine>) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/health", get(routes::health))
        .route("/graph_structure", get(routes::graph_structure))
        .route("/graph_epochs", get(routes::graph_epochs))
        .route("/process_epoch", post(routes::process_epoch))
        .route("/add_node", post(routes::add_node))
        .route("/add_edge", post(routes::add_edge))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct GraphServer {
    bind: String,
    engine: Arc<GraphEngine>,
}

impl GraphServer {
    pub fn new(bind: impl Into<String>, engine: Arc<GraphEngine>) -> Self {
        Self {
            bind: bind.into(),
            engine,
        }
    }

    /// Serve until `shutdown` resolves, letting in-flight requests finish
    pub async fn run<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.engine.clone());

        let listener = TcpListener::bind(&self.bind).await?;
        info!(bind = %self.bind, "Graph server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Graph server shut down");
        Ok(())
    }
}
