// ABOUTME: JSON route handlers for graph structure, epochs, and mutations
// ABOUTME: Maps engine errors onto 400/500 responses with an error body

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::state::AppState;
use crate::engine::{EpochRecord, GraphStructure, NodeId};
use crate::parser::deserialize_node_id;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
pub struct AddNodeBody {
    #[serde(deserialize_with = "deserialize_node_id")]
    pub id: NodeId,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddEdgeBody {
    #[serde(deserialize_with = "deserialize_node_id")]
    pub source: NodeId,
    #[serde(deserialize_with = "deserialize_node_id")]
    pub target: NodeId,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

fn bad_request(rejection: JsonRejection) -> (StatusCode, Json<Value>) {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /graph_structure
pub async fn graph_structure(State(state): State<Arc<AppState>>) -> Json<GraphStructure> {
    Json(state.engine.structure().await)
}

// GET /graph_epochs
pub async fn graph_epochs(State(state): State<Arc<AppState>>) -> Json<Vec<EpochRecord>> {
    Json(state.engine.epochs().await)
}

// POST /process_epoch
//
// The epoch runs on its own task so a client disconnect cannot cancel it
// halfway through.
pub async fn process_epoch(State(state): State<Arc<AppState>>) -> ApiResult {
    let engine = Arc::clone(&state.engine);
    let outcome = tokio::spawn(async move { engine.process_epoch().await }).await;

    match outcome {
        Ok(Ok(epoch)) => Ok(Json(json!({
            "status": "epoch processed",
            "epoch": epoch,
        }))),
        Ok(Err(e)) => {
            warn!("Epoch rejected: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!("Epoch task failed: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// POST /add_node
pub async fn add_node(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AddNodeBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(bad_request)?;

    state
        .engine
        .add_node(body.id.clone(), body.command)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    info!(node = %body.id, "Node added");
    Ok(Json(json!({ "status": "success" })))
}

// POST /add_edge
pub async fn add_edge(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AddEdgeBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(bad_request)?;

    state
        .engine
        .add_edge(body.source.clone(), body.target.clone())
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    info!(source = %body.source, target = %body.target, "Edge added");
    Ok(Json(json!({ "status": "success" })))
}
