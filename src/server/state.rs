// ABOUTME: Shared state handed to every HTTP handler
// ABOUTME: Wraps the single graph engine the server operates on

use std::sync::Arc;

use crate::engine::GraphEngine;

pub struct AppState {
    pub engine: Arc<GraphEngine>,
}
