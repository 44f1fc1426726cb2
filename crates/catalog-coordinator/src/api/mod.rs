//! HTTP surface (spec §6): a thin axum layer over C1/C2/C4. Handlers never
//! hold business logic themselves -- they extract, delegate to the
//! coordinator/broker/registry, and map the result to a status code.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::broker::ConnectionBroker;
use crate::registry::NodeRegistry;

mod games;
mod health;
mod nodes;
mod pending;

pub use crate::error::ApiError;

/// Shared state handed to every handler via `State<Arc<App>>`.
pub struct App {
    pub registry: Arc<NodeRegistry>,
    pub broker: Arc<ConnectionBroker>,
}

pub fn build_router(registry: Arc<NodeRegistry>, broker: Arc<ConnectionBroker>) -> Router {
    let app = Arc::new(App { registry, broker });

    Router::new()
        .route("/api/games", post(games::create_game))
        .route("/api/games/sample", post(games::create_sample_game))
        .route("/api/nodes/crash/:node", post(nodes::crash_node))
        .route("/api/nodes/restore/:node", post(nodes::restore_node))
        .route("/api/health", get(health::get_health))
        .route("/api/pending", get(pending::get_pending))
        .with_state(app)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
