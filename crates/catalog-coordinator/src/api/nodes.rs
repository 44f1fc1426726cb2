use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use catalog_sql::NodeName;

use crate::error::{ApiError, CoordinatorError};

use super::App;

fn parse_node(node: &str) -> Result<NodeName, ApiError> {
    node.parse::<NodeName>()
        .map_err(|_| CoordinatorError::InvalidNode(node.to_string()).into())
}

/// `POST /api/nodes/crash/{node}` (spec §6): simulate a crash by closing
/// that node's pool. 200 on success, 400 for an unknown node name.
pub async fn crash_node(
    State(app): State<Arc<App>>,
    Path(node): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let node = parse_node(&node)?;
    app.broker.crash(node).await;
    app.registry.mark_crashed(node, "simulated crash");
    Ok(Json(serde_json::json!({ "message": format!("{node} node crashed successfully") })))
}

/// `POST /api/nodes/restore/{node}`: reopen the pool; the node monitor's
/// next cycle will confirm liveness and flip the registry back up.
pub async fn restore_node(
    State(app): State<Arc<App>>,
    Path(node): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let node = parse_node(&node)?;
    app.broker.restore(node).await.map_err(|err| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    })?;
    app.registry.mark_up(node);
    Ok(Json(serde_json::json!({ "message": format!("{node} node restored successfully") })))
}
