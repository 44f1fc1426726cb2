use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use catalog_sql::NodeName;

use super::App;

/// `GET /api/health` (spec §6): per-node `{status, connection}`, always 200.
/// `status` reflects the registry's last-known liveness; `connection` is a
/// fresh ping so a flapping node shows up even between monitor cycles.
pub async fn get_health(State(app): State<Arc<App>>) -> Json<serde_json::Value> {
    let mut body = serde_json::Map::new();
    for node in NodeName::ALL {
        let connection = app.broker.ping(node).await.is_ok();
        let status = if app.registry.is_up(node) { "up" } else { "down" };
        body.insert(
            node.as_str().to_string(),
            serde_json::json!({ "status": status, "connection": connection }),
        );
    }
    Json(serde_json::Value::Object(body))
}
