use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use catalog_sql::{pending, NodeName, PendingTable};

use crate::error::ApiError;

use super::App;

/// `GET /api/pending` (spec §6): counts of `PENDING ∪ FAILED` rows in both
/// queues, read from the master. 500 on any failure, including the master
/// being unreachable -- unlike `/api/games`, this route has no 503 in its
/// documented contract.
pub async fn get_pending(State(app): State<Arc<App>>) -> Result<Json<serde_json::Value>, ApiError> {
    let master = app
        .broker
        .get(&app.registry, NodeName::Master)
        .ok_or_else(|| anyhow::anyhow!("master is down"))?;

    let pending_windows = pending::count_unsynced(&master, PendingTable::Windows).await?;
    let pending_multi_os = pending::count_unsynced(&master, PendingTable::MultiOs).await?;

    Ok(Json(serde_json::json!({
        "pending_windows_games": pending_windows,
        "pending_multi_os_games": pending_multi_os,
    })))
}
