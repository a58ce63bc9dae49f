// [apps/control-plane/src/handlers/audit.rs]
//! =================================================================
//! APARATO: AUDIT TRAIL HANDLER (V4.0)
//! RESPONSABILIDAD: LECTURA DEL RASTRO FORENSE RECIENTE
//! =================================================================

use axum::extract::{Json, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::instrument;

use crate::state::AppState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Endpoint: GET /api/v1/audit?limit=
#[instrument(skip(application_state, filters))]
pub async fn handle_recent_audit(
    State(application_state): State<AppState>,
    Query(filters): Query<AuditQuery>,
) -> impl IntoResponse {
    let events = application_state
        .audit
        .recent(filters.limit.unwrap_or(100).min(1000))
        .await;
    Json(events)
}
