// [apps/control-plane/src/handlers/probes.rs]
/*!
 * =================================================================
 * APARATO: FLEET LIFECYCLE HANDLER (V13.0 - OPERATOR SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ENROLAMIENTO, GOBERNANZA Y VISTAS DE LA FLOTA
 *
 * # Logic:
 * Las llaves de sesión jamás viajan en las vistas de operador: toda
 * instantánea saliente se redacta antes de serializar.
 * =================================================================
 */

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use legator_domain_models::probe::{PolicyLevel, ProbeState, ProbeStatus};
use legator_domain_models::registration::RegistrationRequest;
use legator_domain_models::wire::{SessionFrame, SessionFrameType};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::errors::ControlError;
use crate::state::AppState;

/// Payload de ajuste de política.
#[derive(Deserialize)]
pub struct PolicyUpdatePayload {
    pub level: PolicyLevel,
}

/// Payload de reemplazo de etiquetas.
#[derive(Deserialize)]
pub struct TagsUpdatePayload {
    pub tags: Vec<String>,
}

/// Filtros del reporte de inventario.
#[derive(Deserialize)]
pub struct InventoryQuery {
    pub tag: Option<String>,
    pub status: Option<String>,
}

/// Parámetros de la purga de sondas offline.
#[derive(Deserialize)]
pub struct CleanupQuery {
    pub ttl_minutes: Option<i64>,
}

/// Resumen agregado de la flota para el HUD del operador.
#[derive(Serialize)]
pub struct FleetSummaryEnvelope {
    pub total_probes: usize,
    pub status_counts: HashMap<String, usize>,
    pub tag_counts: HashMap<String, usize>,
    pub connected_sessions: usize,
    pub in_flight_commands: usize,
    pub pending_approvals: usize,
}

pub struct FleetLifecycleHandler;

impl FleetLifecycleHandler {
    /**
     * Endpoint: POST /api/v1/probes/register
     * Enrolamiento con token; abierto (la compuerta es el propio token).
     */
    #[instrument(skip(application_state, registration_payload), fields(hostname = %registration_payload.hostname))]
    pub async fn handle_registration(
        State(application_state): State<AppState>,
        Json(registration_payload): Json<RegistrationRequest>,
    ) -> Result<impl IntoResponse, ControlError> {
        let receipt = application_state.registrar.register(registration_payload).await?;
        Ok((StatusCode::CREATED, Json(receipt)))
    }

    /// Endpoint: GET /api/v1/probes
    #[instrument(skip(application_state))]
    pub async fn handle_list_probes(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        let fleet_view: Vec<ProbeState> = application_state
            .fleet
            .list()
            .into_iter()
            .map(redact_session_key)
            .collect();
        Json(fleet_view)
    }

    /// Endpoint: GET /api/v1/probes/:id
    #[instrument(skip(application_state))]
    pub async fn handle_get_probe(
        State(application_state): State<AppState>,
        Path(probe_id): Path<String>,
    ) -> Result<impl IntoResponse, ControlError> {
        let probe = application_state
            .fleet
            .get(&probe_id)
            .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;
        Ok(Json(redact_session_key(probe)))
    }

    /// Endpoint: DELETE /api/v1/probes/:id
    #[instrument(skip(application_state))]
    pub async fn handle_delete_probe(
        State(application_state): State<AppState>,
        Path(probe_id): Path<String>,
    ) -> Result<impl IntoResponse, ControlError> {
        if application_state.fleet.delete(&probe_id).await {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(ControlError::NotFound(format!("probe {}", probe_id)))
        }
    }

    /// Endpoint: POST /api/v1/probes/:id/policy
    #[instrument(skip(application_state, policy_payload))]
    pub async fn handle_set_policy(
        State(application_state): State<AppState>,
        Path(probe_id): Path<String>,
        Json(policy_payload): Json<PolicyUpdatePayload>,
    ) -> Result<impl IntoResponse, ControlError> {
        let updated = application_state
            .fleet
            .set_policy(&probe_id, policy_payload.level)
            .await?;

        // Empuje de mejor esfuerzo hacia la sesión viva de la sonda.
        if let Ok(frame) = SessionFrame::enclose(
            SessionFrameType::PolicyUpdate,
            &json!({ "level": policy_payload.level }),
        ) {
            if let Err(push_fault) = application_state.hub.send_to(&probe_id, frame).await {
                debug!("💤 [FLEET]: Policy push skipped for {}: {}", probe_id, push_fault);
            }
        }

        Ok(Json(redact_session_key(updated)))
    }

    /**
     * Endpoint: POST /api/v1/fleet/cleanup?ttl_minutes=
     * Purga sondas offline más antiguas que el TTL (default 24h).
     */
    #[instrument(skip(application_state, filters))]
    pub async fn handle_fleet_cleanup(
        State(application_state): State<AppState>,
        Query(filters): Query<CleanupQuery>,
    ) -> impl IntoResponse {
        let ttl_minutes = filters.ttl_minutes.unwrap_or(24 * 60).max(1);
        let purged = application_state
            .fleet
            .cleanup_offline(chrono::Duration::minutes(ttl_minutes))
            .await;
        Json(json!({ "purged": purged, "ttl_minutes": ttl_minutes }))
    }

    /// Endpoint: POST /api/v1/probes/:id/tags
    #[instrument(skip(application_state, tags_payload))]
    pub async fn handle_set_tags(
        State(application_state): State<AppState>,
        Path(probe_id): Path<String>,
        Json(tags_payload): Json<TagsUpdatePayload>,
    ) -> Result<impl IntoResponse, ControlError> {
        let updated = application_state
            .fleet
            .set_tags(&probe_id, &tags_payload.tags)
            .await?;
        Ok(Json(redact_session_key(updated)))
    }

    /// Endpoint: GET /api/v1/fleet
    #[instrument(skip(application_state))]
    pub async fn handle_fleet_summary(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        let status_counts = application_state.fleet.count_by_status();
        let total_probes = status_counts.values().sum();

        Json(FleetSummaryEnvelope {
            total_probes,
            status_counts,
            tag_counts: application_state.fleet.tag_counts(),
            connected_sessions: application_state.hub.connected().len(),
            in_flight_commands: application_state.tracker.in_flight(),
            pending_approvals: application_state.approvals.pending_count(),
        })
    }

    /**
     * Endpoint: GET /api/v1/fleet/inventory?tag=&status=
     * Filtro por etiqueta Y estado; agregados sobre el conjunto filtrado.
     */
    #[instrument(skip(application_state, filters))]
    pub async fn handle_fleet_inventory(
        State(application_state): State<AppState>,
        Query(filters): Query<InventoryQuery>,
    ) -> Result<impl IntoResponse, ControlError> {
        let status_filter = match filters.status.as_deref() {
            None | Some("") => None,
            Some("pending") => Some(ProbeStatus::Pending),
            Some("online") => Some(ProbeStatus::Online),
            Some("degraded") => Some(ProbeStatus::Degraded),
            Some("offline") => Some(ProbeStatus::Offline),
            Some(unknown) => {
                return Err(ControlError::BadRequest(format!("unknown status filter '{}'", unknown)));
            }
        };

        let report = application_state
            .fleet
            .inventory(filters.tag.as_deref(), status_filter);
        Ok(Json(report))
    }
}

/// Redacta la llave de sesión antes de exponer una instantánea.
fn redact_session_key(mut probe: ProbeState) -> ProbeState {
    probe.api_key = String::new();
    probe
}
