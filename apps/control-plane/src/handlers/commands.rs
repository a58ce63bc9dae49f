// [apps/control-plane/src/handlers/commands.rs]
/*!
 * =================================================================
 * APARATO: COMMAND & APPROVAL HANDLER (V15.0 - DISPATCH SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: DESPACHO POR SONDA/ETIQUETA Y VEREDICTOS HUMANOS
 * =================================================================
 */

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use legator_domain_models::approval::{ApprovalDecision, ApprovalRequest};
use legator_domain_models::command::{CommandResult, CommandSpec};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::ControlError;
use crate::services::dispatcher::{DispatchOutcome, ResumedDispatchReport};
use crate::state::AppState;

/// Flags de despacho individuales.
#[derive(Deserialize)]
pub struct DispatchQuery {
    /// Espera el resultado terminal (default true).
    pub wait: Option<bool>,
    /// Fuerza transmisión incremental de salida.
    pub stream: Option<bool>,
}

/// Payload de despacho grupal por etiqueta.
#[derive(Deserialize)]
pub struct GroupDispatchPayload {
    pub tag: String,
    #[serde(flatten)]
    pub spec: CommandSpec,
}

/// Filtros del listado de aprobaciones.
#[derive(Deserialize)]
pub struct ApprovalListQuery {
    /// Incluye expedientes terminales.
    pub all: Option<bool>,
    pub limit: Option<usize>,
}

/// Veredicto del operador sobre un expediente.
#[derive(Deserialize)]
pub struct DecisionPayload {
    pub decision: ApprovalDecision,
    pub decided_by: String,
}

/// Sobre de respuesta de un veredicto: expediente sellado + envío
/// reanudado (presente sólo cuando este veredicto disparó el envío).
#[derive(Serialize)]
pub struct DecisionResponseEnvelope {
    pub approval: ApprovalRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<ResumedDispatchReport>,
}

/// Sobre de respuesta de un despacho individual.
#[derive(Serialize)]
pub struct DispatchResponseEnvelope {
    /// "completed", "accepted" o "pending_approval".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
}

pub struct CommandDispatchHandler;

impl CommandDispatchHandler {
    /**
     * Endpoint: POST /api/v1/probes/:id/command?wait=&stream=
     *
     * # Errors:
     * - `NOT_FOUND`: Sonda inexistente.
     * - `CONFLICT` (NOT_CONNECTED): Sin sesión viva.
     * - `FORBIDDEN` / `REQUEST_TIMEOUT`: Compuerta de aprobación.
     * - `GATEWAY_TIMEOUT`: Resultado fuera de presupuesto.
     */
    #[instrument(skip(application_state, command_spec, flags), fields(probe = %probe_id, command = %command_spec.command))]
    pub async fn handle_probe_dispatch(
        State(application_state): State<AppState>,
        Path(probe_id): Path<String>,
        Query(flags): Query<DispatchQuery>,
        Json(mut command_spec): Json<CommandSpec>,
    ) -> Result<impl IntoResponse, ControlError> {
        if command_spec.command.trim().is_empty() {
            return Err(ControlError::BadRequest("command is required".into()));
        }

        if flags.stream.unwrap_or(false) {
            command_spec.stream = true;
        }
        let wait = flags.wait.unwrap_or(true);

        let outcome = application_state
            .dispatcher
            .dispatch(&probe_id, command_spec, wait, "operator")
            .await?;

        Ok(match outcome {
            DispatchOutcome::Completed(result) => (
                StatusCode::OK,
                Json(DispatchResponseEnvelope {
                    status: "completed".into(),
                    request_id: Some(result.request_id.clone()),
                    approval_id: None,
                    result: Some(result),
                }),
            ),
            DispatchOutcome::Accepted { request_id } => (
                StatusCode::ACCEPTED,
                Json(DispatchResponseEnvelope {
                    status: "accepted".into(),
                    request_id: Some(request_id),
                    approval_id: None,
                    result: None,
                }),
            ),
            DispatchOutcome::PendingApproval { approval_id } => (
                StatusCode::ACCEPTED,
                Json(DispatchResponseEnvelope {
                    status: "pending_approval".into(),
                    request_id: None,
                    approval_id: Some(approval_id),
                    result: None,
                }),
            ),
        })
    }

    /**
     * Endpoint: POST /api/v1/fleet/command
     * Despacho grupal por etiqueta, sin fan-in de espera.
     */
    #[instrument(skip(application_state, group_payload), fields(tag = %group_payload.tag))]
    pub async fn handle_group_dispatch(
        State(application_state): State<AppState>,
        Json(group_payload): Json<GroupDispatchPayload>,
    ) -> Result<impl IntoResponse, ControlError> {
        if group_payload.spec.command.trim().is_empty() {
            return Err(ControlError::BadRequest("command is required".into()));
        }

        let report = application_state
            .dispatcher
            .dispatch_group(&group_payload.tag, group_payload.spec, "operator")
            .await;

        Ok(Json(report))
    }

    /// Endpoint: GET /api/v1/commands (órdenes en vuelo)
    #[instrument(skip(application_state))]
    pub async fn handle_list_in_flight(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        Json(application_state.tracker.list_pending())
    }

    // --- SUPERFICIE DE APROBACIONES ---

    /// Endpoint: GET /api/v1/approvals?all=&limit=
    #[instrument(skip(application_state, filters))]
    pub async fn handle_list_approvals(
        State(application_state): State<AppState>,
        Query(filters): Query<ApprovalListQuery>,
    ) -> impl IntoResponse {
        let requests = if filters.all.unwrap_or(false) {
            application_state.approvals.all(filters.limit.unwrap_or(100))
        } else {
            application_state.approvals.pending()
        };
        Json(requests)
    }

    /// Endpoint: GET /api/v1/approvals/:id
    #[instrument(skip(application_state))]
    pub async fn handle_get_approval(
        State(application_state): State<AppState>,
        Path(approval_id): Path<String>,
    ) -> Result<impl IntoResponse, ControlError> {
        let request = application_state
            .approvals
            .get(&approval_id)
            .ok_or_else(|| ControlError::NotFound(format!("approval {}", approval_id)))?;
        Ok(Json(request))
    }

    /**
     * Endpoint: POST /api/v1/approvals/:id/decide
     *
     * Sella el veredicto terminal y completa el circuito aprobar->enviar:
     * cuando el solicitante original no quedó esperando (respuesta 202 o
     * despacho grupal), la aprobación dispara aquí la transmisión de la
     * orden retenida y el reporte viaja en 'dispatch'.
     */
    #[instrument(skip(application_state, decision_payload), fields(approval = %approval_id, decided_by = %decision_payload.decided_by))]
    pub async fn handle_decide_approval(
        State(application_state): State<AppState>,
        Path(approval_id): Path<String>,
        Json(decision_payload): Json<DecisionPayload>,
    ) -> Result<impl IntoResponse, ControlError> {
        if decision_payload.decided_by.trim().is_empty() {
            return Err(ControlError::BadRequest("decided_by is required".into()));
        }

        let (approval, dispatch) = application_state
            .dispatcher
            .resolve_approval(
                &approval_id,
                decision_payload.decision,
                &decision_payload.decided_by,
            )
            .await?;

        Ok(Json(DecisionResponseEnvelope { approval, dispatch }))
    }
}
