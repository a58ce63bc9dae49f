// [apps/control-plane/src/handlers/chat.rs]
/*!
 * =================================================================
 * APARATO: TASK CHAT HANDLER (V6.0)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: PUENTE HTTP HACIA EL BUCLE DE TAREAS LLM
 * =================================================================
 */

use axum::extract::{Json, State};
use legator_domain_cortex::provider::ChatMessage;
use serde::Deserialize;
use tracing::instrument;

use crate::errors::ControlError;
use crate::services::task_runner::TaskReply;
use crate::state::AppState;

/// Turno de conversación entregado por el operador.
#[derive(Deserialize)]
pub struct ChatTurnPayload {
    /// Historial completo de la conversación (el servidor lo recorta).
    pub messages: Vec<ChatMessage>,
}

/**
 * Endpoint: POST /api/v1/chat
 *
 * # Errors:
 * - `CONFIG_FAULT`: Proveedor LLM no configurado en el entorno.
 */
#[instrument(skip(application_state, chat_payload), fields(turns = chat_payload.messages.len()))]
pub async fn handle_chat_turn(
    State(application_state): State<AppState>,
    Json(chat_payload): Json<ChatTurnPayload>,
) -> Result<Json<TaskReply>, ControlError> {
    if chat_payload.messages.is_empty() {
        return Err(ControlError::BadRequest("messages must not be empty".into()));
    }

    let reply = application_state
        .task_runner
        .respond(chat_payload.messages)
        .await?;

    Ok(Json(reply))
}
