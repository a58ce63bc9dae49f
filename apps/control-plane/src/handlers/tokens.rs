// [apps/control-plane/src/handlers/tokens.rs]
/*!
 * =================================================================
 * APARATO: TOKEN ISSUANCE HANDLER (V7.0)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EMISIÓN Y LISTADO DE LLAVES DE ENROLAMIENTO
 * =================================================================
 */

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use legator_domain_models::token::RegistrationToken;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::services::token_authority::GenerateOptions;
use crate::state::AppState;

/// Opciones de emisión aceptadas del operador.
#[derive(Deserialize, Default)]
pub struct TokenCreatePayload {
    #[serde(default)]
    pub multi_use: bool,
    #[serde(default)]
    pub no_expiry: bool,
}

/// Sobre devuelto al emitir: token + comando de instalación renderizado.
#[derive(Serialize)]
pub struct TokenIssueEnvelope {
    pub token: RegistrationToken,
    pub install_command: String,
}

pub struct TokenIssuanceHandler;

impl TokenIssuanceHandler {
    /// Endpoint: POST /api/v1/tokens
    #[instrument(skip(application_state, create_payload))]
    pub async fn handle_create_token(
        State(application_state): State<AppState>,
        Json(create_payload): Json<TokenCreatePayload>,
    ) -> impl IntoResponse {
        let token = application_state
            .tokens
            .generate(GenerateOptions {
                multi_use: create_payload.multi_use,
                no_expiry: create_payload.no_expiry,
            })
            .await;

        let install_command = token.install_command(application_state.tokens.server_url());

        (StatusCode::CREATED, Json(TokenIssueEnvelope { token, install_command }))
    }

    /// Endpoint: GET /api/v1/tokens (sólo activos)
    #[instrument(skip(application_state))]
    pub async fn handle_list_tokens(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        Json(application_state.tokens.list_active().await)
    }
}
