// [apps/control-plane/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: OPERATOR AUTHENTICATION GUARD (V8.0)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DEL TOKEN BEARER DE OPERADOR
 *
 * # Logic:
 * El guard protege la superficie de operador. El enrolamiento (token
 * propio), la sesión de sondas (api_key propia) y los endpoints de
 * vida quedan fuera de su jurisdicción.
 * =================================================================
 */

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::state::AppState;

/**
 * Guardia de Operador: exige 'Authorization: Bearer <token>'.
 */
pub async fn operator_guard(
    State(application_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header_content = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok());

    let presented_token = match auth_header_content {
        Some(header_value) if header_value.starts_with("Bearer ") => &header_value[7..],
        _ => {
            warn!("❌ [OPERATOR_GUARD]: Missing or malformed Authorization header.");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    if presented_token != application_state.operator_token {
        warn!("❌ [OPERATOR_GUARD]: Invalid operator token presented.");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
