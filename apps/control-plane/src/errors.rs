// [apps/control-plane/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE ERROR CATALOG (V8.0 - SEMANTIC TRIAGE)
 * CLASIFICACIÓN: APPLICATION CORE (ESTRATO L4)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL NÚCLEO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BOUNDARY DISCIPLINE: Todo componente del núcleo retorna errores a
 *    su invocador; ningún pánico cruza fronteras de componente.
 * 2. HTTP PROJECTION: El catálogo se proyecta a códigos HTTP en un solo
 *    punto (IntoResponse), manteniendo a los servicios agnósticos del
 *    transporte.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    /// Payload inválido o campos obligatorios ausentes.
    #[error("[L4_CORE_FAULT]: BAD_REQUEST -> {0}")]
    BadRequest(String),

    /// Token de enrolamiento rechazado o credenciales de sonda inválidas.
    #[error("[L4_CORE_FAULT]: UNAUTHORIZED -> {0}")]
    Unauthorized(String),

    /// Sonda, orden o expediente de aprobación inexistente.
    #[error("[L4_CORE_FAULT]: NOT_FOUND -> {0}")]
    NotFound(String),

    /// Intento de mutar un expediente de aprobación ya terminal.
    #[error("[L4_APPROVAL_FAULT]: ALREADY_DECIDED")]
    AlreadyDecided,

    /// La cola de aprobaciones alcanzó su capacidad máxima.
    #[error("[L4_APPROVAL_FAULT]: QUEUE_FULL")]
    Full,

    /// El expediente fue vetado por el operador.
    #[error("[L4_APPROVAL_FAULT]: APPROVAL_DENIED")]
    ApprovalDenied,

    /// El expediente venció sin decisión humana.
    #[error("[L4_APPROVAL_FAULT]: APPROVAL_EXPIRED")]
    ApprovalExpired,

    /// La espera de decisión agotó su presupuesto temporal.
    #[error("[L4_APPROVAL_FAULT]: APPROVAL_WAIT_TIMEOUT")]
    ApprovalTimeout,

    /// No existe sesión viva para la sonda objetivo.
    #[error("[L4_HUB_FAULT]: NOT_CONNECTED -> {0}")]
    NotConnected(String),

    /// El rastreador de órdenes desconoce el correlador entregado.
    #[error("[L4_TRACKER_FAULT]: UNKNOWN_REQUEST -> {0}")]
    UnknownRequest(String),

    /// La espera del resultado agotó su presupuesto temporal.
    #[error("[L4_CORE_FAULT]: GATEWAY_TIMEOUT")]
    Timeout,

    /// El contexto del invocador fue cancelado.
    #[error("[L4_CORE_FAULT]: CANCELLED")]
    Cancelled,

    /// Configuración inválida (llave de firma corta, proveedor ausente).
    #[error("[L4_CONFIG_FAULT]: {0}")]
    Config(String),

    /// Fallo inesperado con detalle opaco.
    #[error("[L4_CORE_FAULT]: INTERNAL -> {0}")]
    Internal(String),
}

impl ControlError {
    /// Código semántico estable para consumidores de la API.
    pub fn code(&self) -> &'static str {
        match self {
            ControlError::BadRequest(_) => "BAD_REQUEST",
            ControlError::Unauthorized(_) => "UNAUTHORIZED",
            ControlError::NotFound(_) => "NOT_FOUND",
            ControlError::AlreadyDecided => "ALREADY_DECIDED",
            ControlError::Full => "QUEUE_FULL",
            ControlError::ApprovalDenied => "APPROVAL_DENIED",
            ControlError::ApprovalExpired => "APPROVAL_EXPIRED",
            ControlError::ApprovalTimeout => "APPROVAL_WAIT_TIMEOUT",
            ControlError::NotConnected(_) => "NOT_CONNECTED",
            ControlError::UnknownRequest(_) => "UNKNOWN_REQUEST",
            ControlError::Timeout => "GATEWAY_TIMEOUT",
            ControlError::Cancelled => "CANCELLED",
            ControlError::Config(_) => "CONFIG_FAULT",
            ControlError::Internal(_) => "INTERNAL_FAULT",
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            ControlError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ControlError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ControlError::NotFound(_) | ControlError::UnknownRequest(_) => StatusCode::NOT_FOUND,
            ControlError::AlreadyDecided => StatusCode::CONFLICT,
            ControlError::Full => StatusCode::TOO_MANY_REQUESTS,
            ControlError::ApprovalDenied => StatusCode::FORBIDDEN,
            ControlError::ApprovalExpired => StatusCode::REQUEST_TIMEOUT,
            ControlError::ApprovalTimeout => StatusCode::REQUEST_TIMEOUT,
            ControlError::NotConnected(_) => StatusCode::CONFLICT,
            ControlError::Timeout | ControlError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            ControlError::Config(_) | ControlError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = Json(json!({
            "error": self.code(),
            "detail": self.to_string(),
        }));
        (status, body).into_response()
    }
}
