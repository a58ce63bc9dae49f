// [libs/domain/models/src/registration.rs]
//! =================================================================
//! APARATO: REGISTRATION HANDSHAKE CONTRACT (V6.0)
//! RESPONSABILIDAD: PAYLOADS DEL ENROLAMIENTO DE SONDAS
//! =================================================================

use serde::{Deserialize, Serialize};

/// Solicitud de enrolamiento presentada por una sonda nueva o re-registrada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Token de enrolamiento emitido por la autoridad.
    pub token: String,
    /// Hostname del host gestionado.
    pub hostname: String,
    /// Sistema operativo.
    pub os: String,
    /// Arquitectura de silicio.
    pub arch: String,
    /// Etiquetas iniciales (se normalizan al persistir).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Versión del agente instalado.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Material de identidad devuelto tras un enrolamiento exitoso.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    /// Identidad estable de la sonda (preservada en re-registro).
    pub probe_id: String,
    /// Llave de sesión fresca (rotada en cada registro).
    pub api_key: String,
    /// Token de política inicial aplicado.
    pub policy_id: String,
}
