// [libs/domain/models/src/token.rs]
//! =================================================================
//! APARATO: REGISTRATION TOKEN CONTRACT (V5.0)
//! RESPONSABILIDAD: LLAVES DE ENROLAMIENTO DE SONDAS
//! =================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Llave de enrolamiento emitida por la autoridad de tokens.
///
/// El valor es opaco: `lgt_<id hex>.<tag hex>`, donde la etiqueta es un
/// HMAC-SHA256 sobre el identificador con el secreto del servidor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationToken {
    /// Valor opaco entregado al operador.
    pub value: String,
    /// Marca de emisión.
    pub created_at: DateTime<Utc>,
    /// Vencimiento absoluto (wall-clock).
    pub expires_at: DateTime<Utc>,
    /// Consumido (sólo relevante para tokens de un solo uso).
    pub used: bool,
    /// Reutilizable hasta el vencimiento.
    pub multi_use: bool,
}

impl RegistrationToken {
    /// Un token es consumible si no venció y (no fue usado o es multi-uso).
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at && (!self.used || self.multi_use)
    }

    /// Renderiza el comando de instalación de una sonda con este token.
    pub fn install_command(&self, server_url: &str) -> String {
        format!(
            "curl -fsSL {}/install.sh | sh -s -- --server {} --token {}",
            server_url.trim_end_matches('/'),
            server_url.trim_end_matches('/'),
            self.value
        )
    }
}
