// [libs/domain/models/src/audit.rs]
//! =================================================================
//! APARATO: AUDIT EVENT CONTRACT (V4.0)
//! RESPONSABILIDAD: RASTRO FORENSE APPEND-ONLY DEL PLANO DE CONTROL
//! =================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Evento de auditoría emitido por el núcleo hacia el sumidero configurado.
/// La forma de persistencia es responsabilidad del sumidero, no del núcleo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Tipo semántico: "registered", "re-registered", "command_sent", etc.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Sonda involucrada, si aplica.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_id: Option<String>,
    /// Actor que originó la acción.
    pub actor: String,
    /// Resumen legible para el operador.
    pub summary: String,
    /// Detalle estructurado opcional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    /// Marca de emisión.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Forja un evento con marca temporal presente.
    pub fn now(event_type: &str, probe_id: Option<&str>, actor: &str, summary: String) -> Self {
        Self {
            event_type: event_type.to_string(),
            probe_id: probe_id.map(str::to_string),
            actor: actor.to_string(),
            summary,
            detail: None,
            timestamp: Utc::now(),
        }
    }
}
