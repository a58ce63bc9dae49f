// [libs/domain/models/src/approval.rs]
/*!
 * =================================================================
 * APARATO: APPROVAL CONTRACT (V7.0 - TERMINAL STATES)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: EXPEDIENTES DE APROBACIÓN HUMANA Y NIVELES DE RIESGO
 *
 * # Logic:
 * Un expediente nace 'pending' y transiciona exactamente una vez hacia
 * un estado terminal (approved, denied, expired). Los estados terminales
 * son inmutables; la cola de aprobaciones custodia esa invariante.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::CommandSpec;

/// Clasificación advisoria de riesgo de una orden.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Estado del ciclo de vida de un expediente de aprobación.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// En espera de decisión del operador.
    Pending,
    /// Autorizado: el despachador puede proceder.
    Approved,
    /// Vetado: el despachador debe abortar.
    Denied,
    /// Segado por TTL sin decisión humana.
    Expired,
}

impl ApprovalStatus {
    /// Indica si el estado es terminal (inmutable).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Veredicto explícito de un operador.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Denied => ApprovalStatus::Denied,
        }
    }
}

/// Expediente de aprobación de una orden que excede la política de su sonda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Identificador del expediente.
    pub id: String,
    /// Sonda objetivo de la orden retenida.
    pub probe_id: String,
    /// Payload de la orden retenida (por valor).
    pub command: CommandSpec,
    /// Nota operativa adjunta por el solicitante.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Clasificación de riesgo calculada al encolar.
    pub risk_level: RiskLevel,
    /// Actor que originó la solicitud (operador, llm-task, etc).
    pub origin: String,
    /// Marca de creación del expediente.
    pub created_at: DateTime<Utc>,
    /// Vencimiento del expediente (TTL de la cola).
    pub expires_at: DateTime<Utc>,
    /// Estado vigente del ciclo de vida.
    pub status: ApprovalStatus,
    /// Operador que emitió el veredicto terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    /// Marca temporal del veredicto terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}
