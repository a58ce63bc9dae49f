// [libs/infra/db/src/repositories/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT TRAIL REPOSITORY (V5.0 - APPEND ONLY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RASTRO FORENSE ACÍDICO DEL PLANO DE CONTROL
 * =================================================================
 */

use crate::errors::DbError;
use crate::LedgerClient;
use legator_domain_models::audit::AuditEvent;
use libsql::params;
use tracing::{instrument, warn};

pub struct AuditRepository {
    database_client: LedgerClient,
}

impl AuditRepository {
    #[must_use]
    pub fn new(database_client: LedgerClient) -> Self {
        Self { database_client }
    }

    /// Anexa un evento al rastro forense. Nunca muta registros previos.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn append(&self, event: &AuditEvent) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let event_document = serde_json::to_string(event)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        connection.execute(
            r#"
            INSERT INTO audit_events (event_type, probe_id, actor, summary, document, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                event.event_type.clone(),
                event.probe_id.clone(),
                event.actor.clone(),
                event.summary.clone(),
                event_document,
                event.timestamp.to_rfc3339(),
            ],
        ).await?;

        Ok(())
    }

    /// Recupera los eventos más recientes en orden cronológico inverso.
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection.query(
            "SELECT document FROM audit_events ORDER BY seq DESC LIMIT ?1",
            params![limit as i64],
        ).await?;

        let mut recovered_events = Vec::new();
        while let Some(row) = rows.next().await? {
            let document: String = row.get(0)?;
            match serde_json::from_str::<AuditEvent>(&document) {
                Ok(event) => recovered_events.push(event),
                Err(decode_fault) => {
                    warn!("⚠️ [AUDIT_MIRROR]: Discarding corrupted audit document: {}", decode_fault);
                }
            }
        }

        Ok(recovered_events)
    }
}
