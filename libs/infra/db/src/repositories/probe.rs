// [libs/infra/db/src/repositories/probe.rs]
/*!
 * =================================================================
 * APARATO: PROBE FLEET REPOSITORY (V7.0 - WRITE-THROUGH READY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DOCUMENTAL DEL ESTADO DE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DOCUMENT UPSERT: Cada mutación del registro de flota se espeja
 *    como un documento JSON completo; la RAM permanece autoritativa.
 * 2. BULK HYDRATION: Al arrancar, la flota entera se carga en una sola
 *    ráfaga hacia el registro en memoria.
 * =================================================================
 */

use crate::errors::DbError;
use crate::LedgerClient;
use legator_domain_models::probe::ProbeState;
use libsql::params;
use tracing::{debug, instrument, warn};

/**
 * Repositorio de autoridad única para el espejo durable de la flota.
 */
pub struct ProbeRepository {
    database_client: LedgerClient,
}

impl ProbeRepository {
    #[must_use]
    pub fn new(database_client: LedgerClient) -> Self {
        Self { database_client }
    }

    /**
     * Cristaliza (o reemplaza) el documento completo de una sonda.
     *
     * # Errors:
     * - `DbError::ConnectionError`: Si el enlace físico se interrumpe.
     * - `DbError::QueryError`: Si el esquema presenta deriva.
     */
    #[instrument(skip(self, probe), fields(probe = %probe.id))]
    pub async fn upsert(&self, probe: &ProbeState) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let probe_document = serde_json::to_string(probe)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let upsert_sql = r#"
            INSERT INTO probes (id, hostname, status, document, last_seen_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                hostname = excluded.hostname,
                status = excluded.status,
                document = excluded.document,
                last_seen_at = excluded.last_seen_at,
                updated_at = CURRENT_TIMESTAMP
        "#;

        connection.execute(upsert_sql, params![
            probe.id.clone(),
            probe.hostname.clone(),
            serde_json::to_string(&probe.status)
                .map_err(|fault| DbError::MappingError(fault.to_string()))?
                .trim_matches('"')
                .to_string(),
            probe_document,
            probe.last_seen_at.to_rfc3339(),
        ]).await?;

        debug!("💾 [FLEET_MIRROR]: Probe document crystallized.");
        Ok(())
    }

    /**
     * Hidrata la flota completa desde el espejo durable.
     * Los documentos corruptos se descartan con advertencia (no abortan
     * el arranque del plano de control).
     */
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<ProbeState>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection.query("SELECT id, document FROM probes", ()).await?;

        let mut hydrated_fleet = Vec::new();
        while let Some(row) = rows.next().await? {
            let probe_identifier: String = row.get(0)?;
            let document: String = row.get(1)?;

            match serde_json::from_str::<ProbeState>(&document) {
                Ok(probe) => hydrated_fleet.push(probe),
                Err(decode_fault) => {
                    warn!("⚠️ [FLEET_MIRROR]: Discarding corrupted document for probe {}: {}",
                        probe_identifier, decode_fault);
                }
            }
        }

        Ok(hydrated_fleet)
    }

    /// Elimina el documento de una sonda dada de baja.
    #[instrument(skip(self))]
    pub async fn delete(&self, probe_id: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection.execute("DELETE FROM probes WHERE id = ?1", params![probe_id.to_string()]).await?;
        Ok(())
    }
}
