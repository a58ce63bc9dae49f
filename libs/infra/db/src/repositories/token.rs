// [libs/infra/db/src/repositories/token.rs]
/*!
 * =================================================================
 * APARATO: REGISTRATION TOKEN REPOSITORY (V6.0 - ATOMIC CONSUME)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ESPEJO DURABLE DE LLAVES DE ENROLAMIENTO
 *
 * # Logic:
 * El marcado de uso es un UPDATE condicional: sólo transiciona si el
 * token no estaba usado, devolviendo la cantidad de filas afectadas.
 * La autoridad de tokens serializa el consumo en memoria; este espejo
 * añade durabilidad, no arbitraje.
 * =================================================================
 */

use crate::errors::DbError;
use crate::LedgerClient;
use legator_domain_models::token::RegistrationToken;
use libsql::params;
use tracing::{instrument, warn};

pub struct TokenRepository {
    database_client: LedgerClient,
}

impl TokenRepository {
    #[must_use]
    pub fn new(database_client: LedgerClient) -> Self {
        Self { database_client }
    }

    /// Cristaliza (o reemplaza) el documento de un token emitido.
    #[instrument(skip(self, token))]
    pub async fn upsert(&self, token: &RegistrationToken) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let token_document = serde_json::to_string(token)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        connection.execute(
            r#"
            INSERT INTO registration_tokens (value, used, multi_use, expires_at, document, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(value) DO UPDATE SET
                used = excluded.used,
                document = excluded.document
            "#,
            params![
                token.value.clone(),
                if token.used { 1 } else { 0 },
                if token.multi_use { 1 } else { 0 },
                token.expires_at.to_rfc3339(),
                token_document,
                token.created_at.to_rfc3339(),
            ],
        ).await?;

        Ok(())
    }

    /**
     * Marca un token de un solo uso como consumido de forma atómica.
     * Retorna true si esta invocación ganó la transición.
     */
    #[instrument(skip(self))]
    pub async fn mark_used(&self, token_value: &str) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;

        let affected_rows = connection.execute(
            "UPDATE registration_tokens SET used = 1 WHERE value = ?1 AND used = 0",
            params![token_value.to_string()],
        ).await?;

        Ok(affected_rows > 0)
    }

    /// Hidrata todos los tokens persistidos (activos y consumidos).
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<RegistrationToken>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection.query("SELECT document FROM registration_tokens", ()).await?;

        let mut hydrated_tokens = Vec::new();
        while let Some(row) = rows.next().await? {
            let document: String = row.get(0)?;
            match serde_json::from_str::<RegistrationToken>(&document) {
                Ok(token) => hydrated_tokens.push(token),
                Err(decode_fault) => {
                    warn!("⚠️ [TOKEN_MIRROR]: Discarding corrupted token document: {}", decode_fault);
                }
            }
        }

        Ok(hydrated_tokens)
    }

    /// Purga tokens vencidos del espejo durable.
    #[instrument(skip(self))]
    pub async fn delete_expired(&self, now_rfc3339: &str) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let purged = connection.execute(
            "DELETE FROM registration_tokens WHERE expires_at < ?1",
            params![now_rfc3339.to_string()],
        ).await?;
        Ok(purged)
    }
}
