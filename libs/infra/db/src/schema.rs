// [libs/infra/db/src/schema.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE DATABASE SCHEMA (V6.0 - FLEET STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DOCUMENT COLUMNS: Cada entidad viaja como documento JSON junto a
 *    columnas indexables (llave primaria, hostname, estado).
 * 2. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 3. PERFORMANCE: Índices de aceleración para el barrido de la flota.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Tablas independientes por dominio: flota, auditoría y enrolamiento.
 */
const CONTROL_PLANE_TABLES: &[(&str, &str)] = &[
    ("TABLE_PROBES", r#"
        CREATE TABLE IF NOT EXISTS probes (
            id TEXT PRIMARY KEY,
            hostname TEXT NOT NULL,
            status TEXT NOT NULL,
            document TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_AUDIT_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type TEXT NOT NULL,
            probe_id TEXT,
            actor TEXT NOT NULL,
            summary TEXT NOT NULL,
            document TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_REGISTRATION_TOKENS", r#"
        CREATE TABLE IF NOT EXISTS registration_tokens (
            value TEXT PRIMARY KEY,
            used INTEGER NOT NULL DEFAULT 0,
            multi_use INTEGER NOT NULL DEFAULT 0,
            expires_at DATETIME NOT NULL,
            document TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas existentes se adapten a nuevas capacidades.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    ("PROBE_LAST_SEEN", "ALTER TABLE probes ADD COLUMN last_seen_at DATETIME"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_PROBES_HOSTNAME", "CREATE INDEX IF NOT EXISTS idx_probes_hostname ON probes(hostname);"),
    ("IDX_PROBES_STATUS", "CREATE INDEX IF NOT EXISTS idx_probes_status ON probes(status);"),
    ("IDX_AUDIT_PROBE", "CREATE INDEX IF NOT EXISTS idx_audit_probe ON audit_events(probe_id);"),
    ("IDX_TOKENS_EXPIRY", "CREATE INDEX IF NOT EXISTS idx_tokens_expiry ON registration_tokens(expires_at);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace de persistencia.
 */
#[instrument(skip(database_connection))]
pub async fn apply_control_plane_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V6.0...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Control plane ledger level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in CONTROL_PLANE_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(fault) => {
                let message = fault.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
