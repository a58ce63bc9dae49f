// [libs/domain/models/src/wire.rs]
/*!
 * =================================================================
 * APARATO: SESSION WIRE CONTRACT (V12.0 - ENVELOPE SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE SOBRES Y TRAMAS DEL TÚNEL DE SONDAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TYPE DISCRIMINATION: 'SessionFrame' transporta el discriminador de
 *    tipo junto al payload JSON opaco, permitiendo el ruteo O(1) en el
 *    hub de conexiones sin deserialización anticipada.
 * 2. LIVENESS SEMANTICS: Tanto el latido como el inventario refrescan
 *    'last_seen_at' en el registro de flota (inventario implica vida).
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discriminador de tipo de trama en el túnel bidireccional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionFrameType {
    /// Biometría periódica de la sonda.
    Heartbeat,
    /// Instantánea de hardware y servicios del host.
    Inventory,
    /// Orden de mando emitida por el servidor (firmada).
    Command,
    /// Resultado terminal de una orden.
    CommandResult,
    /// Fragmento de salida en streaming.
    OutputChunk,
    /// Actualización de política empujada a la sonda.
    PolicyUpdate,
    /// Directiva de auto-actualización del agente.
    Update,
}

/// Sobre de transporte del túnel de sesión.
/// El payload permanece opaco hasta que el handler lo rutea por tipo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFrame {
    /// Discriminador de ruteo.
    #[serde(rename = "type")]
    pub frame_type: SessionFrameType,
    /// Cuerpo JSON de la trama.
    pub payload: serde_json::Value,
}

impl SessionFrame {
    /// Construye un sobre serializando el payload entregado.
    pub fn enclose<T: Serialize>(frame_type: SessionFrameType, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            frame_type,
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// Pulso biométrico periódico de una sonda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatFrame {
    /// Identificador de la sonda emisora.
    pub probe_id: String,
    /// Promedios de carga (1m, 5m, 15m).
    pub load: [f64; 3],
    /// Memoria utilizada en bytes.
    pub mem_used: u64,
    /// Memoria total en bytes.
    pub mem_total: u64,
    /// Disco utilizado en bytes.
    pub disk_used: u64,
    /// Disco total en bytes.
    pub disk_total: u64,
}

/// Instantánea de inventario del host gestionado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryFrame {
    /// Identificador de la sonda emisora.
    pub probe_id: String,
    /// Hostname del host gestionado.
    pub hostname: String,
    /// Sistema operativo.
    pub os: String,
    /// Arquitectura de silicio.
    pub arch: String,
    /// Versión de kernel.
    pub kernel: String,
    /// Núcleos de CPU disponibles.
    pub cpus: u32,
    /// Memoria total en bytes.
    pub mem_total: u64,
    /// Disco total en bytes.
    pub disk_total: u64,
    /// Servicios detectados y su estado.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<HashMap<String, String>>,
    /// Marca de tiempo de la recolección en la sonda.
    pub collected_at: DateTime<Utc>,
}
