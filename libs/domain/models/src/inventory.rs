// [libs/domain/models/src/inventory.rs]
/*!
 * =================================================================
 * APARATO: FLEET INVENTORY CONTRACT (V5.0 - AGGREGATES SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: VISTA AGREGADA DE HARDWARE Y DISTRIBUCIÓN DE FLOTA
 *
 * # Logic:
 * Los agregados se calculan sobre el MISMO conjunto filtrado que la
 * lista de sondas: total_probes == probes.len() para cualquier filtro.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::probe::{HealthReport, PolicyLevel, ProbeStatus};

/// Resumen de inventario de una sonda individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeInventorySummary {
    pub id: String,
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub status: ProbeStatus,
    pub policy_level: PolicyLevel,
    pub tags: Vec<String>,
    /// Núcleos reportados en el último inventario (0 si nunca reportó).
    pub cpus: u32,
    /// Memoria total en bytes del último inventario.
    pub mem_total: u64,
    /// Disco total en bytes del último inventario.
    pub disk_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
}

/// Agregados de flota calculados sobre el conjunto filtrado.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryAggregates {
    /// Cardinalidad del conjunto filtrado.
    pub total_probes: usize,
    /// Sondas con estado 'online' dentro del conjunto.
    pub online_probes: usize,
    /// Suma de núcleos de CPU reportados.
    pub total_cpus: u64,
    /// Suma de memoria total en bytes.
    pub total_memory_bytes: u64,
    /// Distribución de sondas por sistema operativo.
    pub probes_by_os: HashMap<String, usize>,
    /// Distribución de etiquetas dentro del conjunto.
    pub tag_distribution: HashMap<String, usize>,
}

/// Reporte completo de inventario: sondas filtradas + agregados.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetInventoryReport {
    pub probes: Vec<ProbeInventorySummary>,
    pub aggregates: InventoryAggregates,
}
