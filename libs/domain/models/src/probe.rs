// [libs/domain/models/src/probe.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN PROBE CONTRACT (V9.0 - FLEET SYNC)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DEL ESTADO CANÓNICO DE UNA SONDA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATE SOVEREIGNTY: El registro de flota es el único propietario de
 *    las mutaciones de este estado; aquí sólo se define el contrato.
 * 2. POLICY ORDERING: 'PolicyLevel' deriva Ord para que la comparación
 *    observe < diagnose < remediate sea una operación del dominio.
 * 3. HEALTH CACHE: El reporte de salud viaja embebido en el estado para
 *    lecturas O(1) desde el Dashboard y la CLI.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::wire::InventoryFrame;

/// Estado operativo de una sonda dentro de la rejilla de vigilancia.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Registrada pero sin sesión ni latido confirmado.
    Pending,
    /// Latido reciente y salud dentro de los parámetros nominales.
    Online,
    /// Latido reciente pero salud comprometida.
    Degraded,
    /// Sin latido dentro del umbral del segador (Reaper).
    Offline,
}

impl ProbeStatus {
    /// Rango de preferencia para la resolución de identidad por hostname.
    /// online > degraded > pending > offline.
    pub fn rank(&self) -> u8 {
        match self {
            ProbeStatus::Online => 3,
            ProbeStatus::Degraded => 2,
            ProbeStatus::Pending => 1,
            ProbeStatus::Offline => 0,
        }
    }
}

/// Nivel de capacidad autorizado para una sonda.
/// El orden de las variantes define la jerarquía de autorización.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PolicyLevel {
    /// Sólo lectura: inspección pasiva del host.
    Observe,
    /// Diagnóstico: comandos de inspección activa sin mutación.
    Diagnose,
    /// Remediación: mutaciones de estado del host autorizadas.
    Remediate,
}

impl Default for PolicyLevel {
    fn default() -> Self {
        PolicyLevel::Observe
    }
}

/// Banda semántica derivada del puntaje de salud (0-100).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    /// Puntaje >= 80.
    Healthy,
    /// Puntaje >= 50.
    Warning,
    /// Puntaje >= 20.
    Degraded,
    /// Puntaje < 20.
    Critical,
}

/// Reporte de salud cacheado junto al estado de la sonda.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    /// Puntaje agregado 0-100.
    pub score: u8,
    /// Banda semántica correspondiente al puntaje.
    pub band: HealthBand,
    /// Advertencias individuales detectadas por el evaluador.
    pub warnings: Vec<String>,
}

/**
 * Estado canónico de una sonda remota.
 *
 * Invariantes custodiadas por el registro de flota:
 * - `registered_at <= last_seen_at`.
 * - `tags` siempre normalizadas (trim, lowercase, dedupe, orden preservado).
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeState {
    /// Identificador opaco asignado en el registro (>= 40 bits de entropía).
    pub id: String,
    /// Hostname reportado por la sonda (coincidencia exacta en dedupe).
    pub hostname: String,
    /// Sistema operativo reportado.
    pub os: String,
    /// Arquitectura de silicio reportada.
    pub arch: String,
    /// Estado operativo actual.
    pub status: ProbeStatus,
    /// Nivel de autorización vigente.
    pub policy_level: PolicyLevel,
    /// Llave de sesión emitida en el registro (rotada en re-registro).
    pub api_key: String,
    /// Versión del agente reportada en el registro.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Marca de alta en la flota.
    pub registered_at: DateTime<Utc>,
    /// Última señal de vida observada (latido o inventario).
    pub last_seen_at: DateTime<Utc>,
    /// Último inventario reportado por la sonda.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryFrame>,
    /// Etiquetas normalizadas de agrupamiento.
    pub tags: Vec<String>,
    /// Mapeo libre de etiquetas clave-valor del operador.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
    /// Reporte de salud cacheado del último latido.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
}

/**
 * Normaliza una colección de etiquetas: trim, minúsculas, deduplicación
 * con preservación del orden de inserción. Las etiquetas vacías se descartan.
 */
pub fn normalize_tags(raw_tags: &[String]) -> Vec<String> {
    let mut normalized_collection: Vec<String> = Vec::with_capacity(raw_tags.len());

    for raw_tag in raw_tags {
        let canonical_tag = raw_tag.trim().to_lowercase();
        if canonical_tag.is_empty() {
            continue;
        }
        if !normalized_collection.contains(&canonical_tag) {
            normalized_collection.push(canonical_tag);
        }
    }

    normalized_collection
}
