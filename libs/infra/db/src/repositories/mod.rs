// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V5.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SUBSISTEMAS DE PERSISTENCIA
 *
 * # Topología de Módulos:
 * - probe: Estado canónico de la flota (write-through del registro).
 * - audit: Rastro forense append-only del plano de control.
 * - token: Llaves de enrolamiento con consumo atómico.
 * =================================================================
 */

/// Persistencia del estado canónico de sondas.
pub mod probe;
/// Rastro forense append-only.
pub mod audit;
/// Llaves de enrolamiento y su consumo atómico.
pub mod token;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use audit::AuditRepository;
pub use probe::ProbeRepository;
pub use token::TokenRepository;
