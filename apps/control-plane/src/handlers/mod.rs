// [apps/control-plane/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER ORCHESTRATION HUB (V10.0 - COMPLETE MATRIX)
 * CLASIFICACIÓN: APPLICATION ADAPTERS (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE PUNTOS DE ENTRADA
 *
 * # Topología de Módulos:
 * - audit:    Lectura del rastro forense reciente.
 * - chat:     Puente HTTP del bucle de tareas LLM.
 * - commands: Despacho por sonda/etiqueta y veredictos de aprobación.
 * - probes:   Enrolamiento, gobernanza y vistas de flota.
 * - session:  Túnel WebSocket autenticado de cada sonda.
 * - stream:   Eventos SSE de fragmentos de salida.
 * - tokens:   Emisión y listado de llaves de enrolamiento.
 * =================================================================
 */

pub mod audit;
pub mod chat;
pub mod commands;
pub mod probes;
pub mod session;
pub mod stream;
pub mod tokens;
