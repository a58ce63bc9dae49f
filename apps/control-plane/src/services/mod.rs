// [apps/control-plane/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE ORCHESTRATION HUB (V9.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE SERVICIOS Y DAEMONS
 *
 * # Topología de Módulos:
 * - audit:           Sumideros del rastro forense (trait + memoria + ledger).
 * - dispatcher:      Política -> aprobación -> envío -> resultado.
 * - reaper:          Barrido periódico de sondas sin pulso.
 * - registrar:       Enrolamiento y rotación de llaves de sonda.
 * - signer:          Firma HMAC de sobres de mando.
 * - task_runner:     Bucle acotado plan/observación sobre LLM.
 * - token_authority: Emisión y consumo arbitrado de tokens.
 * =================================================================
 */

pub mod audit;
pub mod dispatcher;
pub mod reaper;
pub mod registrar;
pub mod signer;
pub mod task_runner;
pub mod token_authority;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS) ---

pub use audit::{AuditSink, LedgerAuditSink, MemoryAuditSink};
pub use dispatcher::{CommandDispatcher, DispatchOutcome, GroupDispatchEntry, ResumedDispatchReport};
pub use reaper::spawn_offline_reaper;
pub use registrar::RegistrationService;
pub use signer::EnvelopeSigner;
pub use task_runner::{TaskReply, TaskRunnerService};
pub use token_authority::{GenerateOptions, TokenAuthority};
