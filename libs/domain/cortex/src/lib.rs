// [libs/domain/cortex/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LEGATOR COGNITIVE CORTEX (V4.0 - DUAL ENGINE)
 * CLASIFICACIÓN: DOMAIN LIBRARY (ESTRATO L9)
 * RESPONSABILIDAD: DECISIÓN PURA (SALUD/RIESGO) Y SINAPSIS LLM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE CORE: Los motores de salud y riesgo son funciones puras sin
 *    estado ni reloj, certificables en el Proving Grounds sin mocks.
 * 2. PROVIDER SEAM: El bucle de tareas del plano de control depende del
 *    trait 'CompletionProvider', nunca del adaptador concreto.
 * =================================================================
 */

pub mod errors;
pub mod health;
pub mod provider;
pub mod risk;
pub mod toolcall;

pub use errors::CortexError;
pub use health::evaluate_probe_health;
pub use provider::{ChatMessage, ChatRole, CompletionProvider, OpenAiCompatProvider};
pub use risk::{classify_risk, needs_approval, required_policy_level};
pub use toolcall::{extract_tool_call, ToolCall};
