// [libs/infra/client/src/lib.rs]
//! =================================================================
//! APARATO: OPERATOR CLIENT LIBRARY BARREL (V3.0)
//! RESPONSABILIDAD: EXPOSICIÓN PÚBLICA DEL UPLINK DE OPERADOR
//! =================================================================

pub mod client;
pub mod errors;

pub use client::{CommandDispatchOutcome, FleetSummary, OperatorClient, TokenCreateOptions};
pub use errors::ClientError;
