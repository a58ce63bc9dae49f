// [libs/infra/client/src/errors.rs]
//! =================================================================
//! APARATO: OPERATOR CLIENT ERRORS (V3.0)
//! RESPONSABILIDAD: CATALOGACIÓN DE FALLOS DE COMUNICACIÓN
//! =================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("NETWORK_UNREACHABLE: Failed to connect to control plane: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("ENVELOPE_CORRUPTION: Failed to decode server response: {0}")]
    DecodingFault(#[from] serde_json::Error),

    #[error("COMMAND_REJECTION: Server returned status {status}: {body}")]
    ServerRejection { status: u16, body: String },

    #[error("IDENTITY_REVOKED: Operator token invalid or expired")]
    Unauthorized,
}
