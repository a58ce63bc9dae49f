// [libs/domain/cortex/src/errors.rs]
//! =================================================================
//! APARATO: CORTEX ERROR CATALOG (V3.0)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS COGNITIVOS
//! =================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CortexError {
    /// El proveedor de completions no está configurado en el entorno.
    #[error("[L9_CORTEX_FAULT]: PROVIDER_NOT_CONFIGURED")]
    ProviderMissing,

    /// Fallo de red contra el endpoint del proveedor.
    #[error("[L9_CORTEX_FAULT]: PROVIDER_UPLINK_SEVERED -> {0}")]
    ProviderNetwork(#[from] reqwest::Error),

    /// El proveedor respondió con un estado HTTP no exitoso.
    #[error("[L9_CORTEX_FAULT]: PROVIDER_REJECTION -> HTTP_{0}")]
    ProviderRejection(u16),

    /// La respuesta del proveedor no contiene una completion utilizable.
    #[error("[L9_CORTEX_FAULT]: COMPLETION_ENVELOPE_CORRUPTED -> {0}")]
    MalformedCompletion(String),
}
