// [apps/control-plane/src/services/signer.rs]
/*!
 * =================================================================
 * APARATO: ENVELOPE SIGNER (V6.0 - CONSTANT TIME)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: FIRMA HMAC-SHA256 DE SOBRES DE MANDO SALIENTES
 *
 * # Logic:
 * La etiqueta se calcula sobre la forma canónica del sobre (JSON en
 * orden de declaración con el campo de firma ausente). La verificación
 * usa comparación de tiempo constante del propio MAC; nunca una
 * comparación de strings.
 * =================================================================
 */

use hmac::{Hmac, Mac};
use legator_domain_models::command::CommandEnvelope;
use sha2::Sha256;

use crate::errors::ControlError;

type HmacSha256 = Hmac<Sha256>;

/// Longitud mínima del secreto compartido en bytes.
const MINIMUM_SECRET_LENGTH: usize = 32;

pub struct EnvelopeSigner {
    shared_secret: Vec<u8>,
}

impl EnvelopeSigner {
    /**
     * Forja el firmador con el secreto compartido.
     *
     * # Errors:
     * - `ControlError::Config`: Secreto inferior a 32 bytes.
     */
    pub fn new(shared_secret: &[u8]) -> Result<Self, ControlError> {
        if shared_secret.len() < MINIMUM_SECRET_LENGTH {
            return Err(ControlError::Config(format!(
                "SIGNING_KEY_TOO_SHORT: {} bytes (minimum {})",
                shared_secret.len(),
                MINIMUM_SECRET_LENGTH
            )));
        }
        Ok(Self { shared_secret: shared_secret.to_vec() })
    }

    /// Calcula la etiqueta hex del sobre entregado.
    pub fn sign(&self, envelope: &CommandEnvelope) -> Result<String, ControlError> {
        let canonical_bytes = envelope
            .canonical_bytes()
            .map_err(|fault| ControlError::Internal(format!("canonical encode: {}", fault)))?;

        let mut mac = HmacSha256::new_from_slice(&self.shared_secret)
            .map_err(|fault| ControlError::Internal(format!("mac init: {}", fault)))?;
        mac.update(&canonical_bytes);

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Firma y adjunta la etiqueta al sobre (mutación in-place).
    pub fn attach_signature(&self, envelope: &mut CommandEnvelope) -> Result<(), ControlError> {
        let tag = self.sign(envelope)?;
        envelope.signature = Some(tag);
        Ok(())
    }

    /**
     * Verifica la etiqueta adjunta en tiempo constante.
     * Retorna false ante etiqueta ausente, malformada o divergente.
     */
    pub fn verify(&self, envelope: &CommandEnvelope) -> Result<bool, ControlError> {
        let Some(attached_tag) = &envelope.signature else {
            return Ok(false);
        };

        let Ok(tag_bytes) = hex::decode(attached_tag) else {
            return Ok(false);
        };

        let canonical_bytes = envelope
            .canonical_bytes()
            .map_err(|fault| ControlError::Internal(format!("canonical encode: {}", fault)))?;

        let mut mac = HmacSha256::new_from_slice(&self.shared_secret)
            .map_err(|fault| ControlError::Internal(format!("mac init: {}", fault)))?;
        mac.update(&canonical_bytes);

        Ok(mac.verify_slice(&tag_bytes).is_ok())
    }
}
