// [apps/control-plane/src/services/token_authority.rs]
/*!
 * =================================================================
 * APARATO: REGISTRATION TOKEN AUTHORITY (V10.0 - AT-MOST-ONCE)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EMISIÓN Y CONSUMO ARBITRADO DE LLAVES DE ENROLAMIENTO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EMBEDDED HMAC: El valor del token transporta su propia etiqueta
 *    HMAC sobre un identificador aleatorio; un valor forjado se rechaza
 *    antes de tocar la bóveda.
 * 2. SERIALIZED CONSUME: El candado asíncrono serializa 'consume'
 *    contra sí mismo: para un token de un solo uso, exactamente una
 *    invocación concurrente retorna true.
 * 3. MIRROR DISCIPLINE: La RAM arbitra; el espejo durable es
 *    write-through de mejor esfuerzo.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use legator_domain_models::token::RegistrationToken;
use legator_infra_db::repositories::TokenRepository;
use rand::RngCore;
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Vigencia "sin expiración": 100 años.
const NO_EXPIRY_YEARS: i64 = 100;

/// Opciones de emisión de un token.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub multi_use: bool,
    pub no_expiry: bool,
}

pub struct TokenAuthority {
    /// Secreto del servidor para la etiqueta embebida.
    token_secret: Vec<u8>,
    /// Vigencia por defecto en minutos.
    default_ttl_minutes: i64,
    /// URL pública para renderizar comandos de instalación.
    server_url: String,
    /// Bóveda en RAM: valor -> token. El candado serializa el consumo.
    vault: Mutex<HashMap<String, RegistrationToken>>,
    /// Espejo durable write-through (opcional).
    durable_mirror: Option<Arc<TokenRepository>>,
}

impl TokenAuthority {
    pub fn new(
        token_secret: Vec<u8>,
        default_ttl_minutes: i64,
        server_url: String,
        durable_mirror: Option<Arc<TokenRepository>>,
    ) -> Self {
        Self {
            token_secret,
            default_ttl_minutes,
            server_url,
            vault: Mutex::new(HashMap::new()),
            durable_mirror,
        }
    }

    /// URL pública configurada del plano de control.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Hidratación masiva desde el espejo durable durante la ignición.
    pub async fn hydrate(&self, tokens: Vec<RegistrationToken>) {
        let mut vault_guard = self.vault.lock().await;
        let hydrated_count = tokens.len();
        for token in tokens {
            vault_guard.insert(token.value.clone(), token);
        }
        if hydrated_count > 0 {
            info!("💾 [TOKEN_AUTHORITY]: {} tokens hydrated from durable mirror.", hydrated_count);
        }
    }

    /**
     * Emite un token fresco con etiqueta HMAC embebida.
     * TTL por defecto de 30 minutos; 'no_expiry' extiende a 100 años.
     */
    #[instrument(skip(self))]
    pub async fn generate(&self, options: GenerateOptions) -> RegistrationToken {
        let mut token_id_material = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut token_id_material);
        let token_id_hex = hex::encode(token_id_material);

        let embedded_tag = self.compute_embedded_tag(&token_id_hex);
        let token_value = format!("lgt_{}.{}", token_id_hex, embedded_tag);

        let now = Utc::now();
        let expires_at = if options.no_expiry {
            now + Duration::days(365 * NO_EXPIRY_YEARS)
        } else {
            now + Duration::minutes(self.default_ttl_minutes)
        };

        let token = RegistrationToken {
            value: token_value,
            created_at: now,
            expires_at,
            used: false,
            multi_use: options.multi_use,
        };

        {
            let mut vault_guard = self.vault.lock().await;
            vault_guard.insert(token.value.clone(), token.clone());
        }
        self.mirror_upsert(&token).await;

        info!("🎟️ [TOKEN_AUTHORITY]: Token issued (multi_use={}, expires={}).",
            token.multi_use, token.expires_at);
        token
    }

    /**
     * Consume un token. Retorna true si y sólo si el token existe, su
     * etiqueta embebida es legítima, no venció y (no usado O multi-uso).
     * Para tokens de un solo uso el candado garantiza at-most-once.
     */
    #[instrument(skip(self, token_value))]
    pub async fn consume(&self, token_value: &str) -> bool {
        // 1. VETO CRIPTOGRÁFICO: Etiqueta embebida antes de tocar la bóveda.
        if !self.verify_embedded_tag(token_value) {
            debug!("🎟️ [TOKEN_AUTHORITY]: Forged or malformed token rejected.");
            return false;
        }

        // 2. ARBITRAJE SERIALIZADO EN LA BÓVEDA.
        let consumed_snapshot = {
            let mut vault_guard = self.vault.lock().await;
            let Some(token) = vault_guard.get_mut(token_value) else {
                return false;
            };

            if !token.is_consumable(Utc::now()) {
                return false;
            }

            if !token.multi_use {
                token.used = true;
                Some(token.clone())
            } else {
                None
            }
        };

        // 3. WRITE-THROUGH FUERA DEL CANDADO (mejor esfuerzo).
        if let Some(snapshot) = consumed_snapshot {
            if let Some(mirror) = &self.durable_mirror {
                if let Err(persistence_fault) = mirror.mark_used(&snapshot.value).await {
                    warn!("⚠️ [TOKEN_MIRROR]: Consume write-through failed: {}", persistence_fault);
                }
            }
        }

        true
    }

    /// Tokens aún consumibles, más nuevos primero.
    pub async fn list_active(&self) -> Vec<RegistrationToken> {
        let now = Utc::now();
        let vault_guard = self.vault.lock().await;
        let mut active: Vec<RegistrationToken> = vault_guard
            .values()
            .filter(|token| token.is_consumable(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active
    }

    /// Cardinalidad de tokens activos.
    pub async fn count(&self) -> usize {
        let now = Utc::now();
        let vault_guard = self.vault.lock().await;
        vault_guard.values().filter(|token| token.is_consumable(now)).count()
    }

    // --- MOTOR CRIPTOGRÁFICO INTERNO ---

    fn compute_embedded_tag(&self, token_id_hex: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.token_secret)
            .expect("HMAC accepts keys of any size");
        mac.update(token_id_hex.as_bytes());
        hex::encode(&mac.finalize().into_bytes()[..16])
    }

    fn verify_embedded_tag(&self, token_value: &str) -> bool {
        let Some(material) = token_value.strip_prefix("lgt_") else {
            return false;
        };
        let Some((token_id_hex, attached_tag)) = material.split_once('.') else {
            return false;
        };

        let Ok(attached_bytes) = hex::decode(attached_tag) else {
            return false;
        };

        let mut mac = HmacSha256::new_from_slice(&self.token_secret)
            .expect("HMAC accepts keys of any size");
        mac.update(token_id_hex.as_bytes());
        let expected = mac.finalize().into_bytes();

        // Comparación de tiempo constante sobre la etiqueta truncada.
        if attached_bytes.len() != 16 {
            return false;
        }
        let mut divergence: u8 = 0;
        for (expected_byte, attached_byte) in expected[..16].iter().zip(attached_bytes.iter()) {
            divergence |= expected_byte ^ attached_byte;
        }
        divergence == 0
    }

    async fn mirror_upsert(&self, token: &RegistrationToken) {
        if let Some(mirror) = &self.durable_mirror {
            if let Err(persistence_fault) = mirror.upsert(token).await {
                warn!("⚠️ [TOKEN_MIRROR]: Write-through failed: {}", persistence_fault);
            }
        }
    }
}
