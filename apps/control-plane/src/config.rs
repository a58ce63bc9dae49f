// [apps/control-plane/src/config.rs]
/*!
 * =================================================================
 * APARATO: RUNTIME CONFIGURATION LOADER (V6.0 - ENV SOVEREIGN)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: CAPTURA ÚNICA DEL ENTORNO EN UN ARTEFACTO TIPADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE READ: El entorno se lee una vez durante la ignición; el
 *    resto del sistema consume el artefacto inmutable.
 * 2. KEY DISCIPLINE: Claves no reconocidas se ignoran. La llave de
 *    firma ausente se genera aleatoria y se registra para desarrollo;
 *    una llave corta es un fallo de configuración, no un warning.
 * =================================================================
 */

use crate::errors::ControlError;
use rand::RngCore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Coordenadas del proveedor de completions LLM.
#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    /// Nombre nominal del proveedor ("openai", "ollama", gateway interno).
    pub provider: String,
    /// Endpoint raíz compatible con chat/completions.
    pub base_url: String,
    /// Credencial Bearer, si el proveedor la exige.
    pub api_key: Option<String>,
    /// Modelo a invocar.
    pub model: String,
}

/// Configuración completa del plano de control, capturada del entorno.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Dirección de escucha del transporte HTTP.
    pub listen_addr: SocketAddr,
    /// Directorio de datos; None => flota, auditoría y tokens sólo en RAM.
    pub data_dir: Option<PathBuf>,
    /// Llave de firma de sobres (>= 32 bytes).
    pub signing_key: Vec<u8>,
    /// Token Bearer exigido a los operadores.
    pub operator_token: String,
    /// URL pública del servidor para renderizar comandos de instalación.
    pub server_url: String,
    /// Proveedor LLM, si el entorno lo define.
    pub llm: Option<LlmProviderConfig>,
    /// Presupuesto de espera de decisión de aprobación.
    pub approval_wait: Duration,
    /// Vigencia por defecto de los tokens de enrolamiento.
    pub token_ttl_minutes: i64,
    /// Comandos (nombre base) exentos de aprobación humana.
    pub command_allow_list: Vec<String>,
}

impl RuntimeConfig {
    /**
     * Captura el entorno del proceso en un artefacto de configuración.
     *
     * # Errors:
     * - `ControlError::Config`: Llave de firma malformada o corta.
     */
    pub fn from_env() -> Result<Self, ControlError> {
        // 1. COORDENADAS DE RED
        let listening_port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8420".to_string())
            .parse()
            .unwrap_or(8420);

        let listen_addr: SocketAddr = std::env::var("LEGATOR_LISTEN_ADDR")
            .unwrap_or_else(|_| format!("0.0.0.0:{}", listening_port))
            .parse()
            .map_err(|fault| ControlError::Config(format!("LISTEN_ADDR_MALFORMED: {}", fault)))?;

        let server_url = std::env::var("LEGATOR_SERVER_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", listen_addr.port()));

        // 2. ESTRATO DE PERSISTENCIA
        let data_dir = std::env::var("LEGATOR_DATA_DIR").ok().map(PathBuf::from);

        // 3. MATERIAL CRIPTOGRÁFICO DE FIRMA
        let signing_key = match std::env::var("LEGATOR_SIGNING_KEY") {
            Ok(hex_material) => {
                let decoded = hex::decode(hex_material.trim())
                    .map_err(|fault| ControlError::Config(format!("SIGNING_KEY_NOT_HEX: {}", fault)))?;
                if decoded.len() < 32 {
                    return Err(ControlError::Config(format!(
                        "SIGNING_KEY_TOO_SHORT: {} bytes (minimum 32)",
                        decoded.len()
                    )));
                }
                decoded
            }
            Err(_) => {
                let mut generated_key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut generated_key);
                warn!(
                    "🔑 [CONFIG]: LEGATOR_SIGNING_KEY absent. Generated ephemeral key: {}",
                    hex::encode(&generated_key)
                );
                generated_key
            }
        };

        // 4. CREDENCIAL DE OPERADOR
        let operator_token = match std::env::var("LEGATOR_OPERATOR_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => {
                let mut token_material = vec![0u8; 24];
                rand::thread_rng().fill_bytes(&mut token_material);
                let generated_token = hex::encode(token_material);
                warn!(
                    "🔑 [CONFIG]: LEGATOR_OPERATOR_TOKEN absent. Generated ephemeral token: {}",
                    generated_token
                );
                generated_token
            }
        };

        // 5. SINAPSIS LLM (OPCIONAL)
        let llm = match std::env::var("LEGATOR_LLM_PROVIDER") {
            Ok(provider) if !provider.trim().is_empty() => {
                let base_url = std::env::var("LEGATOR_LLM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
                let model = std::env::var("LEGATOR_LLM_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string());
                Some(LlmProviderConfig {
                    provider: provider.trim().to_string(),
                    base_url,
                    api_key: std::env::var("LEGATOR_LLM_API_KEY").ok(),
                    model,
                })
            }
            _ => None,
        };

        // 6. PRESUPUESTOS TEMPORALES
        let approval_wait_seconds: u64 = std::env::var("LEGATOR_APPROVAL_WAIT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(120);

        let token_ttl_minutes: i64 = std::env::var("LEGATOR_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(30);

        // 7. LISTA DE AUTORIZACIÓN DE COMANDOS (separada por comas)
        let command_allow_list: Vec<String> = std::env::var("LEGATOR_COMMAND_ALLOW_LIST")
            .map(|raw| {
                raw.split(',')
                    .map(|entry| entry.trim().to_string())
                    .filter(|entry| !entry.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        info!(
            "🧭 [CONFIG]: Control plane configured. listen={} persistence={} llm={}",
            listen_addr,
            if data_dir.is_some() { "durable" } else { "memory" },
            llm.as_ref().map(|c| c.provider.as_str()).unwrap_or("disabled"),
        );

        Ok(Self {
            listen_addr,
            data_dir,
            signing_key,
            operator_token,
            server_url,
            llm,
            approval_wait: Duration::from_secs(approval_wait_seconds),
            token_ttl_minutes,
            command_allow_list,
        })
    }
}
