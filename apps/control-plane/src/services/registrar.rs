// [apps/control-plane/src/services/registrar.rs]
/*!
 * =================================================================
 * APARATO: PROBE REGISTRAR (V12.0 - HOSTNAME DEDUP CERTIFIED)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ENROLAMIENTO DE SONDAS Y ROTACIÓN DE LLAVES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDENTITY STABILITY: El re-registro por hostname preserva el
 *    probe_id y ROTA la api_key; os/arch/tags se refrescan.
 * 2. ENTROPY FLOOR: Identificadores acuñados con >= 40 bits de
 *    entropía; llaves de sesión de 32 bytes aleatorios.
 * =================================================================
 */

use std::sync::Arc;

use chrono::Utc;
use legator_domain_models::audit::AuditEvent;
use legator_domain_models::probe::{normalize_tags, PolicyLevel, ProbeState, ProbeStatus};
use legator_domain_models::registration::{RegistrationReceipt, RegistrationRequest};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use tracing::{info, instrument};

use crate::errors::ControlError;
use crate::services::audit::AuditSink;
use crate::services::token_authority::TokenAuthority;
use crate::state::fleet_store::FleetStore;

/// Token de política aplicado en el enrolamiento.
const DEFAULT_POLICY_ID: &str = "default-observe";

/// Longitud del sufijo aleatorio del probe_id (62^10 > 2^59).
const PROBE_ID_SUFFIX_LENGTH: usize = 10;

pub struct RegistrationService {
    fleet: Arc<FleetStore>,
    token_authority: Arc<TokenAuthority>,
    audit_sink: Arc<dyn AuditSink>,
}

impl RegistrationService {
    pub fn new(
        fleet: Arc<FleetStore>,
        token_authority: Arc<TokenAuthority>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self { fleet, token_authority, audit_sink }
    }

    /**
     * Ejecuta el enrolamiento completo de una sonda.
     *
     * # Errors:
     * - `ControlError::BadRequest`: Hostname vacío.
     * - `ControlError::Unauthorized`: Token rechazado por la autoridad.
     */
    #[instrument(skip(self, request), fields(hostname = %request.hostname))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<RegistrationReceipt, ControlError> {
        // 1. VALIDACIÓN DE PAYLOAD
        if request.hostname.trim().is_empty() {
            return Err(ControlError::BadRequest("hostname is required".into()));
        }

        // 2. CONSUMO DEL TOKEN DE ENROLAMIENTO
        if !self.token_authority.consume(&request.token).await {
            return Err(ControlError::Unauthorized("registration token rejected".into()));
        }

        // 3. RESOLUCIÓN DE IDENTIDAD POR HOSTNAME (coincidencia exacta)
        let existing_probe = self.fleet.find_by_hostname(&request.hostname);
        let is_re_registration = existing_probe.is_some();

        // 4. MATERIAL DE IDENTIDAD FRESCO
        let fresh_api_key = mint_api_key();
        let now = Utc::now();

        let probe_state = match existing_probe {
            Some(previous) => ProbeState {
                id: previous.id,
                hostname: request.hostname.clone(),
                os: request.os.clone(),
                arch: request.arch.clone(),
                status: previous.status,
                // El nivel de política sólo se aplica en el primer registro.
                policy_level: previous.policy_level,
                api_key: fresh_api_key.clone(),
                version: request.version.clone(),
                registered_at: previous.registered_at,
                last_seen_at: now,
                inventory: previous.inventory,
                tags: normalize_tags(&request.tags),
                labels: previous.labels,
                health: previous.health,
            },
            None => ProbeState {
                id: mint_probe_id(),
                hostname: request.hostname.clone(),
                os: request.os.clone(),
                arch: request.arch.clone(),
                status: ProbeStatus::Pending,
                policy_level: PolicyLevel::Observe,
                api_key: fresh_api_key.clone(),
                version: request.version.clone(),
                registered_at: now,
                last_seen_at: now,
                inventory: None,
                tags: normalize_tags(&request.tags),
                labels: None,
                health: None,
            },
        };

        let probe_id = probe_state.id.clone();

        // 5. SELLADO EN EL REGISTRO DE FLOTA
        self.fleet.register(probe_state).await;

        // 6. RASTRO FORENSE
        let event_type = if is_re_registration { "re-registered" } else { "registered" };
        self.audit_sink
            .record(AuditEvent::now(
                event_type,
                Some(&probe_id),
                "registration",
                format!("probe {} {} as {} ({}/{})",
                    request.hostname, event_type, probe_id, request.os, request.arch),
            ))
            .await;

        info!("🛰️ [REGISTRAR]: Probe {} {} (hostname: {}).", probe_id, event_type, request.hostname);

        Ok(RegistrationReceipt {
            probe_id,
            api_key: fresh_api_key,
            policy_id: DEFAULT_POLICY_ID.to_string(),
        })
    }
}

/// Acuña un identificador de sonda con piso de entropía garantizado.
fn mint_probe_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PROBE_ID_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!("prb-{}", suffix.to_lowercase())
}

/// Acuña una llave de sesión de 32 bytes con prefijo imprimible.
fn mint_api_key() -> String {
    let mut key_material = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key_material);
    format!("lgk_{}", hex::encode(key_material))
}
