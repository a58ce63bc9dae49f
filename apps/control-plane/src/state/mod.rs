// [apps/control-plane/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V11.0 - CONTROL PLANE)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ESTADO, SERVICIOS Y SINAPSIS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza el cableado de los cuatro dueños de
 *    estado (flota, hub, tracker, aprobaciones) y sus servicios.
 * 2. CAPABILITY SEAMS: El estado transporta 'Arc<dyn AuditSink>' y el
 *    proveedor LLM tras su trait; ningún backend concreto se filtra
 *    a los handlers.
 * =================================================================
 */

pub mod approval_queue;
pub mod command_tracker;
pub mod connection_hub;
pub mod fleet_store;

use std::sync::Arc;

use chrono::Duration;
use legator_domain_cortex::provider::{CompletionProvider, OpenAiCompatProvider};
use legator_infra_db::repositories::{AuditRepository, ProbeRepository, TokenRepository};
use legator_infra_db::LedgerClient;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::errors::ControlError;
use crate::services::audit::{AuditSink, LedgerAuditSink, MemoryAuditSink};
use crate::services::dispatcher::CommandDispatcher;
use crate::services::registrar::RegistrationService;
use crate::services::signer::EnvelopeSigner;
use crate::services::task_runner::TaskRunnerService;
use crate::services::token_authority::TokenAuthority;
use crate::state::approval_queue::{ApprovalQueue, DEFAULT_APPROVAL_TTL_MINUTES, DEFAULT_MAX_PENDING};
use crate::state::command_tracker::CommandTracker;
use crate::state::connection_hub::ConnectionHub;
use crate::state::fleet_store::FleetStore;

/// Retención de órdenes rastreadas sin respuesta (minutos).
const TRACKER_RETENTION_MINUTES: i64 = 10;

/**
 * Contenedor de estado compartido (Thread-Safe) del plano de control.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Registro canónico de la flota de sondas.
    pub fleet: Arc<FleetStore>,
    /// Hub de sesiones vivas y fan-out de streaming.
    pub hub: Arc<ConnectionHub>,
    /// Rastreador de órdenes en vuelo.
    pub tracker: Arc<CommandTracker>,
    /// Cola de aprobaciones humanas.
    pub approvals: Arc<ApprovalQueue>,
    /// Autoridad de tokens de enrolamiento.
    pub tokens: Arc<TokenAuthority>,
    /// Sumidero del rastro forense.
    pub audit: Arc<dyn AuditSink>,
    /// Despachador del pipeline de mando.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Servicio de enrolamiento de sondas.
    pub registrar: Arc<RegistrationService>,
    /// Bucle de tareas LLM.
    pub task_runner: Arc<TaskRunnerService>,
    /// Credencial Bearer exigida a operadores.
    pub operator_token: String,
}

impl AppState {
    /**
     * Forja el estado maestro cableando estado, servicios y espejos.
     *
     * # Errors:
     * - `ControlError::Config`: Llave de firma inválida.
     */
    pub fn assemble(config: &RuntimeConfig, ledger: Option<LedgerClient>) -> Result<Self, ControlError> {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V11.0...");

        // 1. ESPEJOS DURABLES (OPCIONALES)
        let (probe_mirror, token_mirror, audit_sink): (
            Option<Arc<ProbeRepository>>,
            Option<Arc<TokenRepository>>,
            Arc<dyn AuditSink>,
        ) = match ledger {
            Some(client) => (
                Some(Arc::new(ProbeRepository::new(client.clone()))),
                Some(Arc::new(TokenRepository::new(client.clone()))),
                Arc::new(LedgerAuditSink::new(Arc::new(AuditRepository::new(client)))),
            ),
            None => (None, None, Arc::new(MemoryAuditSink::new())),
        };

        // 2. MATERIAL CRIPTOGRÁFICO
        let envelope_signer = Arc::new(EnvelopeSigner::new(&config.signing_key)?);

        // 3. DUEÑOS DE ESTADO
        let fleet = Arc::new(FleetStore::new(probe_mirror));
        let hub = Arc::new(ConnectionHub::new(Some(envelope_signer)));
        let tracker = Arc::new(CommandTracker::new(Duration::minutes(TRACKER_RETENTION_MINUTES)));
        let approvals = Arc::new(ApprovalQueue::new(DEFAULT_MAX_PENDING, DEFAULT_APPROVAL_TTL_MINUTES));
        let tokens = Arc::new(TokenAuthority::new(
            config.signing_key.clone(),
            config.token_ttl_minutes,
            config.server_url.clone(),
            token_mirror,
        ));

        // 4. SERVICIOS DE MANDO
        let dispatcher = Arc::new(CommandDispatcher::new(
            fleet.clone(),
            hub.clone(),
            tracker.clone(),
            approvals.clone(),
            audit_sink.clone(),
            config.approval_wait,
            config.command_allow_list.clone(),
        ));

        let registrar = Arc::new(RegistrationService::new(
            fleet.clone(),
            tokens.clone(),
            audit_sink.clone(),
        ));

        // 5. SINAPSIS LLM (OPCIONAL)
        let completion_provider: Option<Arc<dyn CompletionProvider>> = config.llm.as_ref().map(|llm| {
            info!("🧠 [APP_STATE]: Completion provider '{}' wired (model: {}).", llm.provider, llm.model);
            Arc::new(OpenAiCompatProvider::new(
                llm.provider.clone(),
                llm.base_url.clone(),
                llm.api_key.clone(),
                llm.model.clone(),
            )) as Arc<dyn CompletionProvider>
        });

        let task_runner = Arc::new(TaskRunnerService::new(
            completion_provider,
            dispatcher.clone(),
            fleet.clone(),
        ));

        Ok(Self {
            fleet,
            hub,
            tracker,
            approvals,
            tokens,
            audit: audit_sink,
            dispatcher,
            registrar,
            task_runner,
            operator_token: config.operator_token.clone(),
        })
    }
}
