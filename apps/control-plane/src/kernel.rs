// [apps/control-plane/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE SOVEREIGN KERNEL (V14.0 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios.
 * La persistencia es opcional: un fallo del enlace durable degrada el
 * sistema a RAM con advertencia registrada, nunca aborta la ignición.
 * =================================================================
 */

use std::time::Duration;

use legator_infra_db::repositories::{ProbeRepository, TokenRepository};
use legator_infra_db::LedgerClient;
use tracing::{error, info, instrument, warn};

use crate::config::RuntimeConfig;
use crate::errors::ControlError;
use crate::routes::create_control_router;
use crate::services::reaper::spawn_offline_reaper;
use crate::state::approval_queue::ApprovalQueue;
use crate::state::command_tracker::{CommandTracker, TRACKER_REAPER_PERIOD};
use crate::state::AppState;

/// Período del segador de TTL de aprobaciones.
const APPROVAL_REAPER_PERIOD: Duration = Duration::from_secs(30);

pub struct ControlPlaneKernel {
    pub runtime_config: RuntimeConfig,
    pub application_shared_state: AppState,
    /// Emisor de la señal de apagado hacia los daemons.
    shutdown_sender: tokio::sync::watch::Sender<bool>,
}

impl ControlPlaneKernel {
    /**
     * Realiza la ignición del enlace durable (si está configurado) y el
     * cableado completo del estado neural.
     *
     * # Errors:
     * - `ControlError::Config`: Llave de firma inválida.
     */
    #[instrument(skip(runtime_config))]
    pub async fn ignite(runtime_config: RuntimeConfig) -> Result<Self, ControlError> {
        // 1. ENLACE DURABLE OPCIONAL (DEGRADACIÓN A RAM ANTE FALLO)
        let ledger_client = match &runtime_config.data_dir {
            Some(data_dir) => {
                if let Err(io_fault) = std::fs::create_dir_all(data_dir) {
                    warn!("⚠️ [KERNEL]: Data directory unavailable ({}). Falling back to memory.", io_fault);
                    None
                } else {
                    let database_path = data_dir.join("legator.db");
                    match LedgerClient::connect(&database_path.to_string_lossy(), None).await {
                        Ok(client) => Some(client),
                        Err(link_fault) => {
                            warn!("⚠️ [KERNEL]: Durable backing lost ({}). Falling back to memory.", link_fault);
                            None
                        }
                    }
                }
            }
            None => None,
        };

        // 2. ENSAMBLE DEL ESTADO MAESTRO
        let application_state = AppState::assemble(&runtime_config, ledger_client.clone())?;

        // 3. HIDRATACIÓN DESDE EL ESPEJO DURABLE
        if let Some(client) = ledger_client {
            let probe_loader = ProbeRepository::new(client.clone());
            match probe_loader.load_all().await {
                Ok(fleet) => application_state.fleet.hydrate(fleet),
                Err(hydration_fault) => {
                    warn!("⚠️ [KERNEL]: Fleet hydration failed: {}", hydration_fault);
                }
            }

            let token_loader = TokenRepository::new(client);
            match token_loader.load_all().await {
                Ok(tokens) => application_state.tokens.hydrate(tokens).await,
                Err(hydration_fault) => {
                    warn!("⚠️ [KERNEL]: Token hydration failed: {}", hydration_fault);
                }
            }
        }

        let (shutdown_sender, _) = tokio::sync::watch::channel(false);

        Ok(Self {
            runtime_config,
            application_shared_state: application_state,
            shutdown_sender,
        })
    }

    /**
     * Lanza los daemons de mantenimiento y el transporte HTTP principal.
     */
    pub async fn launch_sovereign_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. DAEMONS DE MANTENIMIENTO TÁCTICO ---

        // A. Segador de sondas sin pulso (30s / umbral 60s)
        spawn_offline_reaper(
            shared_application_state.fleet.clone(),
            self.shutdown_sender.subscribe(),
        );

        // B. Segador de retención del tracker (órdenes jamás respondidas)
        CommandTracker::spawn_retention_reaper(
            shared_application_state.tracker.clone(),
            TRACKER_REAPER_PERIOD,
            self.shutdown_sender.subscribe(),
        );

        // C. Segador de TTL de aprobaciones
        ApprovalQueue::spawn_ttl_reaper(
            shared_application_state.approvals.clone(),
            APPROVAL_REAPER_PERIOD,
            self.shutdown_sender.subscribe(),
        );

        // --- 2. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let control_router = create_control_router(shared_application_state);
        let bind_address = self.runtime_config.listen_addr;

        info!("🚀 [KERNEL_ONLINE]: Legator control plane listening at {}", bind_address);

        let tcp_listener = match tokio::net::TcpListener::bind(bind_address).await {
            Ok(listener) => listener,
            Err(bind_fault) => {
                error!("💀 [KERNEL_COLLAPSE]: Failed to bind network port: {}", bind_fault);
                std::process::exit(1);
            }
        };

        if let Err(server_error) = axum::serve(tcp_listener, control_router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            let _ = self.shutdown_sender.send(true);
            std::process::exit(1);
        }

        let _ = self.shutdown_sender.send(true);
    }
}
