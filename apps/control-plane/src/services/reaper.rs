// [apps/control-plane/src/services/reaper.rs]
/*!
 * =================================================================
 * APARATO: OFFLINE REAPER DAEMON (V5.0 - STALENESS SWEEP)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: BARRIDO PERIÓDICO DE SONDAS SIN PULSO
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::info;

use crate::state::fleet_store::FleetStore;

/// Período del barrido de obsolescencia.
const REAPER_PERIOD: StdDuration = StdDuration::from_secs(30);

/// Umbral de silencio que transiciona una sonda a offline.
const STALENESS_THRESHOLD_SECONDS: i64 = 60;

/**
 * Despliega el daemon segador de la flota en el runtime de Tokio.
 * Cada tick invoca el barrido con umbral de 60 segundos; el daemon se
 * detiene cuando la señal de apagado transiciona a true.
 */
pub fn spawn_offline_reaper(
    fleet: Arc<FleetStore>,
    mut shutdown_signal: tokio::sync::watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut staleness_ticker = tokio::time::interval(REAPER_PERIOD);
        info!("💀 [OFFLINE_REAPER]: Staleness daemon initiated.");

        loop {
            tokio::select! {
                _ = staleness_ticker.tick() => {
                    let reaped = fleet.mark_offline(Duration::seconds(STALENESS_THRESHOLD_SECONDS)).await;
                    if !reaped.is_empty() {
                        info!("💀 [OFFLINE_REAPER]: {} probes flipped offline: {:?}", reaped.len(), reaped);
                    }
                }
                _ = shutdown_signal.changed() => {
                    if *shutdown_signal.borrow() {
                        info!("🛑 [OFFLINE_REAPER]: Shutdown signal observed.");
                        break;
                    }
                }
            }
        }
    });
}
