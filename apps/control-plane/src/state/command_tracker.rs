// [apps/control-plane/src/state/command_tracker.rs]
/*!
 * =================================================================
 * APARATO: COMMAND TRACKER (V11.0 - RENDEZVOUS CERTIFIED)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: CORRELACIÓN DE ÓRDENES EN VUELO CON SUS RESULTADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE-SLOT RENDEZVOUS: Cada orden rastreada posee un canal con un
 *    único slot; 'complete' entrega y remueve en la misma operación.
 * 2. CANCEL BY DROP: Cancelar remueve la entrada; el emisor dropeado
 *    cierra el canal y el consumidor observa la cancelación.
 * 3. LEAK SHIELD: Un segador de retención purga entradas de sondas que
 *    jamás respondieron.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use legator_domain_models::command::CommandResult;
use legator_domain_models::probe::PolicyLevel;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::errors::ControlError;

/// Período por defecto del segador de retención.
pub const TRACKER_REAPER_PERIOD: StdDuration = StdDuration::from_secs(120);

/// Instantánea observable de una orden en vuelo.
#[derive(Debug, Clone, Serialize)]
pub struct PendingCommand {
    pub request_id: String,
    pub probe_id: String,
    pub command: String,
    pub level: PolicyLevel,
    pub started_at: DateTime<Utc>,
}

struct TrackedEntry {
    descriptor: PendingCommand,
    result_lane: mpsc::Sender<CommandResult>,
}

pub struct CommandTracker {
    /// Mapa request_id -> entrada en vuelo. Propiedad exclusiva del tracker.
    in_flight: Mutex<HashMap<String, TrackedEntry>>,
    /// Retención máxima antes del segado de una entrada sin respuesta.
    retention: Duration,
}

impl CommandTracker {
    pub fn new(retention: Duration) -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /**
     * Registra una orden en vuelo y entrega el receptor del resultado.
     * Un request_id ya presente se reemplaza (reenvío de la misma orden);
     * el consumidor anterior observa el cierre de su canal.
     */
    #[instrument(skip(self))]
    pub fn track(
        &self,
        request_id: &str,
        probe_id: &str,
        command: &str,
        level: PolicyLevel,
    ) -> mpsc::Receiver<CommandResult> {
        let (result_sender, result_receiver) = mpsc::channel::<CommandResult>(1);

        let entry = TrackedEntry {
            descriptor: PendingCommand {
                request_id: request_id.to_string(),
                probe_id: probe_id.to_string(),
                command: command.to_string(),
                level,
                started_at: Utc::now(),
            },
            result_lane: result_sender,
        };

        let mut in_flight_guard = self.in_flight.lock().expect("LOCK_POISONED");
        if in_flight_guard.insert(request_id.to_string(), entry).is_some() {
            debug!("♻️ [TRACKER]: Request {} re-tracked (resubmission).", request_id);
        }

        result_receiver
    }

    /**
     * Entrega el resultado terminal y remueve la entrada.
     *
     * # Errors:
     * - `ControlError::UnknownRequest`: Correlador desconocido (ya
     *   completado, cancelado o jamás rastreado).
     */
    #[instrument(skip(self, result), fields(request = %request_id))]
    pub fn complete(&self, request_id: &str, result: CommandResult) -> Result<(), ControlError> {
        let entry = {
            let mut in_flight_guard = self.in_flight.lock().expect("LOCK_POISONED");
            in_flight_guard
                .remove(request_id)
                .ok_or_else(|| ControlError::UnknownRequest(request_id.to_string()))?
        };

        // El canal posee un slot y esta es la única entrega: try_send sólo
        // falla si el consumidor abandonó, lo cual no es un error del hub.
        if entry.result_lane.try_send(result).is_err() {
            debug!("💤 [TRACKER]: Result for {} delivered into the void (caller gone).", request_id);
        }

        Ok(())
    }

    /// Cancela una orden en vuelo. El consumidor observa el canal cerrado.
    #[instrument(skip(self))]
    pub fn cancel(&self, request_id: &str) {
        let mut in_flight_guard = self.in_flight.lock().expect("LOCK_POISONED");
        if in_flight_guard.remove(request_id).is_some() {
            debug!("🛑 [TRACKER]: Request {} cancelled.", request_id);
        }
    }

    /// Cardinalidad de órdenes en vuelo.
    pub fn in_flight(&self) -> usize {
        let in_flight_guard = self.in_flight.lock().expect("LOCK_POISONED");
        in_flight_guard.len()
    }

    /// Instantáneas de todas las órdenes en vuelo.
    pub fn list_pending(&self) -> Vec<PendingCommand> {
        let in_flight_guard = self.in_flight.lock().expect("LOCK_POISONED");
        let mut pending: Vec<PendingCommand> = in_flight_guard
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        pending.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        pending
    }

    /// Purga entradas más antiguas que la retención configurada.
    pub fn reap_stale(&self) -> usize {
        let expiration_boundary = Utc::now() - self.retention;
        let mut in_flight_guard = self.in_flight.lock().expect("LOCK_POISONED");
        let before = in_flight_guard.len();
        in_flight_guard.retain(|_, entry| entry.descriptor.started_at >= expiration_boundary);
        before - in_flight_guard.len()
    }

    /**
     * Despliega el daemon de retención. Se detiene cuando la señal de
     * apagado transiciona a true.
     */
    pub fn spawn_retention_reaper(
        tracker: Arc<CommandTracker>,
        period: StdDuration,
        mut shutdown_signal: tokio::sync::watch::Receiver<bool>,
    ) {
        tokio::spawn(async move {
            let mut retention_ticker = tokio::time::interval(period);
            info!("💀 [TRACKER_REAPER]: Retention daemon initiated.");

            loop {
                tokio::select! {
                    _ = retention_ticker.tick() => {
                        let reaped_count = tracker.reap_stale();
                        if reaped_count > 0 {
                            info!("💀 [TRACKER_REAPER]: Evicted {} unanswered commands.", reaped_count);
                        }
                    }
                    _ = shutdown_signal.changed() => {
                        if *shutdown_signal.borrow() {
                            info!("🛑 [TRACKER_REAPER]: Shutdown signal observed.");
                            break;
                        }
                    }
                }
            }
        });
    }
}
