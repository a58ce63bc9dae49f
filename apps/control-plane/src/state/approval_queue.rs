// [apps/control-plane/src/state/approval_queue.rs]
/*!
 * =================================================================
 * APARATO: HUMAN APPROVAL QUEUE (V14.0 - BROADCAST WAITERS)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: EXPEDIENTES PENDIENTES, ESPERA/NOTIFICACIÓN Y TTL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC TERMINALITY: La transición pending -> terminal ocurre una
 *    única vez bajo el candado; un segundo veredicto recibe
 *    AlreadyDecided. Los estados terminales jamás retroceden.
 * 2. BROADCAST DECISIONS: Los que esperan observan la decisión por un
 *    canal watch; N esperas concurrentes ven el MISMO estado terminal.
 * 3. BOUNDED & TTL'D: Capacidad máxima de pendientes y segador que
 *    transiciona a 'expired' y despierta a los que esperaban.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use legator_domain_models::approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus, RiskLevel};
use legator_domain_models::command::CommandSpec;
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ControlError;

/// Capacidad máxima de expedientes pendientes.
pub const DEFAULT_MAX_PENDING: usize = 500;

/// Vigencia por defecto de un expediente.
pub const DEFAULT_APPROVAL_TTL_MINUTES: i64 = 15;

/// Retención de expedientes terminales antes de su purga (24h).
const TERMINAL_RETENTION_HOURS: i64 = 24;

struct ApprovalSlot {
    request: ApprovalRequest,
    decision_channel: watch::Sender<ApprovalStatus>,
}

pub struct ApprovalQueue {
    /// Mapa id -> expediente + canal de decisión. Propiedad exclusiva.
    slots: Mutex<HashMap<String, ApprovalSlot>>,
    max_pending: usize,
    ttl: Duration,
}

impl ApprovalQueue {
    pub fn new(max_pending: usize, ttl_minutes: i64) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            max_pending,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /**
     * Encola un expediente de aprobación.
     *
     * # Errors:
     * - `ControlError::Full`: La cola alcanzó su capacidad de pendientes.
     */
    #[instrument(skip(self, command, note), fields(probe = %probe_id, risk = ?risk_level))]
    pub fn submit(
        &self,
        probe_id: &str,
        command: CommandSpec,
        note: Option<String>,
        risk_level: RiskLevel,
        origin: &str,
    ) -> Result<ApprovalRequest, ControlError> {
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED");

        let pending_count = slots_guard
            .values()
            .filter(|slot| slot.request.status == ApprovalStatus::Pending)
            .count();
        if pending_count >= self.max_pending {
            warn!("🚧 [APPROVALS]: Queue saturated ({} pending). Submission rejected.", pending_count);
            return Err(ControlError::Full);
        }

        let now = Utc::now();
        let request = ApprovalRequest {
            id: format!("apr-{}", Uuid::new_v4().simple()),
            probe_id: probe_id.to_string(),
            command,
            note,
            risk_level,
            origin: origin.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
            status: ApprovalStatus::Pending,
            decided_by: None,
            decided_at: None,
        };

        let (decision_sender, _) = watch::channel(ApprovalStatus::Pending);
        slots_guard.insert(request.id.clone(), ApprovalSlot {
            request: request.clone(),
            decision_channel: decision_sender,
        });

        info!("⚖️ [APPROVALS]: Request {} queued for probe {} (origin: {}).",
            request.id, probe_id, origin);
        Ok(request)
    }

    /**
     * Bloquea hasta observar un estado terminal o agotar la espera.
     *
     * # Errors:
     * - `ControlError::NotFound`: Expediente inexistente.
     * - `ControlError::ApprovalTimeout`: La espera agotó su presupuesto.
     * - `ControlError::Cancelled`: El canal colapsó (apagado del sistema).
     */
    #[instrument(skip(self, wait_timeout))]
    pub async fn wait_for_decision(
        &self,
        approval_id: &str,
        wait_timeout: StdDuration,
    ) -> Result<ApprovalRequest, ControlError> {
        let mut decision_receiver = {
            let slots_guard = self.slots.lock().expect("LOCK_POISONED");
            let slot = slots_guard
                .get(approval_id)
                .ok_or_else(|| ControlError::NotFound(format!("approval {}", approval_id)))?;

            if slot.request.status.is_terminal() {
                return Ok(slot.request.clone());
            }
            slot.decision_channel.subscribe()
        };

        let deadline = tokio::time::Instant::now() + wait_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ControlError::ApprovalTimeout);
            }

            match tokio::time::timeout(remaining, decision_receiver.changed()).await {
                Err(_) => return Err(ControlError::ApprovalTimeout),
                Ok(Err(_)) => return Err(ControlError::Cancelled),
                Ok(Ok(())) => {
                    let observed_status = *decision_receiver.borrow();
                    if observed_status.is_terminal() {
                        return self
                            .get(approval_id)
                            .ok_or_else(|| ControlError::NotFound(format!("approval {}", approval_id)));
                    }
                }
            }
        }
    }

    /**
     * Sella un veredicto terminal y despierta a todos los que esperan.
     *
     * # Errors:
     * - `ControlError::NotFound`: Expediente inexistente.
     * - `ControlError::AlreadyDecided`: El expediente ya era terminal.
     */
    pub fn decide(
        &self,
        approval_id: &str,
        decision: ApprovalDecision,
        decided_by: &str,
    ) -> Result<ApprovalRequest, ControlError> {
        self.decide_tracked(approval_id, decision, decided_by)
            .map(|(sealed_request, _)| sealed_request)
    }

    /**
     * Variante de 'decide' que además reporta cuántas esperas activas
     * observarán el veredicto. El conteo se captura bajo el candado, en
     * el mismo instante del sellado: un despacho bloqueado en
     * 'wait_for_decision' cuenta como espera activa y reanudará el
     * envío por sí mismo; con cero esperas, la reanudación es
     * responsabilidad del decisor.
     *
     * # Errors:
     * - `ControlError::NotFound`: Expediente inexistente.
     * - `ControlError::AlreadyDecided`: El expediente ya era terminal.
     */
    #[instrument(skip(self), fields(approval = %approval_id, decided_by = %decided_by))]
    pub fn decide_tracked(
        &self,
        approval_id: &str,
        decision: ApprovalDecision,
        decided_by: &str,
    ) -> Result<(ApprovalRequest, usize), ControlError> {
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED");
        let slot = slots_guard
            .get_mut(approval_id)
            .ok_or_else(|| ControlError::NotFound(format!("approval {}", approval_id)))?;

        if slot.request.status.is_terminal() {
            return Err(ControlError::AlreadyDecided);
        }

        let terminal_status: ApprovalStatus = decision.into();
        slot.request.status = terminal_status;
        slot.request.decided_by = Some(decided_by.to_string());
        slot.request.decided_at = Some(Utc::now());

        // Conteo de esperas ANTES de la difusión: quien ya está suscrito
        // observará el veredicto y actuará en consecuencia.
        let active_waiters = slot.decision_channel.receiver_count();

        // Difusión del veredicto; sin receptores vivos no es un fallo.
        let _ = slot.decision_channel.send(terminal_status);

        info!("⚖️ [APPROVALS]: Request {} sealed as {:?} by {} ({} active waiters).",
            approval_id, terminal_status, decided_by, active_waiters);
        Ok((slot.request.clone(), active_waiters))
    }

    /// Instantánea de un expediente individual.
    pub fn get(&self, approval_id: &str) -> Option<ApprovalRequest> {
        let slots_guard = self.slots.lock().expect("LOCK_POISONED");
        slots_guard.get(approval_id).map(|slot| slot.request.clone())
    }

    /// Expedientes aún pendientes, ordenados por creación.
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let slots_guard = self.slots.lock().expect("LOCK_POISONED");
        let mut pending: Vec<ApprovalRequest> = slots_guard
            .values()
            .filter(|slot| slot.request.status == ApprovalStatus::Pending)
            .map(|slot| slot.request.clone())
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending
    }

    /// Expedientes recientes (terminales incluidos), más nuevos primero.
    pub fn all(&self, limit: usize) -> Vec<ApprovalRequest> {
        let slots_guard = self.slots.lock().expect("LOCK_POISONED");
        let mut requests: Vec<ApprovalRequest> = slots_guard
            .values()
            .map(|slot| slot.request.clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests.truncate(limit);
        requests
    }

    /// Cardinalidad de expedientes pendientes.
    pub fn pending_count(&self) -> usize {
        let slots_guard = self.slots.lock().expect("LOCK_POISONED");
        slots_guard
            .values()
            .filter(|slot| slot.request.status == ApprovalStatus::Pending)
            .count()
    }

    /**
     * Barrido de TTL: expedientes pendientes vencidos transicionan a
     * 'expired' y sus esperas se despiertan. Los terminales antiguos se
     * purgan para contener el mapa.
     */
    pub fn reap_expired(&self) -> usize {
        let now = Utc::now();
        let terminal_purge_boundary = now - Duration::hours(TERMINAL_RETENTION_HOURS);
        let mut slots_guard = self.slots.lock().expect("LOCK_POISONED");

        let mut expired_count = 0;
        for slot in slots_guard.values_mut() {
            if slot.request.status == ApprovalStatus::Pending && slot.request.expires_at < now {
                slot.request.status = ApprovalStatus::Expired;
                slot.request.decided_at = Some(now);
                let _ = slot.decision_channel.send(ApprovalStatus::Expired);
                expired_count += 1;
            }
        }

        slots_guard.retain(|_, slot| {
            !(slot.request.status.is_terminal()
                && slot.request.decided_at.map(|t| t < terminal_purge_boundary).unwrap_or(false))
        });

        expired_count
    }

    /// Despliega el daemon segador de TTL.
    pub fn spawn_ttl_reaper(
        queue: Arc<ApprovalQueue>,
        period: StdDuration,
        mut shutdown_signal: tokio::sync::watch::Receiver<bool>,
    ) {
        tokio::spawn(async move {
            let mut ttl_ticker = tokio::time::interval(period);
            info!("💀 [APPROVAL_REAPER]: TTL daemon initiated.");

            loop {
                tokio::select! {
                    _ = ttl_ticker.tick() => {
                        let expired_count = queue.reap_expired();
                        if expired_count > 0 {
                            info!("💀 [APPROVAL_REAPER]: {} requests expired by TTL.", expired_count);
                        }
                    }
                    _ = shutdown_signal.changed() => {
                        if *shutdown_signal.borrow() {
                            info!("🛑 [APPROVAL_REAPER]: Shutdown signal observed.");
                            break;
                        }
                    }
                }
            }
        });
    }
}
