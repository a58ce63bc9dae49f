// [apps/control-plane/src/services/dispatcher.rs]
/*!
 * =================================================================
 * APARATO: COMMAND DISPATCHER (V18.0 - APPROVAL GATED)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: POLÍTICA -> APROBACIÓN -> ENVÍO -> RESULTADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRACK-BEFORE-SEND: Cuando el invocador espera, la orden se rastrea
 *    ANTES del envío para eliminar la carrera del resultado perdido.
 * 2. ROLLBACK ON FAULT: Un envío fallido cancela el rastreo y propaga
 *    NotConnected sin efectos residuales.
 * 3. PER-TARGET GATE: El despacho grupal evalúa la compuerta de
 *    aprobación por objetivo; no existe bypass silencioso.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use legator_domain_cortex::risk::{classify_risk, needs_approval, required_policy_level};
use legator_domain_models::approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus};
use legator_domain_models::audit::AuditEvent;
use legator_domain_models::command::{CommandEnvelope, CommandResult, CommandSpec};
use legator_domain_models::probe::ProbeState;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ControlError;
use crate::services::audit::AuditSink;
use crate::state::approval_queue::ApprovalQueue;
use crate::state::command_tracker::CommandTracker;
use crate::state::connection_hub::ConnectionHub;
use crate::state::fleet_store::FleetStore;

/// Piso del presupuesto de espera del resultado (35s).
const MINIMUM_WAIT_BUDGET_SECONDS: u64 = 35;

/// Margen añadido sobre el timeout de la orden (5s).
const WAIT_BUDGET_MARGIN_SECONDS: u64 = 5;

/// Desenlace de un despacho individual.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// El invocador esperó y el resultado terminal llegó.
    Completed(CommandResult),
    /// La orden fue enviada sin espera de resultado.
    Accepted { request_id: String },
    /// La orden quedó retenida en la cola de aprobaciones.
    PendingApproval { approval_id: String },
}

/// Entrada del reporte de despacho grupal (sin fan-in de espera).
#[derive(Debug, Clone, Serialize)]
pub struct GroupDispatchEntry {
    pub probe_id: String,
    /// "accepted", "pending_approval" o "error".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reporte del envío reanudado por un veredicto de aprobación.
#[derive(Debug, Clone, Serialize)]
pub struct ResumedDispatchReport {
    /// "accepted" o "error".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct CommandDispatcher {
    fleet: Arc<FleetStore>,
    hub: Arc<ConnectionHub>,
    tracker: Arc<CommandTracker>,
    approvals: Arc<ApprovalQueue>,
    audit_sink: Arc<dyn AuditSink>,
    /// Presupuesto de espera de decisión humana.
    approval_wait: Duration,
    /// Comandos exentos de aprobación por configuración.
    command_allow_list: Vec<String>,
}

impl CommandDispatcher {
    pub fn new(
        fleet: Arc<FleetStore>,
        hub: Arc<ConnectionHub>,
        tracker: Arc<CommandTracker>,
        approvals: Arc<ApprovalQueue>,
        audit_sink: Arc<dyn AuditSink>,
        approval_wait: Duration,
        command_allow_list: Vec<String>,
    ) -> Self {
        Self {
            fleet,
            hub,
            tracker,
            approvals,
            audit_sink,
            approval_wait,
            command_allow_list,
        }
    }

    /**
     * Despacha una orden hacia una sonda individual.
     *
     * # Errors:
     * - `NotFound`: Sonda inexistente.
     * - `Full`: Cola de aprobaciones saturada.
     * - `ApprovalDenied` / `ApprovalExpired` / `ApprovalTimeout`: La
     *   compuerta humana cortocircuitó el despacho.
     * - `NotConnected`: Sin sesión viva para la sonda.
     * - `Timeout`: El resultado no llegó dentro del presupuesto.
     * - `Cancelled`: El rastreo fue cancelado durante la espera.
     */
    #[instrument(skip(self, spec), fields(probe = %probe_id, command = %spec.command, origin = %origin))]
    pub async fn dispatch(
        &self,
        probe_id: &str,
        spec: CommandSpec,
        wait: bool,
        origin: &str,
    ) -> Result<DispatchOutcome, ControlError> {
        // 1. RESOLUCIÓN DE LA SONDA OBJETIVO
        let probe = self
            .fleet
            .get(probe_id)
            .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;

        // 2. COMPUERTA DE APROBACIÓN HUMANA
        if needs_approval(&spec.command, &spec.args, probe.policy_level, &self.command_allow_list) {
            match self.traverse_approval_gate(&probe, &spec, wait, origin).await? {
                GateVerdict::Proceed => {}
                GateVerdict::Suspended { approval_id } => {
                    return Ok(DispatchOutcome::PendingApproval { approval_id });
                }
            }
        }

        self.transmit_command(probe_id, spec, wait, origin).await
    }

    /**
     * Pipeline de transmisión (post-compuerta): acuña el correlador,
     * rastrea, firma, envía y opcionalmente espera el resultado.
     * El invocador garantiza que la sonda existe y que la orden ya
     * atravesó (o no requiere) la compuerta de aprobación.
     */
    async fn transmit_command(
        &self,
        probe_id: &str,
        mut spec: CommandSpec,
        wait: bool,
        origin: &str,
    ) -> Result<DispatchOutcome, ControlError> {
        // 3. ACUÑACIÓN DEL CORRELADOR
        let request_id = spec
            .request_id
            .take()
            .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple()));

        let risk = classify_risk(&spec.command, &spec.args);
        let required_level = required_policy_level(risk);

        // 4. RASTREO PREVIO AL ENVÍO (sólo con espera)
        // El guard cancela el rastreo si el futuro del invocador se
        // dropea a mitad de la espera (desconexión del cliente HTTP).
        let mut tracking = if wait {
            let receiver = self.tracker.track(&request_id, probe_id, &spec.command, required_level);
            Some((receiver, TrackGuard::armed(self.tracker.clone(), request_id.clone())))
        } else {
            None
        };

        // 5. EMISIÓN DEL SOBRE FIRMADO
        let envelope = CommandEnvelope {
            request_id: request_id.clone(),
            command: spec.command.clone(),
            args: spec.args.clone(),
            level: required_level,
            timeout_seconds: spec.timeout_seconds,
            stream: spec.stream,
            signature: None,
        };

        if let Err(send_fault) = self.hub.send_command(probe_id, envelope).await {
            if let Some((_, guard)) = tracking.take() {
                guard.cancel_now();
            } else {
                self.tracker.cancel(&request_id);
            }
            return Err(send_fault);
        }

        // 6. RASTRO FORENSE
        self.audit_sink
            .record(AuditEvent::now(
                "command_sent",
                Some(probe_id),
                origin,
                format!("command '{}' dispatched as {} (risk: {:?})", spec.command, request_id, risk),
            ))
            .await;

        // 7. ESPERA DEL RESULTADO TERMINAL
        let Some((mut receiver, guard)) = tracking.take() else {
            return Ok(DispatchOutcome::Accepted { request_id });
        };

        let wait_budget = Duration::from_secs(
            (spec.timeout_seconds + WAIT_BUDGET_MARGIN_SECONDS).max(MINIMUM_WAIT_BUDGET_SECONDS),
        );

        match tokio::time::timeout(wait_budget, receiver.recv()).await {
            Ok(Some(result)) => {
                guard.disarm();
                Ok(DispatchOutcome::Completed(result))
            }
            Ok(None) => {
                guard.disarm();
                Err(ControlError::Cancelled)
            }
            Err(_elapsed) => {
                guard.cancel_now();
                warn!("⏳ [DISPATCHER]: Request {} timed out after {:?}.", request_id, wait_budget);
                Err(ControlError::Timeout)
            }
        }
    }

    /**
     * Despacho grupal por etiqueta: cada objetivo recibe su propio
     * correlador 'grp-<prefijo>-<sufijo>' y el reporte se arma sin
     * fan-in de espera.
     */
    #[instrument(skip(self, spec), fields(tag = %tag, command = %spec.command, origin = %origin))]
    pub async fn dispatch_group(
        &self,
        tag: &str,
        spec: CommandSpec,
        origin: &str,
    ) -> Vec<GroupDispatchEntry> {
        let targets = self.fleet.list_by_tag(tag);

        if targets.is_empty() {
            return Vec::new();
        }

        info!("📡 [DISPATCHER]: Group dispatch '{}' over {} probes tagged '{}'.",
            spec.command, targets.len(), tag);

        let dispatch_futures = targets.into_iter().map(|target| {
            let per_target_spec = spec.clone();
            async move {
                self.dispatch_group_target(target, per_target_spec, origin).await
            }
        });

        join_all(dispatch_futures).await
    }

    async fn dispatch_group_target(
        &self,
        target: ProbeState,
        mut spec: CommandSpec,
        origin: &str,
    ) -> GroupDispatchEntry {
        // Correlador por objetivo: grp-<prefijo-de-sonda>-<sufijo>.
        let probe_prefix: String = target.id.chars().take(8).collect();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let request_id = format!("grp-{}-{}", probe_prefix, suffix.to_lowercase());

        // Compuerta por objetivo: sin bypass silencioso. Un objetivo que
        // exige aprobación queda encolado (sin espera) y reportado.
        if needs_approval(&spec.command, &spec.args, target.policy_level, &self.command_allow_list) {
            let risk = classify_risk(&spec.command, &spec.args);
            return match self.approvals.submit(
                &target.id,
                spec.clone(),
                spec.note.clone(),
                risk,
                origin,
            ) {
                Ok(approval) => GroupDispatchEntry {
                    probe_id: target.id,
                    status: "pending_approval".into(),
                    request_id: None,
                    approval_id: Some(approval.id),
                    error: None,
                },
                Err(gate_fault) => GroupDispatchEntry {
                    probe_id: target.id,
                    status: "error".into(),
                    request_id: None,
                    approval_id: None,
                    error: Some(gate_fault.to_string()),
                },
            };
        }

        spec.request_id = Some(request_id.clone());
        match self.dispatch(&target.id, spec, false, origin).await {
            Ok(DispatchOutcome::Accepted { request_id }) => GroupDispatchEntry {
                probe_id: target.id,
                status: "accepted".into(),
                request_id: Some(request_id),
                approval_id: None,
                error: None,
            },
            Ok(DispatchOutcome::PendingApproval { approval_id }) => GroupDispatchEntry {
                probe_id: target.id,
                status: "pending_approval".into(),
                request_id: None,
                approval_id: Some(approval_id),
                error: None,
            },
            Ok(DispatchOutcome::Completed(result)) => GroupDispatchEntry {
                probe_id: target.id,
                status: "accepted".into(),
                request_id: Some(result.request_id),
                approval_id: None,
                error: None,
            },
            Err(dispatch_fault) => GroupDispatchEntry {
                probe_id: target.id,
                status: "error".into(),
                request_id: None,
                approval_id: None,
                error: Some(dispatch_fault.to_string()),
            },
        }
    }

    /**
     * Sella un veredicto humano y completa el circuito aprobar->enviar.
     *
     * # Logic:
     * - Denegado/expirado: sólo se sella el expediente.
     * - Aprobado con esperas activas: el despacho bloqueado en
     *   'wait_for_decision' reanuda el envío por sí mismo; enviar aquí
     *   duplicaría el sobre.
     * - Aprobado sin esperas (solicitante 202 o despacho grupal): el
     *   veredicto dispara aquí la transmisión de la orden retenida, con
     *   el decisor como actor del rastro forense.
     *
     * # Errors:
     * - `NotFound` / `AlreadyDecided`: Fallos del sellado del veredicto.
     *   Un fallo del envío reanudado NO deshace el veredicto: se reporta
     *   en el desenlace.
     */
    #[instrument(skip(self), fields(approval = %approval_id, decided_by = %decided_by))]
    pub async fn resolve_approval(
        &self,
        approval_id: &str,
        decision: ApprovalDecision,
        decided_by: &str,
    ) -> Result<(ApprovalRequest, Option<ResumedDispatchReport>), ControlError> {
        let (sealed, active_waiters) = self
            .approvals
            .decide_tracked(approval_id, decision, decided_by)?;

        self.audit_sink
            .record(AuditEvent::now(
                "approval_decided",
                Some(&sealed.probe_id),
                decided_by,
                format!("approval {} sealed as {:?}", sealed.id, sealed.status),
            ))
            .await;

        if sealed.status != ApprovalStatus::Approved {
            return Ok((sealed, None));
        }

        if active_waiters > 0 {
            // El despacho bloqueado observará el veredicto y enviará.
            return Ok((sealed, None));
        }

        // REANUDACIÓN: nadie espera este expediente; el envío es nuestro.
        if self.fleet.get(&sealed.probe_id).is_none() {
            warn!("👻 [DISPATCHER]: Approved command for vanished probe {}.", sealed.probe_id);
            return Ok((sealed.clone(), Some(ResumedDispatchReport {
                status: "error".into(),
                request_id: None,
                error: Some(format!("probe {} no longer registered", sealed.probe_id)),
            })));
        }

        let report = match self
            .transmit_command(&sealed.probe_id, sealed.command.clone(), false, decided_by)
            .await
        {
            Ok(DispatchOutcome::Accepted { request_id }) => {
                info!("📨 [DISPATCHER]: Approval {} resumed as request {}.", sealed.id, request_id);
                ResumedDispatchReport {
                    status: "accepted".into(),
                    request_id: Some(request_id),
                    error: None,
                }
            }
            Ok(DispatchOutcome::Completed(result)) => ResumedDispatchReport {
                status: "accepted".into(),
                request_id: Some(result.request_id),
                error: None,
            },
            Ok(DispatchOutcome::PendingApproval { approval_id }) => ResumedDispatchReport {
                status: "error".into(),
                request_id: None,
                error: Some(format!("unexpected re-suspension as {}", approval_id)),
            },
            Err(transmit_fault) => ResumedDispatchReport {
                status: "error".into(),
                request_id: None,
                error: Some(transmit_fault.to_string()),
            },
        };

        Ok((sealed, Some(report)))
    }

    // --- COMPUERTA DE APROBACIÓN ---

    async fn traverse_approval_gate(
        &self,
        probe: &ProbeState,
        spec: &CommandSpec,
        wait: bool,
        origin: &str,
    ) -> Result<GateVerdict, ControlError> {
        let risk = classify_risk(&spec.command, &spec.args);

        let approval = self.approvals.submit(
            &probe.id,
            spec.clone(),
            spec.note.clone(),
            risk,
            origin,
        )?;

        self.audit_sink
            .record(AuditEvent::now(
                "approval_requested",
                Some(&probe.id),
                origin,
                format!("command '{}' held for approval {} (risk: {:?})", spec.command, approval.id, risk),
            ))
            .await;

        if !wait {
            return Ok(GateVerdict::Suspended { approval_id: approval.id });
        }

        let decided = self.approvals.wait_for_decision(&approval.id, self.approval_wait).await?;

        match decided.status {
            ApprovalStatus::Approved => Ok(GateVerdict::Proceed),
            ApprovalStatus::Denied => Err(ControlError::ApprovalDenied),
            ApprovalStatus::Expired => Err(ControlError::ApprovalExpired),
            ApprovalStatus::Pending => Err(ControlError::ApprovalTimeout),
        }
    }
}

enum GateVerdict {
    Proceed,
    Suspended { approval_id: String },
}

/**
 * Guard de cancelación del rastreo en vuelo.
 * Si el futuro del despacho se dropea antes del desenlace, Drop cancela
 * la entrada del tracker; 'disarm' sella los caminos de éxito.
 */
struct TrackGuard {
    tracker: Arc<CommandTracker>,
    request_id: String,
    armed: bool,
}

impl TrackGuard {
    fn armed(tracker: Arc<CommandTracker>, request_id: String) -> Self {
        Self { tracker, request_id, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }

    fn cancel_now(mut self) {
        self.tracker.cancel(&self.request_id);
        self.armed = false;
    }
}

impl Drop for TrackGuard {
    fn drop(&mut self) {
        if self.armed {
            self.tracker.cancel(&self.request_id);
        }
    }
}
