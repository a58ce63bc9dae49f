// [apps/control-plane/src/services/task_runner.rs]
/*!
 * =================================================================
 * APARATO: LLM TASK RUNNER (V9.0 - BOUNDED OBSERVE LOOP)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: BUCLE PLAN/OBSERVACIÓN SOBRE EL DESPACHADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BOUNDED ITERATION: Máximo 5 vueltas por turno de usuario; al
 *    agotarse se retorna el mensaje de límite alcanzado.
 * 2. SAME DISCIPLINE: Todo tool-call atraviesa el despachador con
 *    origin="llm-task": misma compuerta de aprobación, mismo rastro.
 * 3. HISTORY HYGIENE: El historial se recorta a los últimos 20 turnos
 *    antes de cada consulta al proveedor.
 * =================================================================
 */

use std::sync::Arc;

use legator_domain_cortex::provider::{ChatMessage, CompletionProvider};
use legator_domain_cortex::toolcall::{extract_tool_call, ToolCall};
use legator_domain_cortex::CortexError;
use legator_domain_models::command::CommandSpec;
use legator_domain_models::probe::ProbeStatus;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::errors::ControlError;
use crate::services::dispatcher::{CommandDispatcher, DispatchOutcome};
use crate::state::fleet_store::FleetStore;

/// Vueltas máximas del bucle por turno de usuario.
const MAX_LOOP_ITERATIONS: usize = 5;

/// Turnos de historial retenidos antes de consultar al proveedor.
const HISTORY_RETENTION_TURNS: usize = 20;

/// Topes de truncamiento de los resúmenes de resultado.
const STDOUT_SUMMARY_CAP: usize = 2000;
const STDERR_SUMMARY_CAP: usize = 1000;

/// Actor reportado en aprobaciones y auditoría.
const TASK_ORIGIN: &str = "llm-task";

/// Reporte de una acción ejecutada durante el turno.
#[derive(Debug, Clone, Serialize)]
pub struct TaskActionReport {
    pub probe_id: String,
    pub command: String,
    /// "completed", "accepted", "pending_approval" o "error".
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Desenlace de un turno completo del bucle.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReply {
    pub reply: String,
    pub actions: Vec<TaskActionReport>,
}

pub struct TaskRunnerService {
    completion_provider: Option<Arc<dyn CompletionProvider>>,
    dispatcher: Arc<CommandDispatcher>,
    fleet: Arc<FleetStore>,
}

impl TaskRunnerService {
    pub fn new(
        completion_provider: Option<Arc<dyn CompletionProvider>>,
        dispatcher: Arc<CommandDispatcher>,
        fleet: Arc<FleetStore>,
    ) -> Self {
        Self { completion_provider, dispatcher, fleet }
    }

    /**
     * Ejecuta un turno completo del bucle plan/observación.
     *
     * # Errors:
     * - `ControlError::Config`: Proveedor LLM no configurado.
     * - `ControlError::Internal`: Fallo fatal del proveedor.
     */
    #[instrument(skip(self, history), fields(turns = history.len()))]
    pub async fn respond(&self, mut history: Vec<ChatMessage>) -> Result<TaskReply, ControlError> {
        let provider = self
            .completion_provider
            .as_ref()
            .ok_or_else(|| ControlError::Config("LLM provider not configured".into()))?;

        let mut executed_actions: Vec<TaskActionReport> = Vec::new();

        for iteration in 0..MAX_LOOP_ITERATIONS {
            // 1. COMPOSICIÓN DEL PROMPT CON CONTEXTO DE FLOTA
            let mut prompt_messages = vec![ChatMessage::system(self.compose_system_prompt())];
            let retained_history_start = history.len().saturating_sub(HISTORY_RETENTION_TURNS);
            prompt_messages.extend_from_slice(&history[retained_history_start..]);

            // 2. CONSULTA AL PROVEEDOR
            let reply_text = provider.complete(&prompt_messages).await.map_err(|fault| match fault {
                CortexError::ProviderMissing => ControlError::Config("LLM provider not configured".into()),
                other => ControlError::Internal(format!("completion provider: {}", other)),
            })?;

            // 3. EXTRACCIÓN DE DIRECTIVA (best effort)
            let Some(tool_call) = extract_tool_call(&reply_text) else {
                // Respuesta conversacional: fin del turno.
                return Ok(TaskReply { reply: reply_text, actions: executed_actions });
            };

            info!("🧠 [TASK_RUNNER]: Iteration {} resolved a tool call: '{}'.",
                iteration + 1, tool_call.command);

            // 4. RESOLUCIÓN DE OBJETIVOS Y DESPACHO
            let targets = self.resolve_targets(&tool_call);
            history.push(ChatMessage::assistant(reply_text));

            if targets.is_empty() {
                history.push(ChatMessage::user(
                    "[system] tool call had no resolvable target (use probe, target=all, or target=tag:<name>)".to_string(),
                ));
                continue;
            }

            let mut observation_lines = Vec::with_capacity(targets.len());
            for target_probe_id in targets {
                let (report, observation) = self.execute_tool_call(&target_probe_id, &tool_call).await;
                observation_lines.push(observation);
                executed_actions.push(report);
            }

            // 5. TURNO SINTETIZADO DE OBSERVACIÓN
            history.push(ChatMessage::user(format!(
                "[command results]\n{}",
                observation_lines.join("\n")
            )));
        }

        warn!("🧠 [TASK_RUNNER]: Iteration budget exhausted for this turn.");
        Ok(TaskReply {
            reply: "Reached the iteration limit for this task. Review the executed actions and ask again to continue.".to_string(),
            actions: executed_actions,
        })
    }

    // --- MOTOR INTERNO ---

    fn compose_system_prompt(&self) -> String {
        let status_counts = self.fleet.count_by_status();
        let tag_counts = self.fleet.tag_counts();

        let mut tag_summary: Vec<String> = tag_counts
            .iter()
            .map(|(tag, count)| format!("{}={}", tag, count))
            .collect();
        tag_summary.sort();

        format!(
            "You are the task runner of a probe fleet control plane. \
             Fleet status: online={}, degraded={}, pending={}, offline={}. \
             Tags: [{}]. \
             To run a command on the fleet, reply with a single JSON object: \
             {{\"command\": \"...\", \"args\": [...], \"probe\": \"<probe_id>\" | \"target\": \"all\" | \"tag:<name>\", \"reason\": \"...\"}}. \
             Destructive commands require human approval and may be held or denied. \
             Otherwise reply conversationally.",
            status_counts.get("online").copied().unwrap_or(0),
            status_counts.get("degraded").copied().unwrap_or(0),
            status_counts.get("pending").copied().unwrap_or(0),
            status_counts.get("offline").copied().unwrap_or(0),
            tag_summary.join(", "),
        )
    }

    /// Resuelve los objetivos de una directiva: probe explícito, 'all',
    /// 'tag:<name>' o un probe_id directo en 'target'.
    fn resolve_targets(&self, tool_call: &ToolCall) -> Vec<String> {
        if let Some(probe_id) = &tool_call.probe {
            return vec![probe_id.clone()];
        }

        match tool_call.target.as_deref() {
            Some("all") => self
                .fleet
                .list()
                .into_iter()
                .filter(|probe| probe.status == ProbeStatus::Online)
                .map(|probe| probe.id)
                .collect(),
            Some(target) if target.starts_with("tag:") => self
                .fleet
                .list_by_tag(&target[4..])
                .into_iter()
                .map(|probe| probe.id)
                .collect(),
            Some(probe_id) => vec![probe_id.to_string()],
            None => Vec::new(),
        }
    }

    async fn execute_tool_call(
        &self,
        probe_id: &str,
        tool_call: &ToolCall,
    ) -> (TaskActionReport, String) {
        let spec = CommandSpec {
            command: tool_call.command.clone(),
            args: tool_call.args.clone(),
            request_id: None,
            timeout_seconds: 30,
            stream: false,
            note: tool_call.reason.clone(),
        };

        match self.dispatcher.dispatch(probe_id, spec, true, TASK_ORIGIN).await {
            Ok(DispatchOutcome::Completed(result)) => {
                let observation = format!(
                    "probe {} | exit={} | {}ms\nstdout: {}\nstderr: {}",
                    probe_id,
                    result.exit_code,
                    result.duration_ms,
                    truncate_summary(&result.stdout, STDOUT_SUMMARY_CAP),
                    truncate_summary(&result.stderr, STDERR_SUMMARY_CAP),
                );
                let report = TaskActionReport {
                    probe_id: probe_id.to_string(),
                    command: tool_call.command.clone(),
                    outcome: "completed".into(),
                    exit_code: Some(result.exit_code),
                    detail: None,
                };
                (report, observation)
            }
            Ok(DispatchOutcome::Accepted { request_id }) => {
                let report = TaskActionReport {
                    probe_id: probe_id.to_string(),
                    command: tool_call.command.clone(),
                    outcome: "accepted".into(),
                    exit_code: None,
                    detail: Some(request_id.clone()),
                };
                (report, format!("probe {} | command accepted as {}", probe_id, request_id))
            }
            Ok(DispatchOutcome::PendingApproval { approval_id }) => {
                let report = TaskActionReport {
                    probe_id: probe_id.to_string(),
                    command: tool_call.command.clone(),
                    outcome: "pending_approval".into(),
                    exit_code: None,
                    detail: Some(approval_id.clone()),
                };
                (
                    report,
                    format!("probe {} | command held for human approval ({})", probe_id, approval_id),
                )
            }
            Err(dispatch_fault) => {
                let detail = dispatch_fault.to_string();
                let report = TaskActionReport {
                    probe_id: probe_id.to_string(),
                    command: tool_call.command.clone(),
                    outcome: "error".into(),
                    exit_code: None,
                    detail: Some(detail.clone()),
                };
                (report, format!("probe {} | dispatch failed: {}", probe_id, detail))
            }
        }
    }
}

/// Trunca un resumen al tope entregado respetando fronteras UTF-8.
fn truncate_summary(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut boundary = cap;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}… [truncated]", &text[..boundary])
}
