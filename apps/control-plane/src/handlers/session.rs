// [apps/control-plane/src/handlers/session.rs]
/*!
 * =================================================================
 * APARATO: PROBE SESSION SOCKET (V16.0 - DUAL TASK LIFECYCLE)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: TÚNEL BIDIRECCIONAL AUTENTICADO CON CADA SONDA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. API-KEY GATE: La sesión sólo se negocia con el par
 *    (x-probe-id, x-api-key) validado contra el registro de flota.
 * 2. DUAL TASK: Un task de escritura (carril del hub + keep-alive) y
 *    uno de lectura (ruteo de tramas entrantes); el primero en caer
 *    dispara el colapso controlado del otro.
 * 3. ORDERED INGEST: Las tramas entrantes de una sonda se procesan en
 *    orden de recepción por un único contexto de handler.
 * =================================================================
 */

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use legator_domain_models::command::{CommandResult, OutputChunk};
use legator_domain_models::wire::{HeartbeatFrame, InventoryFrame, SessionFrame, SessionFrameType};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::state::AppState;

/// Intervalo de keep-alive físico (Ping). Sintonizado para proxies L7.
const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;

/**
 * Punto de entrada para la negociación de sesión de sonda.
 * Autentica ANTES de la transición de protocolo (RFC 6455).
 */
#[instrument(skip(websocket_upgrade, application_state, headers))]
pub async fn establish_probe_session(
    websocket_upgrade: WebSocketUpgrade,
    State(application_state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(probe_id) = header_value(&headers, "x-probe-id") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(presented_key) = header_value(&headers, "x-api-key") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let Some(probe) = application_state.fleet.get(&probe_id) else {
        warn!("❌ [SESSION_AUTH]: Unknown probe {} rejected.", probe_id);
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if probe.api_key.is_empty() || probe.api_key != presented_key {
        warn!("❌ [SESSION_AUTH]: Probe {} presented an invalid api key.", probe_id);
        return StatusCode::UNAUTHORIZED.into_response();
    }

    debug!("🔌 [SESSION_UPGRADE]: Negotiating protocol transition for probe {}...", probe_id);
    websocket_upgrade
        .on_upgrade(move |socket| handle_probe_session(socket, application_state, probe_id))
        .into_response()
}

/**
 * Orquestador de la sesión viva de una sonda.
 */
async fn handle_probe_session(socket: WebSocket, application_state: AppState, probe_id: String) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (session_id, mut outbound_lane_receiver) = application_state.hub.register_session(&probe_id);

    // La sesión confirma vida inmediata de la sonda.
    if let Err(liveness_fault) = application_state.fleet.set_online(&probe_id).await {
        warn!("⚠️ [SESSION]: Liveness flip failed for {}: {}", probe_id, liveness_fault);
    }

    info!("⚡ [SESSION_OPEN]: Probe {} session {} established.", probe_id, session_id);

    // --- TAREA 1: DOWNSTREAM (Hub -> Sonda) + KEEP-ALIVE ---
    let mut sender_transmission_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));

        loop {
            tokio::select! {
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                },
                outbound_frame = outbound_lane_receiver.recv() => {
                    match outbound_frame {
                        Some(frame) => {
                            let Ok(frame_json) = serde_json::to_string(&frame) else {
                                error!("❌ [SESSION]: Outbound frame serialization collapsed.");
                                continue;
                            };
                            if socket_sender.send(Message::Text(frame_json)).await.is_err() {
                                break;
                            }
                        }
                        // Carril cerrado: la sesión fue desplazada por una nueva.
                        None => break,
                    }
                },
            }
        }
    });

    // --- TAREA 2: UPSTREAM (Sonda -> Núcleo) ---
    let ingest_state = application_state.clone();
    let ingest_probe_id = probe_id.clone();
    let mut receiver_ingestion_task = tokio::spawn(async move {
        while let Some(network_read_result) = socket_receiver.next().await {
            match network_read_result {
                Ok(Message::Text(raw_frame_json)) => {
                    match serde_json::from_str::<SessionFrame>(&raw_frame_json) {
                        Ok(frame) => route_inbound_frame(&ingest_state, &ingest_probe_id, frame).await,
                        Err(decode_fault) => {
                            warn!("⚠️ [SESSION]: Malformed frame from {}: {}", ingest_probe_id, decode_fault);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("🔌 [SESSION]: Close signal received from probe {}.", ingest_probe_id);
                    break;
                }
                Err(physical_layer_fault) => {
                    debug!("❌ [SESSION]: Probe {} network error: {}", ingest_probe_id, physical_layer_fault);
                    break;
                }
                _ => {} // Binary, Ping y Pong se descartan en este estrato.
            }
        }
    });

    // --- COLAPSO CONTROLADO: el primero en caer cierra al otro. ---
    tokio::select! {
        _ = (&mut sender_transmission_task) => {
            receiver_ingestion_task.abort();
        },
        _ = (&mut receiver_ingestion_task) => {
            sender_transmission_task.abort();
        },
    };

    application_state.hub.unregister_session(&probe_id, &session_id);
    info!("💀 [SESSION_CLOSED]: Probe {} session {} released.", probe_id, session_id);
}

/**
 * Ruteo de una trama entrante hacia su dueño de estado.
 * Una trama cuyo payload declare otro probe_id se descarta.
 */
async fn route_inbound_frame(state: &AppState, session_probe_id: &str, frame: SessionFrame) {
    match frame.frame_type {
        SessionFrameType::Heartbeat => {
            let Ok(heartbeat) = serde_json::from_value::<HeartbeatFrame>(frame.payload) else {
                warn!("⚠️ [SESSION]: Malformed heartbeat payload from {}.", session_probe_id);
                return;
            };
            if heartbeat.probe_id != session_probe_id {
                warn!("🛡️ [SESSION]: Heartbeat probe_id mismatch ({} vs {}). Discarded.",
                    heartbeat.probe_id, session_probe_id);
                return;
            }
            if let Err(heartbeat_fault) = state.fleet.heartbeat(session_probe_id, &heartbeat).await {
                warn!("⚠️ [SESSION]: Heartbeat rejected for {}: {}", session_probe_id, heartbeat_fault);
            }
        }

        SessionFrameType::Inventory => {
            let Ok(inventory) = serde_json::from_value::<InventoryFrame>(frame.payload) else {
                warn!("⚠️ [SESSION]: Malformed inventory payload from {}.", session_probe_id);
                return;
            };
            if inventory.probe_id != session_probe_id {
                warn!("🛡️ [SESSION]: Inventory probe_id mismatch. Discarded.");
                return;
            }
            if let Err(inventory_fault) = state.fleet.update_inventory(session_probe_id, inventory).await {
                warn!("⚠️ [SESSION]: Inventory rejected for {}: {}", session_probe_id, inventory_fault);
            }
        }

        SessionFrameType::CommandResult => {
            let Ok(result) = serde_json::from_value::<CommandResult>(frame.payload) else {
                warn!("⚠️ [SESSION]: Malformed command result from {}.", session_probe_id);
                return;
            };
            let request_id = result.request_id.clone();
            if let Err(tracker_fault) = state.tracker.complete(&request_id, result) {
                debug!("💤 [SESSION]: Untracked result {} discarded: {}", request_id, tracker_fault);
            }
        }

        SessionFrameType::OutputChunk => {
            let Ok(chunk) = serde_json::from_value::<OutputChunk>(frame.payload) else {
                warn!("⚠️ [SESSION]: Malformed output chunk from {}.", session_probe_id);
                return;
            };

            state.hub.fan_out_chunk(&chunk);

            // Un chunk final con exit_code es el mensaje terminal del
            // request: sintetiza la finalización para el tracker.
            if chunk.is_final {
                let synthesized_result = CommandResult {
                    request_id: chunk.request_id.clone(),
                    exit_code: chunk.exit_code.unwrap_or(0),
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: 0,
                };
                if state.tracker.complete(&chunk.request_id, synthesized_result).is_ok() {
                    debug!("🏁 [SESSION]: Stream {} sealed via final chunk.", chunk.request_id);
                }
            }
        }

        // Tramas emitidas por el servidor; una sonda jamás debe enviarlas.
        SessionFrameType::Command | SessionFrameType::PolicyUpdate | SessionFrameType::Update => {
            warn!("🛡️ [SESSION]: Probe {} emitted a server-only frame {:?}. Discarded.",
                session_probe_id, frame.frame_type);
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
