// [apps/control-plane/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V12.0 - CONTROL SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA DE RED DEL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología soporta tres ciudadanías:
 * 1. Sondas: enrolamiento (token propio) y sesión WebSocket (api_key).
 * 2. Operadores: superficie REST + SSE tras el guard Bearer.
 * 3. Infraestructura: endpoints de vida sin autenticación.
 * =================================================================
 */

use crate::handlers::{audit, chat, commands, probes, session, stream, tokens};
use crate::middleware::operator_guard;
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_control_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para el Dashboard y herramientas de Ops.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE OPERADOR: Gobernanza de flota y despacho de mando.
    let operator_stratum = Router::new()
        // Vistas de flota
        .route("/fleet", get(probes::FleetLifecycleHandler::handle_fleet_summary))
        .route("/fleet/inventory", get(probes::FleetLifecycleHandler::handle_fleet_inventory))
        .route("/fleet/command", post(commands::CommandDispatchHandler::handle_group_dispatch))
        .route("/fleet/cleanup", post(probes::FleetLifecycleHandler::handle_fleet_cleanup))
        // Gobernanza de sondas
        .route("/probes", get(probes::FleetLifecycleHandler::handle_list_probes))
        .route("/probes/:id", get(probes::FleetLifecycleHandler::handle_get_probe)
            .delete(probes::FleetLifecycleHandler::handle_delete_probe))
        .route("/probes/:id/policy", post(probes::FleetLifecycleHandler::handle_set_policy))
        .route("/probes/:id/tags", post(probes::FleetLifecycleHandler::handle_set_tags))
        // Despacho de mando
        .route("/probes/:id/command", post(commands::CommandDispatchHandler::handle_probe_dispatch))
        .route("/commands", get(commands::CommandDispatchHandler::handle_list_in_flight))
        // Cola de aprobaciones
        .route("/approvals", get(commands::CommandDispatchHandler::handle_list_approvals))
        .route("/approvals/:id", get(commands::CommandDispatchHandler::handle_get_approval))
        .route("/approvals/:id/decide", post(commands::CommandDispatchHandler::handle_decide_approval))
        // Autoridad de tokens
        .route("/tokens", post(tokens::TokenIssuanceHandler::handle_create_token)
            .get(tokens::TokenIssuanceHandler::handle_list_tokens))
        // Streaming de salida (SSE)
        .route("/stream/:request_id", get(stream::stream_command_output))
        // Bucle de tareas LLM
        .route("/chat", post(chat::handle_chat_turn))
        // Rastro forense
        .route("/audit", get(audit::handle_recent_audit))
        // Guard Bearer de operador
        .layer(middleware::from_fn_with_state(application_shared_state.clone(), operator_guard));

    // ESTRATO DE SONDAS: Enrolamiento y túnel de sesión.
    let probe_stratum = Router::new()
        .route("/probes/register", post(probes::FleetLifecycleHandler::handle_registration))
        .route("/session", get(session::establish_probe_session));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .route("/version", get(|| async {
            Json(json!({
                "service": "legator-control-plane",
                "version": env!("CARGO_PKG_VERSION"),
            }))
        }))
        .nest("/api/v1", probe_stratum.merge(operator_stratum))
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
