// [apps/control-plane/src/handlers/stream.rs]
/*!
 * =================================================================
 * APARATO: OUTPUT STREAM HANDLER (V8.0 - SSE TUNNEL)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: SERIALIZAR FRAGMENTOS DE SALIDA COMO EVENTOS SSE
 *
 * # Logic:
 * Cada fragmento del hub se emite como un frame SSE ('chunk', o 'final'
 * para el terminal). El guard de la suscripción viaja dentro del stream
 * y se libera al cerrarse la conexión del operador.
 * =================================================================
 */

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument};

use crate::state::AppState;

/// Capacidad del buffer del suscriptor SSE.
const SSE_SUBSCRIBER_CAPACITY: usize = 256;

/**
 * Endpoint: GET /api/v1/stream/:request_id
 * Túnel de sólo-lectura de los fragmentos de una orden en streaming.
 */
#[instrument(skip(application_state))]
pub async fn stream_command_output(
    State(application_state): State<AppState>,
    Path(request_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (chunk_receiver, subscription_guard) = application_state
        .hub
        .subscribe(&request_id, SSE_SUBSCRIBER_CAPACITY);

    debug!("📡 [SSE]: Operator attached to request {}.", request_id);

    let event_stream = ReceiverStream::new(chunk_receiver).map(move |chunk| {
        // El guard vive dentro del closure: la suscripción se libera
        // cuando el stream SSE se dropea.
        let _subscription_anchor = &subscription_guard;

        let event_name = if chunk.is_final { "final" } else { "chunk" };
        let event = Event::default()
            .event(event_name)
            .json_data(&chunk)
            .unwrap_or_else(|_| Event::default().event("error").data("chunk serialization failed"));

        Ok(event)
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
