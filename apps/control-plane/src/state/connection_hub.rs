// [apps/control-plane/src/state/connection_hub.rs]
/*!
 * =================================================================
 * APARATO: PROBE CONNECTION HUB (V21.0 - LOSSY FAN-OUT CERTIFIED)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: SESIONES VIVAS, ESCRITURA SERIALIZADA Y FAN-OUT
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LAST-WRITE-WINS: Una sesión nueva para el mismo probe_id reemplaza
 *    el handle anterior; el carril huérfano colapsa y la sesión vieja
 *    se cierra sola.
 * 2. SINGLE WRITER LANE: Toda escritura saliente viaja por el canal
 *    mpsc de la sesión; un único task posee el socket de escritura.
 * 3. LOSSY SUBSCRIBERS: Ante un suscriptor con buffer lleno se descarta
 *    el fragmento MÁS NUEVO para ese suscriptor. Bloquear el hub por un
 *    consumidor lento es un defecto, no una opción.
 * 4. TERMINAL CLOSURE: El fragmento 'final' se entrega y luego TODOS
 *    los suscriptores de ese request_id se cierran.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use legator_domain_models::command::{CommandEnvelope, OutputChunk};
use legator_domain_models::wire::{SessionFrame, SessionFrameType};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::ControlError;
use crate::services::signer::EnvelopeSigner;

/// Capacidad del carril de escritura por sesión.
const SESSION_OUTBOUND_CAPACITY: usize = 64;

/// Handle de una sesión viva de sonda.
struct ProbeSessionHandle {
    session_id: String,
    outbound_lane: mpsc::Sender<SessionFrame>,
}

/// Suscriptor individual de fragmentos de un request_id.
struct ChunkSubscriber {
    subscriber_id: u64,
    lane: mpsc::Sender<OutputChunk>,
}

/// Tabla de suscripciones compartida con los guards de limpieza.
type SubscriptionTable = Arc<Mutex<HashMap<String, Vec<ChunkSubscriber>>>>;

pub struct ConnectionHub {
    /// Mapa probe_id -> sesión viva. Propiedad exclusiva del hub.
    sessions: RwLock<HashMap<String, ProbeSessionHandle>>,
    /// Suscripciones de streaming por request_id.
    subscriptions: SubscriptionTable,
    /// Streams en vuelo: request_id -> probe_id propietario.
    active_streams: Mutex<HashMap<String, String>>,
    /// Acuñador de identificadores de suscriptor.
    subscriber_sequence: AtomicU64,
    /// Firmador de sobres de mando (opcional en entornos de prueba).
    envelope_signer: Option<Arc<EnvelopeSigner>>,
}

impl ConnectionHub {
    pub fn new(envelope_signer: Option<Arc<EnvelopeSigner>>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::with_capacity(300)),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            active_streams: Mutex::new(HashMap::new()),
            subscriber_sequence: AtomicU64::new(1),
            envelope_signer,
        }
    }

    // --- CICLO DE VIDA DE SESIONES ---

    /**
     * Registra una sesión nueva para una sonda autenticada.
     * Si existía una sesión previa, su handle se reemplaza (last-write
     * wins): el carril viejo queda sin emisores y su task de escritura
     * finaliza, cerrando el socket anterior.
     *
     * Retorna (session_id, receptor del carril de escritura).
     */
    #[instrument(skip(self))]
    pub fn register_session(&self, probe_id: &str) -> (String, mpsc::Receiver<SessionFrame>) {
        let (lane_sender, lane_receiver) = mpsc::channel::<SessionFrame>(SESSION_OUTBOUND_CAPACITY);
        let session_id = Uuid::new_v4().to_string();

        let replaced_previous = {
            let mut sessions_guard = self.sessions.write().expect("LOCK_POISONED");
            sessions_guard
                .insert(probe_id.to_string(), ProbeSessionHandle {
                    session_id: session_id.clone(),
                    outbound_lane: lane_sender,
                })
                .is_some()
        };

        if replaced_previous {
            info!("♻️ [HUB]: Probe {} reconnected. Previous session displaced.", probe_id);
        } else {
            info!("⚡ [HUB]: Probe {} session {} established.", probe_id, session_id);
        }

        (session_id, lane_receiver)
    }

    /**
     * Da de baja una sesión. El session_id discrimina sesiones
     * desplazadas: una sesión vieja no puede remover a su reemplazo.
     * Los streams en vuelo de la sonda se cierran sin frame terminal.
     */
    #[instrument(skip(self))]
    pub fn unregister_session(&self, probe_id: &str, session_id: &str) {
        let removed = {
            let mut sessions_guard = self.sessions.write().expect("LOCK_POISONED");
            match sessions_guard.get(probe_id) {
                Some(handle) if handle.session_id == session_id => {
                    sessions_guard.remove(probe_id);
                    true
                }
                _ => false,
            }
        };

        if !removed {
            return;
        }

        // Cierre de streams huérfanos de la sesión caída.
        let orphaned_requests: Vec<String> = {
            let mut streams_guard = self.active_streams.lock().expect("LOCK_POISONED");
            let orphans: Vec<String> = streams_guard
                .iter()
                .filter(|(_, owner)| owner.as_str() == probe_id)
                .map(|(request_id, _)| request_id.clone())
                .collect();
            for request_id in &orphans {
                streams_guard.remove(request_id);
            }
            orphans
        };

        if !orphaned_requests.is_empty() {
            let mut subscriptions_guard = self.subscriptions.lock().expect("LOCK_POISONED");
            for request_id in &orphaned_requests {
                subscriptions_guard.remove(request_id);
            }
            warn!("🔌 [HUB]: Session drop severed {} in-flight streams for probe {}.",
                orphaned_requests.len(), probe_id);
        }

        info!("💀 [HUB]: Probe {} session {} released.", probe_id, session_id);
    }

    /// Identificadores de sondas con sesión viva.
    pub fn connected(&self) -> Vec<String> {
        let sessions_guard = self.sessions.read().expect("LOCK_POISONED");
        let mut connected: Vec<String> = sessions_guard.keys().cloned().collect();
        connected.sort();
        connected
    }

    /// Indica si una sonda mantiene sesión viva.
    pub fn is_connected(&self, probe_id: &str) -> bool {
        let sessions_guard = self.sessions.read().expect("LOCK_POISONED");
        sessions_guard.contains_key(probe_id)
    }

    // --- ESCRITURA SALIENTE ---

    /**
     * Encola una trama hacia la sesión de una sonda.
     *
     * # Errors:
     * - `ControlError::NotConnected`: Sin sesión viva o carril colapsado.
     */
    #[instrument(skip(self, frame), fields(probe = %probe_id))]
    pub async fn send_to(&self, probe_id: &str, frame: SessionFrame) -> Result<(), ControlError> {
        let lane = {
            let sessions_guard = self.sessions.read().expect("LOCK_POISONED");
            sessions_guard
                .get(probe_id)
                .map(|handle| handle.outbound_lane.clone())
                .ok_or_else(|| ControlError::NotConnected(format!("probe {}", probe_id)))?
        };

        lane.send(frame)
            .await
            .map_err(|_| ControlError::NotConnected(format!("probe {} lane collapsed", probe_id)))
    }

    /**
     * Firma (si hay firmador) y despacha un sobre de mando.
     * Registra el stream en vuelo cuando el sobre lo solicita.
     */
    #[instrument(skip(self, envelope), fields(probe = %probe_id, request = %envelope.request_id))]
    pub async fn send_command(&self, probe_id: &str, mut envelope: CommandEnvelope) -> Result<(), ControlError> {
        if let Some(signer) = &self.envelope_signer {
            signer.attach_signature(&mut envelope)?;
        }

        if envelope.stream {
            let mut streams_guard = self.active_streams.lock().expect("LOCK_POISONED");
            streams_guard.insert(envelope.request_id.clone(), probe_id.to_string());
        }

        let frame = SessionFrame::enclose(SessionFrameType::Command, &envelope)
            .map_err(|fault| ControlError::Internal(format!("envelope encode: {}", fault)))?;

        self.send_to(probe_id, frame).await
    }

    // --- FAN-OUT DE STREAMING ---

    /**
     * Suscribe un consumidor a los fragmentos de un request_id.
     * La limpieza del guard es idempotente y también corre en Drop.
     */
    pub fn subscribe(&self, request_id: &str, capacity: usize) -> (mpsc::Receiver<OutputChunk>, StreamSubscription) {
        let (chunk_sender, chunk_receiver) = mpsc::channel::<OutputChunk>(capacity.max(1));
        let subscriber_id = self.subscriber_sequence.fetch_add(1, Ordering::Relaxed);

        {
            let mut subscriptions_guard = self.subscriptions.lock().expect("LOCK_POISONED");
            subscriptions_guard
                .entry(request_id.to_string())
                .or_default()
                .push(ChunkSubscriber { subscriber_id, lane: chunk_sender });
        }

        debug!("📡 [HUB]: Subscriber {} attached to request {}.", subscriber_id, request_id);

        let guard = StreamSubscription {
            subscriptions: Arc::clone(&self.subscriptions),
            request_id: request_id.to_string(),
            subscriber_id,
            released: AtomicBool::new(false),
        };

        (chunk_receiver, guard)
    }

    /**
     * Difunde un fragmento a todos los suscriptores de su request_id.
     *
     * # Logic:
     * - Buffer lleno => se descarta el fragmento para ESE suscriptor.
     * - Fragmento final => entrega y cierre de todos los suscriptores.
     */
    #[instrument(skip(self, chunk), fields(request = %chunk.request_id, seq = chunk.seq))]
    pub fn fan_out_chunk(&self, chunk: &OutputChunk) {
        let mut subscriptions_guard = self.subscriptions.lock().expect("LOCK_POISONED");

        if chunk.is_final {
            // Entrega terminal: los carriles se dropean tras el envío,
            // cerrando cada receptor.
            if let Some(subscribers) = subscriptions_guard.remove(&chunk.request_id) {
                for subscriber in subscribers {
                    if subscriber.lane.try_send(chunk.clone()).is_err() {
                        debug!("🐢 [HUB]: Subscriber {} missed the final chunk (buffer full or gone).",
                            subscriber.subscriber_id);
                    }
                }
            }
            drop(subscriptions_guard);

            let mut streams_guard = self.active_streams.lock().expect("LOCK_POISONED");
            streams_guard.remove(&chunk.request_id);
            return;
        }

        let Some(subscribers) = subscriptions_guard.get_mut(&chunk.request_id) else {
            return;
        };

        subscribers.retain(|subscriber| {
            match subscriber.lane.try_send(chunk.clone()) {
                Ok(_) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Política de consumidor lento: el fragmento más nuevo
                    // se pierde para este suscriptor, el hub nunca bloquea.
                    debug!("🐢 [HUB]: Dropping chunk seq {} for slow subscriber {}.",
                        chunk.seq, subscriber.subscriber_id);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

}

/**
 * Guard de limpieza de una suscripción de streaming.
 * 'close' es idempotente; Drop garantiza la liberación.
 */
pub struct StreamSubscription {
    subscriptions: SubscriptionTable,
    request_id: String,
    subscriber_id: u64,
    released: AtomicBool,
}

impl StreamSubscription {
    pub fn close(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            let mut subscriptions_guard = self.subscriptions.lock().expect("LOCK_POISONED");
            if let Some(subscribers) = subscriptions_guard.get_mut(&self.request_id) {
                subscribers.retain(|subscriber| subscriber.subscriber_id != self.subscriber_id);
                if subscribers.is_empty() {
                    subscriptions_guard.remove(&self.request_id);
                }
            }
        }
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.close();
    }
}
