// [apps/control-plane/src/services/audit.rs]
/*!
 * =================================================================
 * APARATO: AUDIT SINK SERVICE (V7.0 - SWALLOW ON FAULT)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EMISIÓN APPEND-ONLY DEL RASTRO FORENSE
 *
 * # Logic:
 * La emisión de auditoría JAMÁS falla la acción del usuario: todo fallo
 * del sumidero se degrada a una advertencia en el log. El núcleo
 * depende del trait, nunca del sumidero concreto.
 * =================================================================
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use legator_domain_models::audit::AuditEvent;
use legator_infra_db::repositories::AuditRepository;
use tracing::{debug, warn};

/// Capacidad del buffer circular del sumidero en memoria.
const MEMORY_SINK_CAPACITY: usize = 2000;

/// Capacidad de consumo de eventos que el núcleo exige a su sumidero.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Anexa un evento. Los fallos se degradan internamente a warnings.
    async fn record(&self, event: AuditEvent);

    /// Eventos más recientes, más nuevos primero.
    async fn recent(&self, limit: usize) -> Vec<AuditEvent>;
}

/// Sumidero en memoria: buffer circular FIFO.
pub struct MemoryAuditSink {
    ring_buffer: Mutex<VecDeque<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self {
            ring_buffer: Mutex::new(VecDeque::with_capacity(MEMORY_SINK_CAPACITY)),
        }
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        let mut buffer_guard = self.ring_buffer.lock().expect("LOCK_POISONED");
        if buffer_guard.len() >= MEMORY_SINK_CAPACITY {
            buffer_guard.pop_front();
        }
        debug!("📝 [AUDIT]: {} | {}", event.event_type, event.summary);
        buffer_guard.push_back(event);
    }

    async fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let buffer_guard = self.ring_buffer.lock().expect("LOCK_POISONED");
        buffer_guard.iter().rev().take(limit).cloned().collect()
    }
}

/// Sumidero durable respaldado por el repositorio de auditoría.
pub struct LedgerAuditSink {
    repository: Arc<AuditRepository>,
}

impl LedgerAuditSink {
    pub fn new(repository: Arc<AuditRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl AuditSink for LedgerAuditSink {
    async fn record(&self, event: AuditEvent) {
        if let Err(persistence_fault) = self.repository.append(&event).await {
            warn!("⚠️ [AUDIT_SINK]: Event emission swallowed: {}", persistence_fault);
        }
    }

    async fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        match self.repository.recent(limit).await {
            Ok(events) => events,
            Err(persistence_fault) => {
                warn!("⚠️ [AUDIT_SINK]: Recall failed: {}", persistence_fault);
                Vec::new()
            }
        }
    }
}
