// [apps/control-plane/src/state/fleet_store.rs]
/*!
 * =================================================================
 * APARATO: FLEET STORE MANAGER (V19.0 - WRITE-THROUGH SOVEREIGN)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: PROPIEDAD EXCLUSIVA DEL ESTADO CANÓNICO DE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RAM AUTHORITY: La memoria es autoritativa para lecturas y
 *    mutaciones; el espejo durable es write-through de mejor esfuerzo.
 *    Un fallo del espejo se registra y NO revierte la mutación en RAM.
 * 2. LINEARIZABLE PER PROBE: Toda mutación se sella bajo el candado de
 *    escritura; las lecturas entregan instantáneas consistentes.
 * 3. HEALTH PIPELINE: Cada latido refresca 'last_seen_at', recalcula el
 *    puntaje de salud y ajusta el estado online/degraded.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use legator_domain_cortex::health::evaluate_probe_health;
use legator_domain_models::inventory::{FleetInventoryReport, InventoryAggregates, ProbeInventorySummary};
use legator_domain_models::probe::{normalize_tags, HealthBand, PolicyLevel, ProbeState, ProbeStatus};
use legator_domain_models::wire::{HeartbeatFrame, InventoryFrame};
use legator_infra_db::repositories::ProbeRepository;
use tracing::{debug, info, instrument, warn};

use crate::errors::ControlError;

pub struct FleetStore {
    /// Mapa canónico probe_id -> estado. Mutaciones serializadas por el candado.
    probes: RwLock<HashMap<String, ProbeState>>,
    /// Espejo durable write-through (ausente en despliegues sólo-RAM).
    durable_mirror: Option<Arc<ProbeRepository>>,
}

impl FleetStore {
    pub fn new(durable_mirror: Option<Arc<ProbeRepository>>) -> Self {
        Self {
            probes: RwLock::new(HashMap::with_capacity(300)),
            durable_mirror,
        }
    }

    /// Hidratación masiva desde el espejo durable durante la ignición.
    pub fn hydrate(&self, fleet: Vec<ProbeState>) {
        let mut fleet_guard = self.probes.write().expect("LOCK_POISONED: Fleet strata compromised.");
        let hydrated_count = fleet.len();
        for probe in fleet {
            fleet_guard.insert(probe.id.clone(), probe);
        }
        if hydrated_count > 0 {
            info!("💾 [FLEET]: {} probe documents hydrated from durable mirror.", hydrated_count);
        }
    }

    // --- MUTACIONES CANÓNICAS ---

    /// Inserta o reemplaza el estado completo de una sonda (registro).
    #[instrument(skip(self, probe), fields(probe = %probe.id))]
    pub async fn register(&self, probe: ProbeState) {
        {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            fleet_guard.insert(probe.id.clone(), probe.clone());
        }
        self.mirror_upsert(&probe).await;
    }

    /**
     * Procesa un pulso biométrico: refresca 'last_seen_at', recalcula la
     * salud y transiciona el estado (degraded si la banda lo exige).
     *
     * Un latido de una sonda desconocida la auto-registra como 'pending'
     * con identidad vacía; el operador lo verá en el listado de flota.
     */
    #[instrument(skip(self, heartbeat), fields(probe = %probe_id))]
    pub async fn heartbeat(&self, probe_id: &str, heartbeat: &HeartbeatFrame) -> Result<ProbeState, ControlError> {
        let snapshot = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");

            if !fleet_guard.contains_key(probe_id) {
                warn!("👻 [FLEET]: Heartbeat from unregistered probe {}. Auto-registering as pending.", probe_id);
                fleet_guard.insert(probe_id.to_string(), ProbeState {
                    id: probe_id.to_string(),
                    hostname: String::new(),
                    os: String::new(),
                    arch: String::new(),
                    status: ProbeStatus::Pending,
                    policy_level: PolicyLevel::Observe,
                    api_key: String::new(),
                    version: None,
                    registered_at: Utc::now(),
                    last_seen_at: Utc::now(),
                    inventory: None,
                    tags: Vec::new(),
                    labels: None,
                    health: None,
                });
            }

            let probe = fleet_guard
                .get_mut(probe_id)
                .expect("presence sealed above while holding the write lock");

            let known_cpu_count = probe.inventory.as_ref().map(|inv| inv.cpus).unwrap_or(0);
            let health_report = evaluate_probe_health(heartbeat, known_cpu_count);

            probe.last_seen_at = Utc::now();
            probe.status = match health_report.band {
                HealthBand::Critical | HealthBand::Degraded => ProbeStatus::Degraded,
                _ => ProbeStatus::Online,
            };
            probe.health = Some(health_report);

            probe.clone()
        };

        self.mirror_upsert(&snapshot).await;
        Ok(snapshot)
    }

    /// Refresca el inventario. El inventario implica vida: sella 'last_seen_at'.
    #[instrument(skip(self, inventory), fields(probe = %probe_id))]
    pub async fn update_inventory(&self, probe_id: &str, inventory: InventoryFrame) -> Result<(), ControlError> {
        let snapshot = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            let probe = fleet_guard
                .get_mut(probe_id)
                .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;

            probe.last_seen_at = Utc::now();
            probe.inventory = Some(inventory);
            probe.clone()
        };

        self.mirror_upsert(&snapshot).await;
        Ok(())
    }

    /// Ajusta el nivel de política autorizado.
    #[instrument(skip(self))]
    pub async fn set_policy(&self, probe_id: &str, level: PolicyLevel) -> Result<ProbeState, ControlError> {
        let snapshot = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            let probe = fleet_guard
                .get_mut(probe_id)
                .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;
            probe.policy_level = level;
            probe.clone()
        };

        info!("🛂 [FLEET]: Probe {} policy leveled to {:?}.", probe_id, level);
        self.mirror_upsert(&snapshot).await;
        Ok(snapshot)
    }

    /// Rota la llave de sesión de una sonda.
    #[instrument(skip(self, api_key))]
    pub async fn set_api_key(&self, probe_id: &str, api_key: String) -> Result<(), ControlError> {
        let snapshot = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            let probe = fleet_guard
                .get_mut(probe_id)
                .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;
            probe.api_key = api_key;
            probe.clone()
        };
        self.mirror_upsert(&snapshot).await;
        Ok(())
    }

    /// Reemplaza las etiquetas aplicando la normalización canónica.
    #[instrument(skip(self, raw_tags))]
    pub async fn set_tags(&self, probe_id: &str, raw_tags: &[String]) -> Result<ProbeState, ControlError> {
        let snapshot = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            let probe = fleet_guard
                .get_mut(probe_id)
                .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;
            probe.tags = normalize_tags(raw_tags);
            probe.clone()
        };
        self.mirror_upsert(&snapshot).await;
        Ok(snapshot)
    }

    /// Fuerza el estado online (usado al confirmar sesión viva).
    #[instrument(skip(self))]
    pub async fn set_online(&self, probe_id: &str) -> Result<(), ControlError> {
        let snapshot = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            let probe = fleet_guard
                .get_mut(probe_id)
                .ok_or_else(|| ControlError::NotFound(format!("probe {}", probe_id)))?;
            probe.status = ProbeStatus::Online;
            probe.last_seen_at = Utc::now();
            probe.clone()
        };
        self.mirror_upsert(&snapshot).await;
        Ok(())
    }

    /**
     * Barrido de obsolescencia: toda sonda no-offline cuyo último pulso
     * sea anterior a (ahora - umbral) transiciona a offline.
     * Retorna los identificadores segados.
     */
    #[instrument(skip(self))]
    pub async fn mark_offline(&self, threshold: Duration) -> Vec<String> {
        let expiration_boundary = Utc::now() - threshold;
        let mut reaped_snapshots = Vec::new();

        {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            for probe in fleet_guard.values_mut() {
                if probe.status != ProbeStatus::Offline && probe.last_seen_at < expiration_boundary {
                    probe.status = ProbeStatus::Offline;
                    reaped_snapshots.push(probe.clone());
                }
            }
        }

        let mut reaped_identifiers = Vec::with_capacity(reaped_snapshots.len());
        for snapshot in &reaped_snapshots {
            self.mirror_upsert(snapshot).await;
            reaped_identifiers.push(snapshot.id.clone());
        }

        if !reaped_identifiers.is_empty() {
            info!("💀 [FLEET_REAPER]: {} probes flipped offline.", reaped_identifiers.len());
        }
        reaped_identifiers
    }

    /// Purga sondas offline más antiguas que el TTL entregado.
    #[instrument(skip(self))]
    pub async fn cleanup_offline(&self, ttl: Duration) -> usize {
        let expiration_boundary = Utc::now() - ttl;
        let purged_identifiers: Vec<String> = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            let victims: Vec<String> = fleet_guard
                .values()
                .filter(|probe| probe.status == ProbeStatus::Offline && probe.last_seen_at < expiration_boundary)
                .map(|probe| probe.id.clone())
                .collect();
            for victim in &victims {
                fleet_guard.remove(victim);
            }
            victims
        };

        for identifier in &purged_identifiers {
            self.mirror_delete(identifier).await;
        }
        purged_identifiers.len()
    }

    /// Da de baja una sonda individual.
    #[instrument(skip(self))]
    pub async fn delete(&self, probe_id: &str) -> bool {
        let removed = {
            let mut fleet_guard = self.probes.write().expect("LOCK_POISONED");
            fleet_guard.remove(probe_id).is_some()
        };
        if removed {
            self.mirror_delete(probe_id).await;
        }
        removed
    }

    // --- LECTURAS CONSISTENTES ---

    /// Instantánea de una sonda individual.
    pub fn get(&self, probe_id: &str) -> Option<ProbeState> {
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");
        fleet_guard.get(probe_id).cloned()
    }

    /// Listado completo de la flota.
    pub fn list(&self) -> Vec<ProbeState> {
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");
        let mut fleet: Vec<ProbeState> = fleet_guard.values().cloned().collect();
        fleet.sort_by(|a, b| a.id.cmp(&b.id));
        fleet
    }

    /// Sondas que portan la etiqueta entregada (comparación canónica).
    pub fn list_by_tag(&self, tag: &str) -> Vec<ProbeState> {
        let canonical_tag = tag.trim().to_lowercase();
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");
        fleet_guard
            .values()
            .filter(|probe| probe.tags.iter().any(|t| *t == canonical_tag))
            .cloned()
            .collect()
    }

    /// Distribución de etiquetas en toda la flota.
    pub fn tag_counts(&self) -> HashMap<String, usize> {
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");
        let mut distribution = HashMap::new();
        for probe in fleet_guard.values() {
            for tag in &probe.tags {
                *distribution.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        distribution
    }

    /// Conteo de sondas por estado operativo.
    pub fn count_by_status(&self) -> HashMap<String, usize> {
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");
        let mut counts = HashMap::new();
        for probe in fleet_guard.values() {
            let label = match probe.status {
                ProbeStatus::Pending => "pending",
                ProbeStatus::Online => "online",
                ProbeStatus::Degraded => "degraded",
                ProbeStatus::Offline => "offline",
            };
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /**
     * Resuelve la identidad de re-registro por hostname exacto.
     *
     * # Logic (orden de preferencia):
     * 1. Rango de estado: online > degraded > pending > offline.
     * 2. 'last_seen_at' más reciente.
     * 3. 'registered_at' más reciente.
     * 4. Identificador lexicográficamente menor.
     */
    pub fn find_by_hostname(&self, hostname: &str) -> Option<ProbeState> {
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");
        let mut candidates: Vec<&ProbeState> = fleet_guard
            .values()
            .filter(|probe| probe.hostname == hostname)
            .collect();

        candidates.sort_by(|a, b| {
            b.status.rank().cmp(&a.status.rank())
                .then(b.last_seen_at.cmp(&a.last_seen_at))
                .then(b.registered_at.cmp(&a.registered_at))
                .then(a.id.cmp(&b.id))
        });

        candidates.first().map(|probe| (*probe).clone())
    }

    /**
     * Reporte de inventario filtrado por etiqueta Y estado, con agregados
     * calculados sobre el mismo conjunto filtrado.
     */
    #[instrument(skip(self))]
    pub fn inventory(&self, tag_filter: Option<&str>, status_filter: Option<ProbeStatus>) -> FleetInventoryReport {
        let canonical_tag = tag_filter.map(|tag| tag.trim().to_lowercase());
        let fleet_guard = self.probes.read().expect("LOCK_POISONED");

        let mut summaries = Vec::new();
        let mut aggregates = InventoryAggregates::default();

        for probe in fleet_guard.values() {
            if let Some(tag) = &canonical_tag {
                if !probe.tags.iter().any(|t| t == tag) {
                    continue;
                }
            }
            if let Some(status) = status_filter {
                if probe.status != status {
                    continue;
                }
            }

            let (cpus, mem_total, disk_total) = probe
                .inventory
                .as_ref()
                .map(|inv| (inv.cpus, inv.mem_total, inv.disk_total))
                .unwrap_or((0, 0, 0));

            aggregates.total_probes += 1;
            if probe.status == ProbeStatus::Online {
                aggregates.online_probes += 1;
            }
            aggregates.total_cpus += cpus as u64;
            aggregates.total_memory_bytes += mem_total;
            if !probe.os.is_empty() {
                *aggregates.probes_by_os.entry(probe.os.clone()).or_insert(0) += 1;
            }
            for tag in &probe.tags {
                *aggregates.tag_distribution.entry(tag.clone()).or_insert(0) += 1;
            }

            summaries.push(ProbeInventorySummary {
                id: probe.id.clone(),
                hostname: probe.hostname.clone(),
                os: probe.os.clone(),
                arch: probe.arch.clone(),
                status: probe.status,
                policy_level: probe.policy_level,
                tags: probe.tags.clone(),
                cpus,
                mem_total,
                disk_total,
                health: probe.health.clone(),
            });
        }

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        debug!("📊 [FLEET]: Inventory report assembled ({} probes).", aggregates.total_probes);

        FleetInventoryReport { probes: summaries, aggregates }
    }

    // --- ESPEJO DURABLE (WRITE-THROUGH DE MEJOR ESFUERZO) ---

    async fn mirror_upsert(&self, snapshot: &ProbeState) {
        if let Some(mirror) = &self.durable_mirror {
            if let Err(persistence_fault) = mirror.upsert(snapshot).await {
                warn!("⚠️ [FLEET_MIRROR]: Write-through failed for probe {}: {}",
                    snapshot.id, persistence_fault);
            }
        }
    }

    async fn mirror_delete(&self, probe_id: &str) {
        if let Some(mirror) = &self.durable_mirror {
            if let Err(persistence_fault) = mirror.delete(probe_id).await {
                warn!("⚠️ [FLEET_MIRROR]: Delete write-through failed for probe {}: {}",
                    probe_id, persistence_fault);
            }
        }
    }
}
