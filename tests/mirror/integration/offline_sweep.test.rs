// [tests/mirror/integration/offline_sweep.test.rs]
/**
 * =================================================================
 * APARATO: OFFLINE SWEEP INTEGRATION TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (INTEGRACIÓN)
 * RESPONSABILIDAD: DAEMON SEGADOR Y RESURRECCIÓN POR LATIDO
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};
    use legator_control_plane::services::reaper::spawn_offline_reaper;
    use legator_control_plane::state::fleet_store::FleetStore;
    use legator_domain_models::probe::{PolicyLevel, ProbeState, ProbeStatus};
    use legator_domain_models::wire::HeartbeatFrame;

    fn stale_probe(id: &str, minutes_silent: i64) -> ProbeState {
        let now = Utc::now();
        ProbeState {
            id: id.into(),
            hostname: format!("{}-host", id),
            os: "linux".into(),
            arch: "amd64".into(),
            status: ProbeStatus::Online,
            policy_level: PolicyLevel::Observe,
            api_key: "lgk_test".into(),
            version: None,
            registered_at: now - Duration::hours(1),
            last_seen_at: now - Duration::minutes(minutes_silent),
            inventory: None,
            tags: vec![],
            labels: None,
            health: None,
        }
    }

    #[tokio::test]
    async fn certify_reaper_daemon_flips_silent_probes() {
        let fleet = Arc::new(FleetStore::new(None));
        fleet.register(stale_probe("prb-silent", 5)).await;
        fleet.register(stale_probe("prb-chatty", 0)).await;

        let (shutdown_sender, shutdown_receiver) = tokio::sync::watch::channel(false);
        spawn_offline_reaper(fleet.clone(), shutdown_receiver);

        // El primer tick del daemon dispara de inmediato.
        tokio::time::sleep(StdDuration::from_millis(100)).await;

        assert_eq!(fleet.get("prb-silent").unwrap().status, ProbeStatus::Offline);
        assert_eq!(fleet.get("prb-chatty").unwrap().status, ProbeStatus::Online);

        // Un latido posterior revive a la sonda y recalcula su salud.
        let revived = fleet
            .heartbeat("prb-silent", &HeartbeatFrame {
                probe_id: "prb-silent".into(),
                load: [0.1, 0.1, 0.1],
                mem_used: 10,
                mem_total: 100,
                disk_used: 10,
                disk_total: 100,
            })
            .await
            .expect("revival heartbeat");

        assert_eq!(revived.status, ProbeStatus::Online);
        assert!(revived.health.is_some());

        let _ = shutdown_sender.send(true);
    }
}
