// [tests/mirror/apps/control_plane/state/fleet_store.test.rs]
/**
 * =================================================================
 * APARATO: FLEET STORE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-APP)
 * RESPONSABILIDAD: MUTACIONES CANÓNICAS, DEDUPE Y AGREGADOS
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use legator_control_plane::state::fleet_store::FleetStore;
    use legator_domain_models::probe::{PolicyLevel, ProbeState, ProbeStatus};
    use legator_domain_models::wire::{HeartbeatFrame, InventoryFrame};

    fn sample_probe(id: &str, hostname: &str, status: ProbeStatus) -> ProbeState {
        let now = Utc::now();
        ProbeState {
            id: id.into(),
            hostname: hostname.into(),
            os: "linux".into(),
            arch: "amd64".into(),
            status,
            policy_level: PolicyLevel::Observe,
            api_key: "lgk_test".into(),
            version: None,
            registered_at: now,
            last_seen_at: now,
            inventory: None,
            tags: vec![],
            labels: None,
            health: None,
        }
    }

    fn nominal_heartbeat(probe_id: &str) -> HeartbeatFrame {
        HeartbeatFrame {
            probe_id: probe_id.into(),
            load: [0.1, 0.1, 0.1],
            mem_used: 10,
            mem_total: 100,
            disk_used: 10,
            disk_total: 100,
        }
    }

    fn sample_inventory(probe_id: &str, cpus: u32, mem_total: u64) -> InventoryFrame {
        InventoryFrame {
            probe_id: probe_id.into(),
            hostname: "host".into(),
            os: "linux".into(),
            arch: "amd64".into(),
            kernel: "6.8".into(),
            cpus,
            mem_total,
            disk_total: 1_000,
            services: None,
            collected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn certify_heartbeat_refreshes_liveness_and_health() {
        let fleet = FleetStore::new(None);
        let mut probe = sample_probe("prb-hb", "hb-host", ProbeStatus::Offline);
        probe.last_seen_at = Utc::now() - Duration::minutes(5);
        fleet.register(probe).await;

        let refreshed = fleet
            .heartbeat("prb-hb", &nominal_heartbeat("prb-hb"))
            .await
            .expect("heartbeat");

        assert_eq!(refreshed.status, ProbeStatus::Online);
        assert!(refreshed.health.is_some());
        assert!(refreshed.last_seen_at > Utc::now() - Duration::seconds(5));
    }

    #[tokio::test]
    async fn certify_degrading_heartbeat_flips_status() {
        let fleet = FleetStore::new(None);
        fleet.register(sample_probe("prb-deg", "deg-host", ProbeStatus::Online)).await;

        // Tres ejes críticos: puntaje 10 => banda critical => degraded.
        let stressed = HeartbeatFrame {
            probe_id: "prb-deg".into(),
            load: [9.0, 9.0, 9.0],
            mem_used: 99,
            mem_total: 100,
            disk_used: 99,
            disk_total: 100,
        };

        let refreshed = fleet.heartbeat("prb-deg", &stressed).await.expect("heartbeat");
        assert_eq!(refreshed.status, ProbeStatus::Degraded);
    }

    #[tokio::test]
    async fn certify_unknown_heartbeat_auto_registers_pending() {
        let fleet = FleetStore::new(None);

        let ghost = fleet
            .heartbeat("prb-ghost", &nominal_heartbeat("prb-ghost"))
            .await
            .expect("auto-registration");

        assert_eq!(ghost.hostname, "");
        assert_eq!(ghost.policy_level, PolicyLevel::Observe);
        assert!(fleet.get("prb-ghost").is_some());
    }

    #[tokio::test]
    async fn certify_offline_sweep_threshold() {
        let fleet = FleetStore::new(None);
        let mut stale = sample_probe("prb-stale", "stale-host", ProbeStatus::Online);
        stale.last_seen_at = Utc::now() - Duration::minutes(5);
        fleet.register(stale).await;
        fleet.register(sample_probe("prb-fresh", "fresh-host", ProbeStatus::Online)).await;

        let reaped = fleet.mark_offline(Duration::seconds(60)).await;

        assert_eq!(reaped, vec!["prb-stale".to_string()]);
        assert_eq!(fleet.get("prb-stale").unwrap().status, ProbeStatus::Offline);
        assert_eq!(fleet.get("prb-fresh").unwrap().status, ProbeStatus::Online);

        // Un latido posterior revive a la sonda segada.
        let revived = fleet
            .heartbeat("prb-stale", &nominal_heartbeat("prb-stale"))
            .await
            .expect("revival heartbeat");
        assert_eq!(revived.status, ProbeStatus::Online);
    }

    #[tokio::test]
    async fn certify_hostname_dedup_ranking() {
        let fleet = FleetStore::new(None);

        let mut offline_twin = sample_probe("prb-aaa", "twin-host", ProbeStatus::Offline);
        offline_twin.last_seen_at = Utc::now() - Duration::hours(2);
        fleet.register(offline_twin).await;

        let online_twin = sample_probe("prb-bbb", "twin-host", ProbeStatus::Online);
        fleet.register(online_twin).await;

        // El rango de estado domina sobre la antigüedad.
        let resolved = fleet.find_by_hostname("twin-host").expect("candidate");
        assert_eq!(resolved.id, "prb-bbb");

        // La coincidencia es exacta y sensible a mayúsculas.
        assert!(fleet.find_by_hostname("Twin-Host").is_none());
    }

    #[tokio::test]
    async fn certify_tags_normalization_on_set() {
        let fleet = FleetStore::new(None);
        fleet.register(sample_probe("prb-tags", "tag-host", ProbeStatus::Online)).await;

        let updated = fleet
            .set_tags("prb-tags", &["  Edge ".into(), "PROD".into(), "edge".into()])
            .await
            .expect("set tags");

        assert_eq!(updated.tags, vec!["edge", "prod"]);
        assert_eq!(fleet.list_by_tag("EDGE").len(), 1);
        assert_eq!(*fleet.tag_counts().get("prod").unwrap(), 1);
    }

    #[tokio::test]
    async fn certify_inventory_aggregates_match_filtered_set() {
        let fleet = FleetStore::new(None);

        let mut alpha = sample_probe("prb-alpha", "alpha", ProbeStatus::Online);
        alpha.tags = vec!["edge".into()];
        alpha.inventory = Some(sample_inventory("prb-alpha", 4, 1_000));
        fleet.register(alpha).await;

        let mut beta = sample_probe("prb-beta", "beta", ProbeStatus::Offline);
        beta.tags = vec!["edge".into()];
        beta.inventory = Some(sample_inventory("prb-beta", 8, 2_000));
        fleet.register(beta).await;

        let mut gamma = sample_probe("prb-gamma", "gamma", ProbeStatus::Online);
        gamma.tags = vec!["core".into()];
        gamma.inventory = Some(sample_inventory("prb-gamma", 16, 4_000));
        fleet.register(gamma).await;

        // Filtro por etiqueta: agregados sobre el MISMO conjunto filtrado.
        let edge_report = fleet.inventory(Some("edge"), None);
        assert_eq!(edge_report.aggregates.total_probes, edge_report.probes.len());
        assert_eq!(edge_report.aggregates.total_probes, 2);
        assert_eq!(edge_report.aggregates.online_probes, 1);
        assert_eq!(edge_report.aggregates.total_cpus, 12);
        assert_eq!(edge_report.aggregates.total_memory_bytes, 3_000);

        // Filtro combinado etiqueta + estado.
        let edge_online = fleet.inventory(Some("edge"), Some(ProbeStatus::Online));
        assert_eq!(edge_online.aggregates.total_probes, 1);
        assert_eq!(edge_online.probes[0].id, "prb-alpha");
    }

    #[tokio::test]
    async fn certify_inventory_update_implies_liveness() {
        let fleet = FleetStore::new(None);
        let mut probe = sample_probe("prb-inv", "inv-host", ProbeStatus::Online);
        probe.last_seen_at = Utc::now() - Duration::minutes(10);
        fleet.register(probe).await;

        fleet
            .update_inventory("prb-inv", sample_inventory("prb-inv", 2, 500))
            .await
            .expect("inventory update");

        let refreshed = fleet.get("prb-inv").unwrap();
        assert!(refreshed.last_seen_at > Utc::now() - Duration::seconds(5));
        assert_eq!(refreshed.inventory.unwrap().cpus, 2);
    }
}
