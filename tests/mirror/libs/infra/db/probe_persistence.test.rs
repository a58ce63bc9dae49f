// [tests/mirror/libs/infra/db/probe_persistence.test.rs]
/**
 * =================================================================
 * APARATO: PROBE PERSISTENCE TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3)
 * RESPONSABILIDAD: CICLO UPSERT -> HIDRATACIÓN -> BAJA EN EL ESPEJO
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use legator_domain_models::probe::{PolicyLevel, ProbeState, ProbeStatus};
    use legator_infra_db::repositories::ProbeRepository;
    use legator_infra_db::LedgerClient;

    fn sample_probe(id: &str, hostname: &str) -> ProbeState {
        let now = Utc::now();
        ProbeState {
            id: id.into(),
            hostname: hostname.into(),
            os: "linux".into(),
            arch: "amd64".into(),
            status: ProbeStatus::Online,
            policy_level: PolicyLevel::Observe,
            api_key: "lgk_test".into(),
            version: Some("1.0.0".into()),
            registered_at: now,
            last_seen_at: now,
            inventory: None,
            tags: vec!["edge".into()],
            labels: None,
            health: None,
        }
    }

    async fn memory_client() -> LedgerClient {
        LedgerClient::connect(":memory:", None)
            .await
            .expect("memory ledger must ignite")
    }

    #[tokio::test]
    async fn certify_upsert_and_bulk_hydration() {
        let repository = ProbeRepository::new(memory_client().await);

        repository.upsert(&sample_probe("prb-aaa", "alpha")).await.expect("upsert alpha");
        repository.upsert(&sample_probe("prb-bbb", "beta")).await.expect("upsert beta");

        let hydrated = repository.load_all().await.expect("bulk load");
        assert_eq!(hydrated.len(), 2);

        let mut identifiers: Vec<String> = hydrated.iter().map(|p| p.id.clone()).collect();
        identifiers.sort();
        assert_eq!(identifiers, vec!["prb-aaa", "prb-bbb"]);
    }

    #[tokio::test]
    async fn certify_upsert_replaces_document() {
        let repository = ProbeRepository::new(memory_client().await);

        let mut probe = sample_probe("prb-ccc", "gamma");
        repository.upsert(&probe).await.expect("initial upsert");

        probe.arch = "arm64".into();
        probe.status = ProbeStatus::Degraded;
        repository.upsert(&probe).await.expect("replacing upsert");

        let hydrated = repository.load_all().await.expect("bulk load");
        assert_eq!(hydrated.len(), 1);
        assert_eq!(hydrated[0].arch, "arm64");
        assert_eq!(hydrated[0].status, ProbeStatus::Degraded);
    }

    #[tokio::test]
    async fn certify_delete_removes_document() {
        let repository = ProbeRepository::new(memory_client().await);

        repository.upsert(&sample_probe("prb-ddd", "delta")).await.expect("upsert");
        repository.delete("prb-ddd").await.expect("delete");

        let hydrated = repository.load_all().await.expect("bulk load");
        assert!(hydrated.is_empty());
    }
}
