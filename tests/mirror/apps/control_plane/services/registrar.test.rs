// [tests/mirror/apps/control_plane/services/registrar.test.rs]
/**
 * =================================================================
 * APARATO: PROBE REGISTRAR TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4)
 * RESPONSABILIDAD: ENROLAMIENTO, DEDUPE POR HOSTNAME Y ROTACIÓN
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use legator_control_plane::services::audit::{AuditSink, MemoryAuditSink};
    use legator_control_plane::services::registrar::RegistrationService;
    use legator_control_plane::services::token_authority::{GenerateOptions, TokenAuthority};
    use legator_control_plane::state::fleet_store::FleetStore;
    use legator_domain_models::probe::PolicyLevel;
    use legator_domain_models::registration::RegistrationRequest;

    struct Harness {
        fleet: Arc<FleetStore>,
        authority: Arc<TokenAuthority>,
        audit: Arc<MemoryAuditSink>,
        registrar: RegistrationService,
    }

    fn harness() -> Harness {
        let fleet = Arc::new(FleetStore::new(None));
        let authority = Arc::new(TokenAuthority::new(
            vec![0x55u8; 32],
            30,
            "https://legator.example.com".into(),
            None,
        ));
        let audit = Arc::new(MemoryAuditSink::new());
        let registrar = RegistrationService::new(
            fleet.clone(),
            authority.clone(),
            audit.clone() as Arc<dyn AuditSink>,
        );
        Harness { fleet, authority, audit, registrar }
    }

    fn request(token: &str, hostname: &str, arch: &str, tags: &[&str]) -> RegistrationRequest {
        RegistrationRequest {
            token: token.into(),
            hostname: hostname.into(),
            os: "linux".into(),
            arch: arch.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            version: Some("1.2.0".into()),
        }
    }

    #[tokio::test]
    async fn certify_fresh_registration_defaults() {
        let harness = harness();
        let token = harness.authority.generate(GenerateOptions::default()).await;

        let receipt = harness
            .registrar
            .register(request(&token.value, "fresh-host", "amd64", &["Edge"]))
            .await
            .expect("registration");

        assert!(receipt.probe_id.starts_with("prb-"));
        assert!(receipt.api_key.starts_with("lgk_"));
        assert_eq!(receipt.policy_id, "default-observe");

        let probe = harness.fleet.get(&receipt.probe_id).expect("probe in fleet");
        assert_eq!(probe.policy_level, PolicyLevel::Observe);
        assert_eq!(probe.tags, vec!["edge"]);
    }

    #[tokio::test]
    async fn certify_invalid_token_is_unauthorized() {
        let harness = harness();
        let rejection = harness
            .registrar
            .register(request("lgt_forged.tag", "host-x", "amd64", &[]))
            .await;
        assert!(rejection.is_err());
        assert!(harness.fleet.list().is_empty());
    }

    #[tokio::test]
    async fn certify_hostname_re_registration_preserves_id_and_rotates_key() {
        let harness = harness();

        let first_token = harness.authority.generate(GenerateOptions::default()).await;
        let first_receipt = harness
            .registrar
            .register(request(&first_token.value, "dedup-host", "amd64", &[]))
            .await
            .expect("first registration");

        // Ajuste de política posterior al primer registro.
        harness
            .fleet
            .set_policy(&first_receipt.probe_id, PolicyLevel::Diagnose)
            .await
            .expect("policy");

        let second_token = harness.authority.generate(GenerateOptions::default()).await;
        let second_receipt = harness
            .registrar
            .register(request(&second_token.value, "dedup-host", "arm64", &["canary"]))
            .await
            .expect("re-registration");

        // Identidad estable, llave rotada.
        assert_eq!(second_receipt.probe_id, first_receipt.probe_id);
        assert_ne!(second_receipt.api_key, first_receipt.api_key);

        // Una sola entrada de flota, refrescada, con política preservada.
        let fleet_listing = harness.fleet.list();
        assert_eq!(fleet_listing.len(), 1);
        assert_eq!(fleet_listing[0].arch, "arm64");
        assert_eq!(fleet_listing[0].tags, vec!["canary"]);
        assert_eq!(fleet_listing[0].policy_level, PolicyLevel::Diagnose);

        // El rastro forense distingue registro de re-registro.
        let trail = harness.audit.recent(10).await;
        let event_types: Vec<&str> = trail.iter().map(|e| e.event_type.as_str()).collect();
        assert!(event_types.contains(&"registered"));
        assert!(event_types.contains(&"re-registered"));
    }

    #[tokio::test]
    async fn certify_blank_hostname_is_bad_request() {
        let harness = harness();
        let token = harness.authority.generate(GenerateOptions::default()).await;

        let rejection = harness
            .registrar
            .register(request(&token.value, "   ", "amd64", &[]))
            .await;
        assert!(rejection.is_err());
    }
}
