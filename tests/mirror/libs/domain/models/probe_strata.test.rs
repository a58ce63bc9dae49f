// [tests/mirror/libs/domain/models/probe_strata.test.rs]
/**
 * =================================================================
 * APARATO: PROBE STRATA TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: NORMALIZACIÓN DE TAGS, ORDEN DE POLÍTICA Y TOKENS
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use legator_domain_models::probe::{normalize_tags, PolicyLevel, ProbeStatus};
    use legator_domain_models::token::RegistrationToken;

    #[test]
    fn certify_tag_normalization_preserves_insertion_order() {
        let raw = vec![
            "  Canary ".to_string(),
            "PROD".to_string(),
            "canary".to_string(),
            "".to_string(),
            "edge".to_string(),
        ];

        let normalized = normalize_tags(&raw);
        assert_eq!(normalized, vec!["canary", "prod", "edge"]);
    }

    #[test]
    fn certify_policy_level_hierarchy() {
        assert!(PolicyLevel::Observe < PolicyLevel::Diagnose);
        assert!(PolicyLevel::Diagnose < PolicyLevel::Remediate);
        assert_eq!(PolicyLevel::default(), PolicyLevel::Observe);
    }

    #[test]
    fn certify_status_rank_for_hostname_dedup() {
        assert!(ProbeStatus::Online.rank() > ProbeStatus::Degraded.rank());
        assert!(ProbeStatus::Degraded.rank() > ProbeStatus::Pending.rank());
        assert!(ProbeStatus::Pending.rank() > ProbeStatus::Offline.rank());
    }

    #[test]
    fn certify_token_consumability_window() {
        let now = Utc::now();
        let mut token = RegistrationToken {
            value: "lgt_ab.cd".into(),
            created_at: now,
            expires_at: now + Duration::minutes(30),
            used: false,
            multi_use: false,
        };

        assert!(token.is_consumable(now));

        token.used = true;
        assert!(!token.is_consumable(now));

        token.multi_use = true;
        assert!(token.is_consumable(now));

        // El vencimiento veta incluso a los multi-uso.
        assert!(!token.is_consumable(now + Duration::minutes(31)));
    }

    #[test]
    fn certify_install_command_rendering() {
        let now = Utc::now();
        let token = RegistrationToken {
            value: "lgt_ab.cd".into(),
            created_at: now,
            expires_at: now + Duration::minutes(30),
            used: false,
            multi_use: false,
        };

        let rendered = token.install_command("https://legator.example.com/");
        assert!(rendered.contains("--server https://legator.example.com"));
        assert!(rendered.contains("--token lgt_ab.cd"));
        assert!(!rendered.contains(".com//"));
    }
}
