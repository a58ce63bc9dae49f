// [tests/mirror/libs/infra/db/token_persistence.test.rs]
/**
 * =================================================================
 * APARATO: TOKEN PERSISTENCE TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3)
 * RESPONSABILIDAD: CONSUMO ATÓMICO Y PURGA DE LLAVES VENCIDAS
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use legator_domain_models::token::RegistrationToken;
    use legator_infra_db::repositories::TokenRepository;
    use legator_infra_db::LedgerClient;

    fn sample_token(value: &str, ttl_minutes: i64) -> RegistrationToken {
        let now = Utc::now();
        RegistrationToken {
            value: value.into(),
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
            used: false,
            multi_use: false,
        }
    }

    async fn repository() -> TokenRepository {
        let client = LedgerClient::connect(":memory:", None)
            .await
            .expect("memory ledger must ignite");
        TokenRepository::new(client)
    }

    #[tokio::test]
    async fn certify_mark_used_wins_exactly_once() {
        let repository = repository().await;
        repository.upsert(&sample_token("lgt_one.tag", 30)).await.expect("upsert");

        // La primera transición gana; la segunda no afecta filas.
        assert!(repository.mark_used("lgt_one.tag").await.expect("first consume"));
        assert!(!repository.mark_used("lgt_one.tag").await.expect("second consume"));
    }

    #[tokio::test]
    async fn certify_unknown_token_does_not_transition() {
        let repository = repository().await;
        assert!(!repository.mark_used("lgt_ghost.tag").await.expect("ghost consume"));
    }

    #[tokio::test]
    async fn certify_expired_purge() {
        let repository = repository().await;
        repository.upsert(&sample_token("lgt_live.tag", 30)).await.expect("upsert live");
        repository.upsert(&sample_token("lgt_dead.tag", -5)).await.expect("upsert dead");

        let purged = repository
            .delete_expired(&Utc::now().to_rfc3339())
            .await
            .expect("purge");
        assert_eq!(purged, 1);

        let survivors = repository.load_all().await.expect("load");
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].value, "lgt_live.tag");
    }
}
