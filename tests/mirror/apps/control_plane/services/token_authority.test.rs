// [tests/mirror/apps/control_plane/services/token_authority.test.rs]
/**
 * =================================================================
 * APARATO: TOKEN AUTHORITY TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4)
 * RESPONSABILIDAD: AT-MOST-ONCE BAJO CONCURRENCIA Y VETO DE FORJA
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use legator_control_plane::services::token_authority::{GenerateOptions, TokenAuthority};

    fn authority() -> TokenAuthority {
        TokenAuthority::new(
            vec![0x7au8; 32],
            30,
            "https://legator.example.com".into(),
            None,
        )
    }

    #[tokio::test]
    async fn certify_single_use_consumed_at_most_once() {
        let authority = authority();
        let token = authority.generate(GenerateOptions::default()).await;

        assert!(authority.consume(&token.value).await);
        assert!(!authority.consume(&token.value).await);
    }

    #[tokio::test]
    async fn certify_multi_use_survives_repeated_consumption() {
        let authority = authority();
        let token = authority
            .generate(GenerateOptions { multi_use: true, no_expiry: false })
            .await;

        assert!(authority.consume(&token.value).await);
        assert!(authority.consume(&token.value).await);
        assert!(authority.consume(&token.value).await);
    }

    #[tokio::test]
    async fn certify_forged_values_are_vetoed() {
        let authority = authority();
        let _legitimate = authority.generate(GenerateOptions::default()).await;

        assert!(!authority.consume("lgt_deadbeef.badc0ffee").await);
        assert!(!authority.consume("not-a-token").await);
        assert!(!authority.consume("").await);

        // Una etiqueta válida de OTRA autoridad (otro secreto) se rechaza.
        let foreign_authority = TokenAuthority::new(
            vec![0x11u8; 32],
            30,
            "https://other.example.com".into(),
            None,
        );
        let foreign_token = foreign_authority.generate(GenerateOptions::default()).await;
        assert!(!authority.consume(&foreign_token.value).await);
    }

    #[tokio::test]
    async fn certify_concurrent_consume_elects_single_winner() {
        let authority = Arc::new(authority());
        let token = authority.generate(GenerateOptions::default()).await;

        let mut consume_handles = Vec::new();
        for _ in 0..16 {
            let authority_reference = authority.clone();
            let token_value = token.value.clone();
            consume_handles.push(tokio::spawn(async move {
                authority_reference.consume(&token_value).await
            }));
        }

        let mut winners = 0;
        for handle in consume_handles {
            if handle.await.expect("join") {
                winners += 1;
            }
        }

        // Exactamente una invocación concurrente gana el consumo.
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn certify_active_listing_and_count() {
        let authority = authority();
        let single = authority.generate(GenerateOptions::default()).await;
        let _multi = authority
            .generate(GenerateOptions { multi_use: true, no_expiry: true })
            .await;

        assert_eq!(authority.count().await, 2);

        assert!(authority.consume(&single.value).await);
        assert_eq!(authority.count().await, 1);

        let active = authority.list_active().await;
        assert_eq!(active.len(), 1);
        assert!(active[0].multi_use);
    }
}
