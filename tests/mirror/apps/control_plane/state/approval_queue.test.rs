// [tests/mirror/apps/control_plane/state/approval_queue.test.rs]
/**
 * =================================================================
 * APARATO: APPROVAL QUEUE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-APP)
 * RESPONSABILIDAD: TERMINALIDAD ATÓMICA, ESPERAS Y SEGADO TTL
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use legator_control_plane::state::approval_queue::ApprovalQueue;
    use legator_domain_models::approval::{ApprovalDecision, ApprovalStatus, RiskLevel};
    use legator_domain_models::command::CommandSpec;

    fn sample_spec(command: &str) -> CommandSpec {
        CommandSpec {
            command: command.into(),
            args: vec![],
            request_id: None,
            timeout_seconds: 30,
            stream: false,
            note: None,
        }
    }

    #[tokio::test]
    async fn certify_single_terminal_transition() {
        let queue = ApprovalQueue::new(10, 15);
        let request = queue
            .submit("prb-x", sample_spec("rm"), None, RiskLevel::High, "operator")
            .expect("submit");

        let sealed = queue
            .decide(&request.id, ApprovalDecision::Approved, "ops")
            .expect("first decision");
        assert_eq!(sealed.status, ApprovalStatus::Approved);
        assert_eq!(sealed.decided_by.as_deref(), Some("ops"));

        // La segunda decisión (incluso divergente) es un conflicto.
        let conflict = queue.decide(&request.id, ApprovalDecision::Denied, "intruder");
        assert!(conflict.is_err());
        assert_eq!(queue.get(&request.id).unwrap().status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn certify_concurrent_waiters_observe_same_verdict() {
        let queue = Arc::new(ApprovalQueue::new(10, 15));
        let request = queue
            .submit("prb-x", sample_spec("systemctl"), None, RiskLevel::Medium, "operator")
            .expect("submit");

        let mut waiter_handles = Vec::new();
        for _ in 0..3 {
            let queue_reference = queue.clone();
            let approval_id = request.id.clone();
            waiter_handles.push(tokio::spawn(async move {
                queue_reference
                    .wait_for_decision(&approval_id, StdDuration::from_secs(5))
                    .await
            }));
        }

        // Pequeño margen para que las esperas se registren.
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        queue
            .decide(&request.id, ApprovalDecision::Denied, "ops")
            .expect("decision");

        for handle in waiter_handles {
            let observed = handle.await.expect("join").expect("wait");
            assert_eq!(observed.status, ApprovalStatus::Denied);
            assert_eq!(observed.decided_by.as_deref(), Some("ops"));
        }
    }

    #[tokio::test]
    async fn certify_wait_timeout_and_not_found() {
        let queue = ApprovalQueue::new(10, 15);
        let request = queue
            .submit("prb-x", sample_spec("apt"), None, RiskLevel::Medium, "operator")
            .expect("submit");

        let timed_out = queue
            .wait_for_decision(&request.id, StdDuration::from_millis(30))
            .await;
        assert!(timed_out.is_err());

        let missing = queue
            .wait_for_decision("apr-ghost", StdDuration::from_millis(30))
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn certify_capacity_bound() {
        let queue = ApprovalQueue::new(2, 15);
        queue.submit("prb-1", sample_spec("rm"), None, RiskLevel::High, "op").expect("first");
        queue.submit("prb-2", sample_spec("rm"), None, RiskLevel::High, "op").expect("second");

        let overflow = queue.submit("prb-3", sample_spec("rm"), None, RiskLevel::High, "op");
        assert!(overflow.is_err());
        assert_eq!(queue.pending_count(), 2);
    }

    #[tokio::test]
    async fn certify_ttl_reaper_expires_and_wakes_waiters() {
        // TTL cero: todo expediente nace vencido.
        let queue = Arc::new(ApprovalQueue::new(10, 0));
        let request = queue
            .submit("prb-x", sample_spec("dd"), None, RiskLevel::Critical, "operator")
            .expect("submit");

        let queue_reference = queue.clone();
        let approval_id = request.id.clone();
        let waiter = tokio::spawn(async move {
            queue_reference
                .wait_for_decision(&approval_id, StdDuration::from_secs(5))
                .await
        });

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert_eq!(queue.reap_expired(), 1);

        let observed = waiter.await.expect("join").expect("wait");
        assert_eq!(observed.status, ApprovalStatus::Expired);

        // Un expediente segado ya es terminal para cualquier veredicto.
        let late_decision = queue.decide(&request.id, ApprovalDecision::Approved, "ops");
        assert!(late_decision.is_err());
    }
}
