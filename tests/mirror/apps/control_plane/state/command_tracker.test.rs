// [tests/mirror/apps/control_plane/state/command_tracker.test.rs]
/**
 * =================================================================
 * APARATO: COMMAND TRACKER TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ENTREGA EXACTLY-ONCE, CANCELACIÓN Y RETENCIÓN
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use legator_control_plane::state::command_tracker::CommandTracker;
    use legator_domain_models::command::CommandResult;
    use legator_domain_models::probe::PolicyLevel;

    fn sample_result(request_id: &str, exit_code: i32) -> CommandResult {
        CommandResult {
            request_id: request_id.into(),
            exit_code,
            stdout: "ok".into(),
            stderr: String::new(),
            duration_ms: 12,
        }
    }

    #[tokio::test]
    async fn certify_track_complete_delivers_exactly_once() {
        let tracker = CommandTracker::new(Duration::minutes(10));
        let mut receiver = tracker.track("req-1", "prb-x", "uptime", PolicyLevel::Observe);

        tracker.complete("req-1", sample_result("req-1", 0)).expect("first completion");

        let delivered = receiver.recv().await.expect("result must arrive");
        assert_eq!(delivered.exit_code, 0);

        // La segunda finalización del mismo correlador es desconocida.
        let replay = tracker.complete("req-1", sample_result("req-1", 1));
        assert!(replay.is_err());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn certify_cancel_closes_consumer_channel() {
        let tracker = CommandTracker::new(Duration::minutes(10));
        let mut receiver = tracker.track("req-2", "prb-x", "uptime", PolicyLevel::Observe);

        tracker.cancel("req-2");

        // El consumidor observa la cancelación como canal cerrado.
        assert!(receiver.recv().await.is_none());
        assert!(tracker.complete("req-2", sample_result("req-2", 0)).is_err());
    }

    #[tokio::test]
    async fn certify_retrack_replaces_previous_entry() {
        let tracker = CommandTracker::new(Duration::minutes(10));
        let mut first_receiver = tracker.track("req-3", "prb-x", "uptime", PolicyLevel::Observe);
        let mut second_receiver = tracker.track("req-3", "prb-x", "uptime", PolicyLevel::Observe);

        // El consumidor desplazado observa cierre; el vigente recibe.
        assert!(first_receiver.recv().await.is_none());

        tracker.complete("req-3", sample_result("req-3", 7)).expect("completion");
        assert_eq!(second_receiver.recv().await.unwrap().exit_code, 7);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn certify_pending_snapshot_and_retention() {
        let tracker = CommandTracker::new(Duration::seconds(0));
        let _receiver = tracker.track("req-4", "prb-y", "df", PolicyLevel::Observe);

        let pending = tracker.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].probe_id, "prb-y");
        assert_eq!(pending[0].command, "df");

        // Retención cero: el segador purga la entrada inmediatamente.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(tracker.reap_stale(), 1);
        assert_eq!(tracker.in_flight(), 0);
    }
}
