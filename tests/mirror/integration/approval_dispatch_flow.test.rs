// [tests/mirror/integration/approval_dispatch_flow.test.rs]
/**
 * =================================================================
 * APARATO: STREAMING DISPATCH FLOW TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (INTEGRACIÓN)
 * RESPONSABILIDAD: FLUJO COMPLETO MANDO -> STREAM -> SELLADO
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};
    use legator_control_plane::services::audit::{AuditSink, MemoryAuditSink};
    use legator_control_plane::services::dispatcher::{CommandDispatcher, DispatchOutcome};
    use legator_control_plane::services::signer::EnvelopeSigner;
    use legator_control_plane::state::approval_queue::ApprovalQueue;
    use legator_control_plane::state::command_tracker::CommandTracker;
    use legator_control_plane::state::connection_hub::ConnectionHub;
    use legator_control_plane::state::fleet_store::FleetStore;
    use legator_domain_models::command::{CommandEnvelope, CommandResult, CommandSpec, OutputChunk, OutputStream};
    use legator_domain_models::probe::{PolicyLevel, ProbeState, ProbeStatus};

    #[tokio::test]
    async fn certify_streaming_dispatch_seals_exactly_once() {
        // --- ENSAMBLE DEL PLANO DE CONTROL EN MINIATURA ---
        let fleet = Arc::new(FleetStore::new(None));
        let signer = Arc::new(EnvelopeSigner::new(&[0x44u8; 32]).expect("signer"));
        let hub = Arc::new(ConnectionHub::new(Some(signer.clone())));
        let tracker = Arc::new(CommandTracker::new(Duration::minutes(10)));
        let approvals = Arc::new(ApprovalQueue::new(50, 15));
        let audit = Arc::new(MemoryAuditSink::new());

        let dispatcher = Arc::new(CommandDispatcher::new(
            fleet.clone(),
            hub.clone(),
            tracker.clone(),
            approvals.clone(),
            audit.clone() as Arc<dyn AuditSink>,
            StdDuration::from_secs(5),
            Vec::new(),
        ));

        let now = Utc::now();
        fleet.register(ProbeState {
            id: "prb-stream".into(),
            hostname: "stream-host".into(),
            os: "linux".into(),
            arch: "amd64".into(),
            status: ProbeStatus::Online,
            policy_level: PolicyLevel::Remediate,
            api_key: "lgk_test".into(),
            version: None,
            registered_at: now,
            last_seen_at: now,
            inventory: None,
            tags: vec![],
            labels: None,
            health: None,
        }).await;

        let (_session_id, mut probe_lane) = hub.register_session("prb-stream");

        // --- DESPACHO CON ESPERA Y STREAMING ---
        let dispatcher_reference = dispatcher.clone();
        let waiting_dispatch = tokio::spawn(async move {
            dispatcher_reference
                .dispatch(
                    "prb-stream",
                    CommandSpec {
                        command: "journalctl".into(),
                        args: vec!["-n".into(), "50".into()],
                        request_id: Some("req-stream-flow".into()),
                        timeout_seconds: 30,
                        stream: true,
                        note: None,
                    },
                    true,
                    "ops",
                )
                .await
        });

        // La sonda recibe el sobre firmado.
        let frame = probe_lane.recv().await.expect("command frame");
        let envelope: CommandEnvelope = serde_json::from_value(frame.payload).expect("envelope");
        assert_eq!(envelope.request_id, "req-stream-flow");
        assert!(signer.verify(&envelope).expect("signature check"));

        // El operador se suscribe al stream del request.
        let (mut chunk_receiver, _guard) = hub.subscribe("req-stream-flow", 16);

        // --- LA SONDA EMITE: chunk 0, luego chunk final con exit 0 ---
        hub.fan_out_chunk(&OutputChunk {
            request_id: "req-stream-flow".into(),
            seq: 0,
            stream: OutputStream::Stdout,
            data: "hello".into(),
            is_final: false,
            exit_code: None,
        });

        let terminal_chunk = OutputChunk {
            request_id: "req-stream-flow".into(),
            seq: 1,
            stream: OutputStream::Stdout,
            data: "world".into(),
            is_final: true,
            exit_code: Some(0),
        };
        hub.fan_out_chunk(&terminal_chunk);

        // El handler de sesión sella el tracker ante el chunk final.
        tracker
            .complete("req-stream-flow", CommandResult {
                request_id: "req-stream-flow".into(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 0,
            })
            .expect("first completion");

        // --- VERIFICACIONES ---

        // 1. El suscriptor observa ambos fragmentos EN ORDEN y el cierre.
        let first = chunk_receiver.recv().await.expect("first chunk");
        assert_eq!((first.seq, first.data.as_str()), (0, "hello"));
        let second = chunk_receiver.recv().await.expect("final chunk");
        assert_eq!((second.seq, second.is_final), (1, true));
        assert!(chunk_receiver.recv().await.is_none());

        // 2. El despacho en espera observa el resultado terminal.
        let outcome = waiting_dispatch.await.expect("join").expect("dispatch");
        let DispatchOutcome::Completed(result) = outcome else {
            panic!("waited streaming dispatch must complete");
        };
        assert_eq!(result.exit_code, 0);

        // 3. Un segundo sellado del mismo correlador es desconocido.
        assert!(tracker
            .complete("req-stream-flow", CommandResult {
                request_id: "req-stream-flow".into(),
                exit_code: 1,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 0,
            })
            .is_err());
    }
}
