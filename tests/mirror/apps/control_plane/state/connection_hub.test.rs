// [tests/mirror/apps/control_plane/state/connection_hub.test.rs]
/**
 * =================================================================
 * APARATO: CONNECTION HUB TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-APP)
 * RESPONSABILIDAD: SESIONES, ORDEN DE FAN-OUT Y POLÍTICA LOSSY
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use legator_control_plane::state::connection_hub::ConnectionHub;
    use legator_domain_models::command::{OutputChunk, OutputStream};
    use legator_domain_models::wire::{SessionFrame, SessionFrameType};

    fn chunk(request_id: &str, seq: u64, data: &str, is_final: bool) -> OutputChunk {
        OutputChunk {
            request_id: request_id.into(),
            seq,
            stream: OutputStream::Stdout,
            data: data.into(),
            is_final,
            exit_code: if is_final { Some(0) } else { None },
        }
    }

    #[tokio::test]
    async fn certify_send_requires_live_session() {
        let hub = Arc::new(ConnectionHub::new(None));
        let frame = SessionFrame {
            frame_type: SessionFrameType::PolicyUpdate,
            payload: serde_json::json!({"level": "observe"}),
        };

        assert!(hub.send_to("prb-ghost", frame.clone()).await.is_err());

        let (_session_id, mut lane_receiver) = hub.register_session("prb-live");
        hub.send_to("prb-live", frame).await.expect("send to live session");

        let delivered = lane_receiver.recv().await.expect("frame in lane");
        assert_eq!(delivered.frame_type, SessionFrameType::PolicyUpdate);
        assert_eq!(hub.connected(), vec!["prb-live".to_string()]);
    }

    #[tokio::test]
    async fn certify_last_write_wins_on_reconnect() {
        let hub = Arc::new(ConnectionHub::new(None));
        let (first_session, mut first_lane) = hub.register_session("prb-twin");
        let (second_session, mut second_lane) = hub.register_session("prb-twin");

        // El carril desplazado colapsa: su receptor observa cierre.
        assert!(first_lane.recv().await.is_none());

        let frame = SessionFrame {
            frame_type: SessionFrameType::Update,
            payload: serde_json::Value::Null,
        };
        hub.send_to("prb-twin", frame).await.expect("send to replacement");
        assert!(second_lane.recv().await.is_some());

        // La sesión vieja no puede dar de baja a su reemplazo.
        hub.unregister_session("prb-twin", &first_session);
        assert!(hub.is_connected("prb-twin"));

        hub.unregister_session("prb-twin", &second_session);
        assert!(!hub.is_connected("prb-twin"));
    }

    #[tokio::test]
    async fn certify_chunk_order_and_terminal_closure() {
        let hub = Arc::new(ConnectionHub::new(None));
        let (mut receiver, _guard) = hub.subscribe("req-stream", 8);

        hub.fan_out_chunk(&chunk("req-stream", 0, "hello", false));
        hub.fan_out_chunk(&chunk("req-stream", 1, "world", true));

        let first = receiver.recv().await.expect("first chunk");
        assert_eq!((first.seq, first.data.as_str(), first.is_final), (0, "hello", false));

        let terminal = receiver.recv().await.expect("final chunk");
        assert_eq!((terminal.seq, terminal.is_final, terminal.exit_code), (1, true, Some(0)));

        // Tras el terminal el canal queda cerrado.
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn certify_slow_subscriber_drops_newest() {
        let hub = Arc::new(ConnectionHub::new(None));
        // Buffer de UN fragmento: el segundo se descarta sin bloquear.
        let (mut receiver, _guard) = hub.subscribe("req-slow", 1);

        hub.fan_out_chunk(&chunk("req-slow", 0, "kept", false));
        hub.fan_out_chunk(&chunk("req-slow", 1, "dropped", false));

        let survivor = receiver.recv().await.expect("buffered chunk");
        assert_eq!(survivor.seq, 0);

        // El flujo continúa con fragmentos posteriores una vez drenado.
        hub.fan_out_chunk(&chunk("req-slow", 2, "later", true));
        let terminal = receiver.recv().await.expect("terminal chunk");
        assert_eq!(terminal.seq, 2);
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn certify_subscription_cleanup_is_idempotent() {
        let hub = Arc::new(ConnectionHub::new(None));
        let (mut receiver, guard) = hub.subscribe("req-clean", 4);

        guard.close();
        guard.close(); // Segunda liberación: sin efecto.

        // Sin suscriptores, el fan-out es un no-op y el canal quedó cerrado.
        hub.fan_out_chunk(&chunk("req-clean", 0, "void", false));
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn certify_no_cross_request_leakage() {
        let hub = Arc::new(ConnectionHub::new(None));
        let (mut receiver_a, _guard_a) = hub.subscribe("req-a", 4);
        let (mut receiver_b, _guard_b) = hub.subscribe("req-b", 4);

        hub.fan_out_chunk(&chunk("req-a", 0, "alpha", true));

        assert_eq!(receiver_a.recv().await.unwrap().data, "alpha");
        assert!(receiver_a.recv().await.is_none());

        // El stream B permanece abierto y vacío.
        hub.fan_out_chunk(&chunk("req-b", 0, "beta", false));
        assert_eq!(receiver_b.recv().await.unwrap().data, "beta");
    }
}
