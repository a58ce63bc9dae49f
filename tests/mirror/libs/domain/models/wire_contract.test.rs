// [tests/mirror/libs/domain/models/wire_contract.test.rs]
/**
 * =================================================================
 * APARATO: WIRE CONTRACT TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DE SOBRES Y TRAMAS
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use legator_domain_models::command::{CommandEnvelope, OutputChunk, OutputStream};
    use legator_domain_models::probe::PolicyLevel;
    use legator_domain_models::wire::{SessionFrame, SessionFrameType};

    fn sample_envelope() -> CommandEnvelope {
        CommandEnvelope {
            request_id: "req-0001".into(),
            command: "uptime".into(),
            args: vec![],
            level: PolicyLevel::Observe,
            timeout_seconds: 30,
            stream: false,
            signature: None,
        }
    }

    #[test]
    fn certify_canonical_bytes_exclude_signature() {
        let mut envelope = sample_envelope();
        let unsigned_form = envelope.canonical_bytes().expect("canonical encode");

        envelope.signature = Some("deadbeef".into());
        let signed_form = envelope.canonical_bytes().expect("canonical encode");

        // La forma canónica es idéntica con o sin etiqueta adjunta.
        assert_eq!(unsigned_form, signed_form);
        assert!(!String::from_utf8(unsigned_form).unwrap().contains("signature"));
    }

    #[test]
    fn certify_session_frame_type_discriminator() {
        let frame = SessionFrame::enclose(SessionFrameType::Command, &sample_envelope())
            .expect("frame enclose");

        let serialized = serde_json::to_string(&frame).expect("frame serialize");
        assert!(serialized.contains("\"type\":\"command\""));

        let recovered: SessionFrame = serde_json::from_str(&serialized).expect("frame deserialize");
        assert_eq!(recovered.frame_type, SessionFrameType::Command);
    }

    #[test]
    fn certify_output_chunk_final_rename() {
        let chunk = OutputChunk {
            request_id: "req-0002".into(),
            seq: 1,
            stream: OutputStream::Stdout,
            data: "world".into(),
            is_final: true,
            exit_code: Some(0),
        };

        let serialized = serde_json::to_string(&chunk).expect("chunk serialize");
        // El protocolo de sonda transporta 'final', no 'is_final'.
        assert!(serialized.contains("\"final\":true"));
        assert!(!serialized.contains("is_final"));

        let recovered: OutputChunk = serde_json::from_str(&serialized).expect("chunk deserialize");
        assert!(recovered.is_final);
        assert_eq!(recovered.exit_code, Some(0));
    }

    #[test]
    fn certify_chunk_defaults_when_fields_absent() {
        let minimal = r#"{"request_id":"req-x","seq":0,"stream":"stderr","data":"boom"}"#;
        let recovered: OutputChunk = serde_json::from_str(minimal).expect("minimal chunk");
        assert!(!recovered.is_final);
        assert!(recovered.exit_code.is_none());
        assert_eq!(recovered.stream, OutputStream::Stderr);
    }
}
