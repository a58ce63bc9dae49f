// [tests/mirror/apps/control_plane/services/signer.test.rs]
/**
 * =================================================================
 * APARATO: ENVELOPE SIGNER TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4)
 * RESPONSABILIDAD: FIRMA, VERIFICACIÓN Y RECHAZO DE MANIPULACIÓN
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use legator_control_plane::services::signer::EnvelopeSigner;
    use legator_domain_models::command::CommandEnvelope;
    use legator_domain_models::probe::PolicyLevel;

    fn sample_envelope() -> CommandEnvelope {
        CommandEnvelope {
            request_id: "req-sign".into(),
            command: "systemctl".into(),
            args: vec!["restart".into(), "nginx".into()],
            level: PolicyLevel::Remediate,
            timeout_seconds: 60,
            stream: false,
            signature: None,
        }
    }

    fn signer() -> EnvelopeSigner {
        EnvelopeSigner::new(&[0x42u8; 32]).expect("32-byte secret is valid")
    }

    #[test]
    fn certify_short_secret_is_config_fault() {
        assert!(EnvelopeSigner::new(&[0x42u8; 31]).is_err());
        assert!(EnvelopeSigner::new(b"short").is_err());
    }

    #[test]
    fn certify_sign_verify_roundtrip() {
        let signer = signer();
        let mut envelope = sample_envelope();

        signer.attach_signature(&mut envelope).expect("attach");
        assert!(envelope.signature.is_some());
        assert!(signer.verify(&envelope).expect("verify"));
    }

    #[test]
    fn certify_signature_is_deterministic() {
        let signer = signer();
        let envelope = sample_envelope();
        assert_eq!(signer.sign(&envelope).unwrap(), signer.sign(&envelope).unwrap());
    }

    #[test]
    fn certify_tampered_envelope_is_rejected() {
        let signer = signer();
        let mut envelope = sample_envelope();
        signer.attach_signature(&mut envelope).expect("attach");

        envelope.command = "rm".into();
        assert!(!signer.verify(&envelope).expect("verify"));
    }

    #[test]
    fn certify_foreign_key_is_rejected() {
        let signer_alpha = EnvelopeSigner::new(&[0x01u8; 32]).unwrap();
        let signer_beta = EnvelopeSigner::new(&[0x02u8; 32]).unwrap();

        let mut envelope = sample_envelope();
        signer_alpha.attach_signature(&mut envelope).expect("attach");
        assert!(!signer_beta.verify(&envelope).expect("verify"));
    }

    #[test]
    fn certify_missing_or_malformed_tag_is_rejected() {
        let signer = signer();
        let mut envelope = sample_envelope();
        assert!(!signer.verify(&envelope).expect("absent tag"));

        envelope.signature = Some("zz-not-hex".into());
        assert!(!signer.verify(&envelope).expect("malformed tag"));
    }
}
