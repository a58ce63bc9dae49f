// [tests/mirror/libs/domain/cortex/risk_classification.test.rs]
/**
 * =================================================================
 * APARATO: RISK CLASSIFIER TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L9)
 * RESPONSABILIDAD: DETERMINISMO DEL CLASIFICADOR Y COMPUERTA HUMANA
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use legator_domain_cortex::risk::{classify_risk, needs_approval, required_policy_level};
    use legator_domain_models::approval::RiskLevel;
    use legator_domain_models::probe::PolicyLevel;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn certify_read_only_commands_are_low() {
        assert_eq!(classify_risk("uptime", &[]), RiskLevel::Low);
        assert_eq!(classify_risk("df", &args(&["-h"])), RiskLevel::Low);
        assert_eq!(classify_risk("cat", &args(&["/var/log/syslog"])), RiskLevel::Low);
    }

    #[test]
    fn certify_service_managers_are_medium_unless_mutating() {
        assert_eq!(classify_risk("systemctl", &args(&["status", "nginx"])), RiskLevel::Medium);
        assert_eq!(classify_risk("systemctl", &args(&["stop", "nginx"])), RiskLevel::High);
        assert_eq!(classify_risk("apt", &args(&["install", "htop"])), RiskLevel::Medium);
        assert_eq!(classify_risk("apt", &args(&["purge", "nginx"])), RiskLevel::High);
    }

    #[test]
    fn certify_rm_escalation() {
        assert_eq!(classify_risk("rm", &args(&["/tmp/scratch.txt"])), RiskLevel::High);
        assert_eq!(classify_risk("rm", &args(&["-rf", "/var/cache"])), RiskLevel::Critical);
        assert_eq!(classify_risk("rm", &args(&["/"])), RiskLevel::Critical);
        // La ruta completa del binario no altera el veredicto.
        assert_eq!(classify_risk("/bin/rm", &args(&["-rf", "/opt/x"])), RiskLevel::Critical);
    }

    #[test]
    fn certify_destructive_system_commands_are_critical() {
        assert_eq!(classify_risk("shutdown", &args(&["-h", "now"])), RiskLevel::Critical);
        assert_eq!(classify_risk("mkfs", &args(&["/dev/sda1"])), RiskLevel::Critical);
        assert_eq!(classify_risk("dd", &args(&["if=/dev/zero"])), RiskLevel::Critical);
    }

    #[test]
    fn certify_required_level_projection() {
        assert_eq!(required_policy_level(RiskLevel::Low), PolicyLevel::Observe);
        assert_eq!(required_policy_level(RiskLevel::Medium), PolicyLevel::Diagnose);
        assert_eq!(required_policy_level(RiskLevel::High), PolicyLevel::Remediate);
        assert_eq!(required_policy_level(RiskLevel::Critical), PolicyLevel::Remediate);
    }

    #[test]
    fn certify_approval_gate_thresholds() {
        let no_allow: Vec<String> = Vec::new();

        // Una sonda observe exige aprobación para todo lo no-low.
        assert!(!needs_approval("uptime", &[], PolicyLevel::Observe, &no_allow));
        assert!(needs_approval("systemctl", &args(&["restart", "x"]), PolicyLevel::Observe, &no_allow));
        assert!(needs_approval("rm", &args(&["-rf", "/x"]), PolicyLevel::Observe, &no_allow));

        // Una sonda remediate ejecuta sin compuerta humana.
        assert!(!needs_approval("rm", &args(&["-rf", "/x"]), PolicyLevel::Remediate, &no_allow));
    }

    #[test]
    fn certify_allow_list_bypasses_gate() {
        let allow = args(&["systemctl"]);
        assert!(!needs_approval("systemctl", &args(&["restart", "x"]), PolicyLevel::Observe, &allow));
        // La lista exenta por nombre base, no por prefijo.
        assert!(needs_approval("rm", &args(&["-rf", "/x"]), PolicyLevel::Observe, &allow));
    }

    #[test]
    fn certify_classifier_purity() {
        let sample = args(&["-rf", "/srv/data"]);
        for _ in 0..50 {
            assert_eq!(classify_risk("rm", &sample), RiskLevel::Critical);
        }
    }
}
