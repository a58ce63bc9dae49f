// [tests/mirror/libs/domain/cortex/health_bands.test.rs]
/**
 * =================================================================
 * APARATO: HEALTH EVALUATOR TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L9)
 * RESPONSABILIDAD: BANDAS, PENALIZACIONES Y PUREZA DEL EVALUADOR
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use legator_domain_cortex::health::{band_for_score, evaluate_probe_health};
    use legator_domain_models::probe::HealthBand;
    use legator_domain_models::wire::HeartbeatFrame;

    fn heartbeat(load: f64, mem_used: u64, disk_used: u64) -> HeartbeatFrame {
        HeartbeatFrame {
            probe_id: "prb-health".into(),
            load: [load, load, load],
            mem_used,
            mem_total: 100,
            disk_used,
            disk_total: 100,
        }
    }

    #[test]
    fn certify_nominal_host_scores_perfect() {
        let report = evaluate_probe_health(&heartbeat(0.2, 30, 40), 4);
        assert_eq!(report.score, 100);
        assert_eq!(report.band, HealthBand::Healthy);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn certify_high_thresholds_subtract_fifteen() {
        // Carga 1.2 por núcleo (alta) + memoria 85% (alta): 100 - 15 - 15.
        let report = evaluate_probe_health(&heartbeat(1.2, 85, 10), 1);
        assert_eq!(report.score, 70);
        assert_eq!(report.band, HealthBand::Warning);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn certify_critical_axes_clamp_at_zero() {
        // Tres ejes críticos: 100 - 30*3 = 10; banda critical.
        let report = evaluate_probe_health(&heartbeat(8.0, 99, 99), 1);
        assert_eq!(report.score, 10);
        assert_eq!(report.band, HealthBand::Critical);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn certify_zero_cpu_count_assumes_single_core() {
        // Sin inventario (0 cpus) la carga se normaliza contra 1 núcleo.
        let degraded = evaluate_probe_health(&heartbeat(2.5, 10, 10), 0);
        assert!(degraded.score < 100);

        let healthy = evaluate_probe_health(&heartbeat(2.5, 10, 10), 8);
        assert_eq!(healthy.score, 100);
    }

    #[test]
    fn certify_band_boundaries() {
        assert_eq!(band_for_score(100), HealthBand::Healthy);
        assert_eq!(band_for_score(80), HealthBand::Healthy);
        assert_eq!(band_for_score(79), HealthBand::Warning);
        assert_eq!(band_for_score(50), HealthBand::Warning);
        assert_eq!(band_for_score(49), HealthBand::Degraded);
        assert_eq!(band_for_score(20), HealthBand::Degraded);
        assert_eq!(band_for_score(19), HealthBand::Critical);
        assert_eq!(band_for_score(0), HealthBand::Critical);
    }

    #[test]
    fn certify_evaluator_determinism() {
        let pulse = heartbeat(1.5, 60, 70);
        let first = evaluate_probe_health(&pulse, 2);
        let second = evaluate_probe_health(&pulse, 2);
        assert_eq!(first, second);
    }
}
