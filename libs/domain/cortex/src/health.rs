// [libs/domain/cortex/src/health.rs]
/*!
 * =================================================================
 * APARATO: PROBE HEALTH EVALUATOR (V5.0 - BAND CERTIFIED)
 * CLASIFICACIÓN: DOMAIN ENGINE (ESTRATO L9)
 * RESPONSABILIDAD: DERIVACIÓN DE PUNTAJE 0-100 Y ADVERTENCIAS
 *
 * # Logic:
 * El puntaje nace en 100 y se penaliza con 15 (umbral alto) o 30
 * (umbral crítico) por cada eje: carga-por-CPU, memoria % y disco %.
 * Bandas: >=80 healthy, >=50 warning, >=20 degraded, resto critical.
 * Función pura: mismo latido + mismo inventario => mismo veredicto.
 * =================================================================
 */

use legator_domain_models::probe::{HealthBand, HealthReport};
use legator_domain_models::wire::HeartbeatFrame;

/// Umbrales de carga por núcleo.
const LOAD_PER_CPU_HIGH: f64 = 1.0;
const LOAD_PER_CPU_CRITICAL: f64 = 2.0;

/// Umbrales porcentuales de memoria y disco.
const USAGE_PERCENT_HIGH: f64 = 80.0;
const USAGE_PERCENT_CRITICAL: f64 = 95.0;

/// Penalizaciones por eje.
const PENALTY_HIGH: i32 = 15;
const PENALTY_CRITICAL: i32 = 30;

/**
 * Evalúa la salud de una sonda a partir de su último latido.
 *
 * @param heartbeat Pulso biométrico reportado por la sonda.
 * @param cpu_count Núcleos conocidos del último inventario (0 => se asume 1).
 */
pub fn evaluate_probe_health(heartbeat: &HeartbeatFrame, cpu_count: u32) -> HealthReport {
    let mut accumulated_score: i32 = 100;
    let mut warnings: Vec<String> = Vec::new();

    // 1. EJE DE CARGA (load average 1m normalizado por núcleo)
    let effective_cpu_count = if cpu_count == 0 { 1 } else { cpu_count } as f64;
    let load_per_cpu = heartbeat.load[0] / effective_cpu_count;

    if load_per_cpu >= LOAD_PER_CPU_CRITICAL {
        accumulated_score -= PENALTY_CRITICAL;
        warnings.push(format!("critical load: {:.2} per cpu", load_per_cpu));
    } else if load_per_cpu >= LOAD_PER_CPU_HIGH {
        accumulated_score -= PENALTY_HIGH;
        warnings.push(format!("high load: {:.2} per cpu", load_per_cpu));
    }

    // 2. EJE DE MEMORIA
    let memory_percent = usage_percent(heartbeat.mem_used, heartbeat.mem_total);
    if memory_percent >= USAGE_PERCENT_CRITICAL {
        accumulated_score -= PENALTY_CRITICAL;
        warnings.push(format!("critical memory usage: {:.1}%", memory_percent));
    } else if memory_percent >= USAGE_PERCENT_HIGH {
        accumulated_score -= PENALTY_HIGH;
        warnings.push(format!("high memory usage: {:.1}%", memory_percent));
    }

    // 3. EJE DE DISCO
    let disk_percent = usage_percent(heartbeat.disk_used, heartbeat.disk_total);
    if disk_percent >= USAGE_PERCENT_CRITICAL {
        accumulated_score -= PENALTY_CRITICAL;
        warnings.push(format!("critical disk usage: {:.1}%", disk_percent));
    } else if disk_percent >= USAGE_PERCENT_HIGH {
        accumulated_score -= PENALTY_HIGH;
        warnings.push(format!("high disk usage: {:.1}%", disk_percent));
    }

    let clamped_score = accumulated_score.clamp(0, 100) as u8;

    HealthReport {
        score: clamped_score,
        band: band_for_score(clamped_score),
        warnings,
    }
}

/// Traduce un puntaje a su banda semántica.
pub fn band_for_score(score: u8) -> HealthBand {
    match score {
        80..=100 => HealthBand::Healthy,
        50..=79 => HealthBand::Warning,
        20..=49 => HealthBand::Degraded,
        _ => HealthBand::Critical,
    }
}

fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64) * 100.0
}
