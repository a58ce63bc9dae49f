// [libs/domain/cortex/src/risk.rs]
/*!
 * =================================================================
 * APARATO: COMMAND RISK CLASSIFIER (V6.0 - DETERMINISTIC VERDICTS)
 * CLASIFICACIÓN: DOMAIN ENGINE (ESTRATO L9)
 * RESPONSABILIDAD: CLASIFICACIÓN DE RIESGO Y VEREDICTO DE APROBACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE VERDICTS: Sin reloj, sin estado, sin I/O. El mismo comando
 *    produce siempre el mismo veredicto.
 * 2. APPROVAL GATE: Una orden exige aprobación humana si y sólo si el
 *    nivel de política de la sonda es inferior al nivel requerido por
 *    el comando y el comando no figura en la lista de autorización.
 * =================================================================
 */

use legator_domain_models::approval::RiskLevel;
use legator_domain_models::probe::PolicyLevel;

/// Patrones de comandos destructivos a nivel de sistema.
const CRITICAL_COMMANDS: &[&str] = &[
    "mkfs", "dd", "shutdown", "reboot", "halt", "poweroff", "fdisk",
    "parted", "wipefs", "userdel",
];

/// Patrones de comandos mutadores de estado del host.
const HIGH_COMMANDS: &[&str] = &[
    "rm", "kill", "pkill", "killall", "chmod", "chown", "mount", "umount",
    "iptables", "crontab", "usermod",
];

/// Patrones de diagnóstico activo o mutación de servicios gestionados.
const MEDIUM_COMMANDS: &[&str] = &[
    "systemctl", "service", "apt", "apt-get", "yum", "dnf", "docker",
    "podman", "sysctl",
];

/// Subverbos de gestión de paquetes/servicios que elevan a riesgo alto.
const MUTATING_SUBVERBS: &[&str] = &[
    "remove", "purge", "stop", "disable", "mask", "erase", "rm", "prune",
];

/**
 * Clasifica el riesgo advisorio de una orden.
 *
 * # Logic:
 * 1. El binario se compara contra las tablas de patrones por nombre base.
 * 2. 'rm' escala a crítico ante '-rf' / '--recursive' o rutas raíz.
 * 3. Los gestores de servicios/paquetes escalan de medio a alto cuando
 *    el subverbo es mutador (remove, purge, stop, ...).
 */
pub fn classify_risk(command: &str, args: &[String]) -> RiskLevel {
    let binary_name = base_name(command);

    if CRITICAL_COMMANDS.contains(&binary_name) {
        return RiskLevel::Critical;
    }

    if binary_name == "rm" {
        let is_recursive_force = args.iter().any(|argument| {
            let flag = argument.as_str();
            flag == "-rf" || flag == "-fr" || flag == "-r" || flag == "--recursive"
        });
        let touches_root = args.iter().any(|argument| argument == "/" || argument == "/*");
        if is_recursive_force || touches_root {
            return RiskLevel::Critical;
        }
        return RiskLevel::High;
    }

    if HIGH_COMMANDS.contains(&binary_name) {
        return RiskLevel::High;
    }

    if MEDIUM_COMMANDS.contains(&binary_name) {
        let has_mutating_subverb = args
            .iter()
            .any(|argument| MUTATING_SUBVERBS.contains(&argument.as_str()));
        if has_mutating_subverb {
            return RiskLevel::High;
        }
        return RiskLevel::Medium;
    }

    RiskLevel::Low
}

/// Nivel de política requerido para ejecutar una orden del riesgo dado.
pub fn required_policy_level(risk: RiskLevel) -> PolicyLevel {
    match risk {
        RiskLevel::Low => PolicyLevel::Observe,
        RiskLevel::Medium => PolicyLevel::Diagnose,
        RiskLevel::High | RiskLevel::Critical => PolicyLevel::Remediate,
    }
}

/**
 * Veredicto de compuerta humana para una orden sobre una sonda.
 *
 * @param allow_list Comandos (nombre base) exentos de aprobación por
 *                   configuración del operador.
 */
pub fn needs_approval(
    command: &str,
    args: &[String],
    probe_policy: PolicyLevel,
    allow_list: &[String],
) -> bool {
    let binary_name = base_name(command);
    if allow_list.iter().any(|allowed| allowed == binary_name) {
        return false;
    }

    let required = required_policy_level(classify_risk(command, args));
    probe_policy < required
}

/// Extrae el nombre base del binario ("/usr/bin/rm" -> "rm").
fn base_name(command: &str) -> &str {
    command.rsplit('/').next().unwrap_or(command)
}
