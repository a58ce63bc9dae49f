// [libs/shared/watchtower/src/lib.rs]
/*!
 * =================================================================
 * APARATO: WATCHTOWER NEURAL OBSERVER (V3.1 - FLEET TUNED)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: TRAZADO ESTRUCTURADO Y ESCUDO GLOBAL DE PÁNICOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FLEET FOCUS: El filtro por defecto eleva los estratos propios del
 *    plano de control (sesiones, despacho, persistencia, cortex) y
 *    degrada el ruido del transporte (Tower, Hyper, libSQL, reqwest).
 * 2. CHAINED SHIELD: El hook de pánicos registra el colapso con sus
 *    coordenadas y DELEGA en el hook previo del runtime, preservando
 *    el backtrace estándar en la consola del operador.
 * 3. DUAL MODE: Consola compacta en desarrollo; tramas JSON planas en
 *    producción para el agregador de la flota.
 * =================================================================
 */

use std::panic;

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates del workspace que comparten el nivel base del servicio.
const FLEET_STRATA: &[&str] = &[
    "legator_control_plane",
    "legator_infra_db",
    "legator_domain_cortex",
];

/// Estratos ruidosos de infraestructura degradados por defecto.
const QUIET_TRANSPORT_DIRECTIVES: &[&str] = &[
    "tower_http=warn",
    "hyper=warn",
    "libsql=error",
    "reqwest=warn",
];

/// Nivel base según el perfil de compilación.
fn base_severity() -> &'static str {
    if cfg!(debug_assertions) { "debug" } else { "info" }
}

/**
 * Construye el filtro de flota cuando RUST_LOG no define uno.
 * El servicio y los crates del workspace comparten el nivel base; el
 * transporte queda degradado para que el rastro útil no se ahogue.
 */
fn assemble_fleet_filter(service_nominal_identifier: &str) -> EnvFilter {
    let severity = base_severity();
    let mut fleet_filter = EnvFilter::new(format!("{}={}", service_nominal_identifier, severity));

    for workspace_stratum in FLEET_STRATA {
        if let Ok(directive) = format!("{}={}", workspace_stratum, severity).parse() {
            fleet_filter = fleet_filter.add_directive(directive);
        }
    }

    for quiet_directive in QUIET_TRANSPORT_DIRECTIVES {
        if let Ok(directive) = quiet_directive.parse() {
            fleet_filter = fleet_filter.add_directive(directive);
        }
    }

    fleet_filter
}

/**
 * Instala el escudo de pánicos encadenado al hook previo del runtime.
 * Un colapso en cualquier daemon (segadores, sesiones de sonda, bucle
 * de tareas) queda en el rastro antes de la defunción del hilo, y el
 * hook estándar conserva su salida.
 */
fn install_panic_shield(service_label: String) {
    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |collapse_report| {
        let strata_coordinates = collapse_report
            .location()
            .map(|site| format!("{}:{}", site.file(), site.line()))
            .unwrap_or_else(|| "unknown-strata".to_string());

        let collapse_detail = collapse_report
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| collapse_report.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("opaque panic payload");

        error!(
            target: "panic_shield",
            service = %service_label,
            site = %strata_coordinates,
            "🔥 [PANIC_SHIELD]: {}",
            collapse_detail
        );

        previous_hook(collapse_report);
    }));
}

/// Inicializa el trazado Watchtower del plano de control.
///
/// # Comportamiento:
/// - Desarrollo: salida compacta con color para la consola del operador.
/// - Producción: tramas JSON planas para el agregador de la flota.
///
/// # Errors:
/// Retorna pánico si otro suscriptor global ya fue inicializado.
pub fn init_tracing(service_nominal_identifier: &str) {
    let environmental_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| assemble_fleet_filter(service_nominal_identifier));

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }

    install_panic_shield(service_nominal_identifier.to_string());

    info!(
        "👁️  [WATCHTOWER_ONLINE]: Tracing strata levelized for [{}]. Panic shield chained.",
        service_nominal_identifier
    );
}
