// [apps/control-plane/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE LIBRARY ROOT (V6.0 - SOVEREIGN AUTHORITY)
 * CLASIFICACIÓN: CRATE ROOT (ESTRATO L3)
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MODULE HIERARCHY: Autoridad única de módulos para que 'crate::'
 *    resuelva de forma determinista en librería y binario.
 * 2. PUBLIC INTERFACE: Expone 'prelude' para la ignición mínima del
 *    Kernel desde el binario y los arneses de prueba.
 * =================================================================
 */

// --- ESTRATO DE INFRAESTRUCTURA Y ARRANQUE ---
/// Captura tipada del entorno del proceso.
pub mod config;
/// Núcleo de mando y control para la ignición de servicios.
pub mod kernel;

// --- ESTRATO DE DATOS Y ESTADO (L1-APP) ---
/// Dueños de estado: flota, hub, tracker y aprobaciones.
pub mod state;

// --- ESTRATO DE TRANSPORTE Y ACCIÓN ---
/// Adaptadores de entrada para ráfagas HTTP, WebSockets y SSE.
pub mod handlers;
/// El túnel de mando: Definición de rutas y topología de red.
pub mod routes;

// --- ESTRATO DE SEGURIDAD Y SOPORTE ---
/// Catálogo semántico de fallos del núcleo.
pub mod errors;
/// Guardianes perimetrales de autenticación.
pub mod middleware;
/// Servicios de mando y daemons de fondo.
pub mod services;

/**
 * PRELUDIO DEL PLANO DE CONTROL
 *
 * Re-exportación estratégica de los componentes necesarios para la
 * ignición mínima del sistema.
 */
pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::errors::ControlError;
    pub use crate::kernel::ControlPlaneKernel;
    pub use crate::state::AppState;
}
