// [apps/control-plane/src/main.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE MAIN ENTRY POINT (V7.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Logic:
 * La secuencia garantiza que la configuración y el estado queden
 * cristalizados ANTES de la apertura del socket TCP, previniendo
 * estados de carrera donde una sonda negocie sesión contra un estado
 * a medio construir.
 * =================================================================
 */

use legator_control_plane::prelude::*;

use dotenvy::dotenv;
use legator_shared_watchtower::init_tracing;
use tracing::{error, info};

/**
 * Punto de ignición supremo del binario del plano de control.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD (WATCHTOWER)
    init_tracing("legator_control_plane");

    // 3. CONFIGURACIÓN DEL RUNTIME MULTI-HILO
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Global ignition sequence starting...");

        // 4. CAPTURA TIPADA DEL ENTORNO
        let runtime_config = match RuntimeConfig::from_env() {
            Ok(config) => config,
            Err(config_fault) => {
                error!("❌ [IGNITION_ABORTED]: {}", config_fault);
                std::process::exit(1);
            }
        };

        // 5. CONSTRUCCIÓN DEL KERNEL SOBERANO
        let kernel_instance = match ControlPlaneKernel::ignite(runtime_config).await {
            Ok(kernel) => kernel,
            Err(ignition_fault) => {
                error!("❌ [IGNITION_ABORTED]: {}", ignition_fault);
                std::process::exit(1);
            }
        };

        // 6. IGNICIÓN DE OPERACIONES
        info!("🚀 [LEGATOR_ONLINE]: Control plane fully operational.");
        kernel_instance.launch_sovereign_operations().await;

        Ok(())
    })
}
