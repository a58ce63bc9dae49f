// [apps/legatorctl/src/main.rs]
/*!
 * =================================================================
 * APARATO: LEGATOR OPERATOR SHELL (V6.0 - TABLE & JSON DUAL MODE)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ARGUMENTOS Y DISPARO DEL UPLINK
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. LIBRARY SYNERGY: El binario es un orquestador puro; toda la
 *    negociación de red vive en 'legator-infra-client'.
 * 2. DUAL OUTPUT: Tablas legibles por defecto; '--json' emite el cuerpo
 *    crudo para tuberías de automatización.
 * 3. EXIT DISCIPLINE: Salida no-cero ante cualquier fallo; el despacho
 *    con espera espeja el exit code remoto.
 * =================================================================
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use legator_domain_models::command::CommandSpec;
use legator_infra_client::{OperatorClient, TokenCreateOptions};

/// Directivas de mando para la herramienta de operador.
#[derive(Parser, Debug)]
#[command(
    name = "legatorctl",
    version,
    about = "Legator Fleet Operator Tool // Control plane command & governance"
)]
struct OperatorDirectives {
    /// Endpoint raíz del plano de control.
    #[arg(long, global = true, env = "LEGATOR_SERVER", default_value = "http://localhost:8420")]
    server: String,

    /// Token Bearer del operador.
    #[arg(long = "api-key", global = true, env = "LEGATOR_OPERATOR_TOKEN", default_value = "")]
    api_key: String,

    /// Emite el cuerpo JSON crudo en lugar de tablas.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    directive: OperatorDirective,
}

#[derive(Subcommand, Debug)]
enum OperatorDirective {
    /// Resumen agregado de la flota.
    Fleet,
    /// Listado de sondas registradas.
    Probes,
    /// Detalle de una sonda individual.
    Probe {
        /// Identificador de la sonda.
        probe_id: String,
    },
    /// Despacha una orden hacia una sonda.
    Command {
        /// Identificador de la sonda objetivo.
        probe_id: String,
        /// Comando a ejecutar.
        command: String,
        /// Argumentos posicionales del comando.
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        /// Presupuesto de ejecución en segundos.
        #[arg(long, default_value_t = 30)]
        timeout: u64,
        /// No esperar el resultado terminal.
        #[arg(long, default_value_t = false)]
        no_wait: bool,
    },
    /// Gestión de tokens de enrolamiento.
    Tokens {
        #[command(subcommand)]
        action: TokenDirective,
    },
    /// Alias de operador para las llaves de enrolamiento.
    Keys {
        #[command(subcommand)]
        action: KeyDirective,
    },
}

#[derive(Subcommand, Debug)]
enum TokenDirective {
    /// Emite un token fresco.
    Create {
        /// Token reutilizable hasta su vencimiento.
        #[arg(long, default_value_t = false)]
        multi_use: bool,
        /// Vigencia extendida (100 años).
        #[arg(long, default_value_t = false)]
        no_expiry: bool,
    },
    /// Lista los tokens activos.
    List,
}

#[derive(Subcommand, Debug)]
enum KeyDirective {
    /// Lista las llaves de enrolamiento activas.
    List,
    /// Emite una llave de enrolamiento fresca.
    Create {
        #[arg(long, default_value_t = false)]
        multi_use: bool,
        #[arg(long, default_value_t = false)]
        no_expiry: bool,
    },
}

/**
 * Punto de ignición del binario de operador.
 */
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("legatorctl=warn")
        .init();

    let directives = OperatorDirectives::parse();
    let uplink = OperatorClient::new(directives.server.clone(), directives.api_key.clone());
    let json_mode = directives.json;

    match directives.directive {
        OperatorDirective::Fleet => {
            let summary = uplink.fleet_summary().await.context("fleet summary failed")?;
            if json_mode {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("FLEET SUMMARY");
                println!("  probes total:      {}", summary.total_probes);
                let mut status_rows: Vec<_> = summary.status_counts.iter().collect();
                status_rows.sort();
                for (status, count) in status_rows {
                    println!("  {:<18} {}", format!("{}:", status), count);
                }
                println!("  in-flight cmds:    {}", summary.in_flight_commands);
                println!("  pending approvals: {}", summary.pending_approvals);
                if !summary.tag_counts.is_empty() {
                    let mut tag_rows: Vec<_> = summary.tag_counts.iter().collect();
                    tag_rows.sort();
                    let rendered: Vec<String> = tag_rows
                        .iter()
                        .map(|(tag, count)| format!("{}={}", tag, count))
                        .collect();
                    println!("  tags:              {}", rendered.join(", "));
                }
            }
        }

        OperatorDirective::Probes => {
            let probes = uplink.list_probes().await.context("probe listing failed")?;
            if json_mode {
                println!("{}", serde_json::to_string_pretty(&probes)?);
            } else {
                println!("{:<16} {:<24} {:<10} {:<10} {:<8} LAST SEEN", "ID", "HOSTNAME", "STATUS", "POLICY", "HEALTH");
                for probe in probes {
                    let health = probe
                        .health
                        .as_ref()
                        .map(|report| report.score.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "{:<16} {:<24} {:<10} {:<10} {:<8} {}",
                        probe.id,
                        probe.hostname,
                        format!("{:?}", probe.status).to_lowercase(),
                        format!("{:?}", probe.policy_level).to_lowercase(),
                        health,
                        probe.last_seen_at.format("%Y-%m-%d %H:%M:%S"),
                    );
                }
            }
        }

        OperatorDirective::Probe { probe_id } => {
            let probe = uplink.get_probe(&probe_id).await.context("probe detail failed")?;
            if json_mode {
                println!("{}", serde_json::to_string_pretty(&probe)?);
            } else {
                println!("PROBE {}", probe.id);
                println!("  hostname:   {}", probe.hostname);
                println!("  os/arch:    {}/{}", probe.os, probe.arch);
                println!("  status:     {:?}", probe.status);
                println!("  policy:     {:?}", probe.policy_level);
                println!("  tags:       {}", probe.tags.join(", "));
                println!("  last seen:  {}", probe.last_seen_at.format("%Y-%m-%d %H:%M:%S"));
                if let Some(report) = &probe.health {
                    println!("  health:     {} ({:?})", report.score, report.band);
                    for warning in &report.warnings {
                        println!("    ⚠ {}", warning);
                    }
                }
                if let Some(inventory) = &probe.inventory {
                    println!("  inventory:  {} cpus, {} MB ram, {} GB disk (kernel {})",
                        inventory.cpus,
                        inventory.mem_total / 1_048_576,
                        inventory.disk_total / 1_073_741_824,
                        inventory.kernel);
                }
            }
        }

        OperatorDirective::Command { probe_id, command, args, timeout, no_wait } => {
            let spec = CommandSpec {
                command,
                args,
                request_id: None,
                timeout_seconds: timeout,
                stream: false,
                note: None,
            };

            let outcome = uplink
                .dispatch_command(&probe_id, &spec, !no_wait)
                .await
                .context("command dispatch failed")?;

            if json_mode {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match outcome.status.as_str() {
                    "completed" => {
                        let result = outcome.result.as_ref().expect("completed outcome carries a result");
                        if !result.stdout.is_empty() {
                            print!("{}", result.stdout);
                        }
                        if !result.stderr.is_empty() {
                            eprint!("{}", result.stderr);
                        }
                        eprintln!("» exit={} duration={}ms", result.exit_code, result.duration_ms);
                    }
                    "accepted" => {
                        println!("accepted: request_id={}", outcome.request_id.as_deref().unwrap_or("?"));
                    }
                    "pending_approval" => {
                        println!("held for approval: approval_id={}", outcome.approval_id.as_deref().unwrap_or("?"));
                    }
                    other => println!("status: {}", other),
                }
            }

            // El exit code remoto se espeja en la shell del operador.
            if let Some(result) = outcome.result {
                if result.exit_code != 0 {
                    std::process::exit(result.exit_code.clamp(1, 125));
                }
            }
        }

        OperatorDirective::Tokens { action } => {
            run_token_directive(&uplink, action, json_mode).await?;
        }

        OperatorDirective::Keys { action } => {
            let aliased = match action {
                KeyDirective::List => TokenDirective::List,
                KeyDirective::Create { multi_use, no_expiry } => TokenDirective::Create { multi_use, no_expiry },
            };
            run_token_directive(&uplink, aliased, json_mode).await?;
        }
    }

    Ok(())
}

async fn run_token_directive(
    uplink: &OperatorClient,
    action: TokenDirective,
    json_mode: bool,
) -> Result<()> {
    match action {
        TokenDirective::Create { multi_use, no_expiry } => {
            let envelope = uplink
                .create_token(&TokenCreateOptions { multi_use, no_expiry })
                .await
                .context("token issuance failed")?;

            if json_mode {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else {
                println!("token:   {}", envelope.token.value);
                println!("expires: {}", envelope.token.expires_at.format("%Y-%m-%d %H:%M:%S"));
                println!("install: {}", envelope.install_command);
            }
        }
        TokenDirective::List => {
            let tokens = uplink.list_tokens().await.context("token listing failed")?;
            if json_mode {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                println!("{:<56} {:<10} {:<6} EXPIRES", "TOKEN", "MULTI-USE", "USED");
                for token in tokens {
                    println!(
                        "{:<56} {:<10} {:<6} {}",
                        token.value,
                        token.multi_use,
                        token.used,
                        token.expires_at.format("%Y-%m-%d %H:%M:%S"),
                    );
                }
            }
        }
    }
    Ok(())
}
