// [libs/infra/client/src/client.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN OPERATOR UPLINK (V5.0 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: NEGOCIACIÓN HTTP ENTRE LA CLI Y EL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA:
 * Implementa el túnel de comunicación asíncrono entre la herramienta
 * de operador y el centro de mando. Toda petición viaja con el token
 * Bearer inyectado en las cabeceras por defecto.
 * =================================================================
 */

use crate::errors::ClientError;
use legator_domain_models::command::{CommandResult, CommandSpec};
use legator_domain_models::probe::ProbeState;
use legator_domain_models::token::RegistrationToken;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

/// Resumen agregado de la flota para el HUD del operador.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetSummary {
    pub total_probes: usize,
    pub status_counts: HashMap<String, usize>,
    pub tag_counts: HashMap<String, usize>,
    pub in_flight_commands: usize,
    pub pending_approvals: usize,
}

/// Desenlace de un despacho de orden (espejo del sobre del servidor).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandDispatchOutcome {
    /// "completed", "accepted" o "pending_approval".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
}

/// Opciones de emisión de tokens de enrolamiento.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenCreateOptions {
    pub multi_use: bool,
    pub no_expiry: bool,
}

/// Sobre devuelto por la autoridad al emitir un token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenIssueEnvelope {
    pub token: RegistrationToken,
    pub install_command: String,
}

pub struct OperatorClient {
    network_session_client: Client,
    control_plane_base_endpoint: String,
}

impl OperatorClient {
    /**
     * Inicializa el cliente de red con seguridad de cabeceras.
     *
     * @param base_url Endpoint raíz del plano de control.
     * @param operator_token Token Bearer del operador.
     */
    pub fn new(base_url: String, operator_token: String) -> Self {
        let mut header_map = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(
            &format!("Bearer {}", operator_token)
        ).expect("CRITICAL: Invalid Authentication Token Format.");

        header_map.insert(reqwest::header::AUTHORIZATION, auth_value);

        Self {
            network_session_client: Client::builder()
                .default_headers(header_map)
                .user_agent("Legator-Ctl/V5.0")
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("FATAL: Client initialization failed."),
            control_plane_base_endpoint: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Recupera el resumen agregado de la flota.
    #[instrument(skip(self))]
    pub async fn fleet_summary(&self) -> Result<FleetSummary, ClientError> {
        self.get_json("/api/v1/fleet").await
    }

    /// Recupera el listado completo de sondas.
    #[instrument(skip(self))]
    pub async fn list_probes(&self) -> Result<Vec<ProbeState>, ClientError> {
        self.get_json("/api/v1/probes").await
    }

    /// Recupera el detalle de una sonda individual.
    #[instrument(skip(self))]
    pub async fn get_probe(&self, probe_id: &str) -> Result<ProbeState, ClientError> {
        self.get_json(&format!("/api/v1/probes/{}", probe_id)).await
    }

    /**
     * Despacha una orden hacia una sonda.
     *
     * # Errors:
     * - `ServerRejection`: Veto de aprobación, sonda desconectada o timeout.
     */
    #[instrument(skip(self, command_spec), fields(probe = %probe_id, command = %command_spec.command))]
    pub async fn dispatch_command(
        &self,
        probe_id: &str,
        command_spec: &CommandSpec,
        wait: bool,
    ) -> Result<CommandDispatchOutcome, ClientError> {
        let target_url = format!(
            "{}/api/v1/probes/{}/command?wait={}",
            self.control_plane_base_endpoint, probe_id, wait
        );

        let network_response = self.network_session_client
            .post(&target_url)
            .json(command_spec)
            .send()
            .await?;

        Self::decode_response(network_response).await
    }

    /// Emite un token de enrolamiento fresco.
    #[instrument(skip(self))]
    pub async fn create_token(&self, options: &TokenCreateOptions) -> Result<TokenIssueEnvelope, ClientError> {
        let target_url = format!("{}/api/v1/tokens", self.control_plane_base_endpoint);
        let network_response = self.network_session_client
            .post(&target_url)
            .json(options)
            .send()
            .await?;

        Self::decode_response(network_response).await
    }

    /// Lista los tokens de enrolamiento activos.
    #[instrument(skip(self))]
    pub async fn list_tokens(&self) -> Result<Vec<RegistrationToken>, ClientError> {
        self.get_json("/api/v1/tokens").await
    }

    // --- MOTOR INTERNO DE PETICIONES ---

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ClientError> {
        let target_url = format!("{}{}", self.control_plane_base_endpoint, path);
        let network_response = self.network_session_client.get(&target_url).send().await?;
        Self::decode_response(network_response).await
    }

    async fn decode_response<T: for<'de> Deserialize<'de>>(
        network_response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = network_response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        if !status.is_success() && status != StatusCode::ACCEPTED {
            let body = network_response.text().await.unwrap_or_default();
            return Err(ClientError::ServerRejection { status: status.as_u16(), body });
        }

        Ok(network_response.json::<T>().await?)
    }
}
