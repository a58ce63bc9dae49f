// [libs/domain/cortex/src/provider.rs]
/*!
 * =================================================================
 * APARATO: COMPLETION PROVIDER UPLINK (V7.0 - OPENAI COMPAT)
 * CLASIFICACIÓN: DOMAIN ADAPTER (ESTRATO L9)
 * RESPONSABILIDAD: SINAPSIS CON EL PROVEEDOR DE COMPLETIONS LLM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SEAM FIRST: El bucle de tareas consume 'CompletionProvider'; el
 *    adaptador concreto es intercambiable (OpenAI-compatible, mock).
 * 2. WIRE MINIMALISM: Se serializa únicamente el subconjunto del
 *    protocolo chat/completions que el plano de control necesita.
 * =================================================================
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::CortexError;

/// Rol de un turno en la conversación con el proveedor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Turno individual del historial conversacional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Capacidad de completions que el bucle de tareas exige a su proveedor.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Nombre nominal del proveedor para trazas y auditoría.
    fn name(&self) -> &str;

    /// Genera la siguiente completion para el historial entregado.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CortexError>;
}

// --- ADAPTADOR OPENAI-COMPATIBLE ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

/**
 * Adaptador sobre cualquier endpoint compatible con chat/completions.
 * Cubre OpenAI, Ollama, vLLM y gateways internos equivalentes.
 */
pub struct OpenAiCompatProvider {
    network_session_client: reqwest::Client,
    provider_nominal_name: String,
    base_endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        provider_name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            network_session_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("FATAL: Completion client initialization failed."),
            provider_nominal_name: provider_name.into(),
            base_endpoint: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_nominal_name
    }

    #[instrument(skip(self, messages), fields(provider = %self.provider_nominal_name, turns = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CortexError> {
        let target_url = format!("{}/chat/completions", self.base_endpoint);

        let mut request_builder = self
            .network_session_client
            .post(&target_url)
            .json(&ChatCompletionRequest { model: &self.model, messages });

        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let network_response = request_builder.send().await?;

        let status = network_response.status();
        if !status.is_success() {
            return Err(CortexError::ProviderRejection(status.as_u16()));
        }

        let completion_envelope = network_response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|decode_fault| CortexError::MalformedCompletion(decode_fault.to_string()))?;

        let completion_text = completion_envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CortexError::MalformedCompletion("empty choices".into()))?;

        debug!("🧠 [CORTEX]: Completion received ({} chars).", completion_text.len());
        Ok(completion_text)
    }
}
