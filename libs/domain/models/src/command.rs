// [libs/domain/models/src/command.rs]
/*!
 * =================================================================
 * APARATO: COMMAND CONTRACT (V15.0 - SIGNED ENVELOPES)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE ÓRDENES, RESULTADOS Y FRAGMENTOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CANONICAL SIGNING FORM: La firma se calcula sobre el JSON canónico
 *    del sobre con el campo 'signature' ausente. El orden de declaración
 *    de los campos ES el orden canónico; no debe alterarse sin rotar la
 *    versión del protocolo.
 * 2. TERMINAL UNIQUENESS: Cada 'request_id' produce exactamente un
 *    mensaje terminal (un CommandResult, o un OutputChunk final con
 *    exit_code embebido).
 * =================================================================
 */

use serde::{Deserialize, Serialize};

use crate::probe::PolicyLevel;

/// Sobre de orden emitido por el plano de control hacia una sonda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Correlador único de la orden (request_id).
    pub request_id: String,
    /// Comando a ejecutar en el host remoto.
    pub command: String,
    /// Argumentos posicionales del comando.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Nivel de política requerido para la ejecución.
    pub level: PolicyLevel,
    /// Presupuesto de ejecución en segundos.
    pub timeout_seconds: u64,
    /// Solicita transmisión incremental de la salida.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    /// Etiqueta HMAC adjunta al emitir (hex). Ausente en la forma canónica.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl CommandEnvelope {
    /**
     * Produce la forma canónica en bytes para la firma: el sobre con la
     * etiqueta de firma removida, serializado en orden de declaración.
     */
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut unsigned_clone = self.clone();
        unsigned_clone.signature = None;
        serde_json::to_vec(&unsigned_clone)
    }
}

/// Resultado terminal de una orden ejecutada por la sonda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Correlador de la orden original.
    pub request_id: String,
    /// Código de salida del proceso remoto.
    pub exit_code: i32,
    /// Salida estándar capturada.
    pub stdout: String,
    /// Salida de error capturada.
    pub stderr: String,
    /// Duración de la ejecución en milisegundos.
    pub duration_ms: u64,
}

/// Canal de origen de un fragmento de salida.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Fragmento incremental de salida de una orden en streaming.
/// El hub garantiza el orden de entrega por 'request_id'.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputChunk {
    /// Correlador de la orden original.
    pub request_id: String,
    /// Secuencia monotónica dentro del request.
    pub seq: u64,
    /// Canal de origen del fragmento.
    pub stream: OutputStream,
    /// Datos del fragmento.
    pub data: String,
    /// Marca el fragmento terminal del stream.
    #[serde(rename = "final", default)]
    pub is_final: bool,
    /// Código de salida, presente sólo cuando 'final' es verdadero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Payload de despacho entregado por el operador (API / CLI / LLM).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Comando a ejecutar.
    pub command: String,
    /// Argumentos posicionales.
    #[serde(default)]
    pub args: Vec<String>,
    /// Correlador explícito; se acuña uno si falta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Presupuesto de ejecución en segundos (default 30).
    #[serde(default = "default_command_timeout")]
    pub timeout_seconds: u64,
    /// Solicita streaming incremental de salida.
    #[serde(default)]
    pub stream: bool,
    /// Nota operativa libre (viaja al expediente de aprobación).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_command_timeout() -> u64 {
    30
}
