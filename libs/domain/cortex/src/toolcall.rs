// [libs/domain/cortex/src/toolcall.rs]
/*!
 * =================================================================
 * APARATO: TOOL-CALL EXTRACTOR (V5.0 - BEST EFFORT PARSER)
 * CLASIFICACIÓN: DOMAIN ENGINE (ESTRATO L9)
 * RESPONSABILIDAD: EXTRACCIÓN DE DIRECTIVAS JSON DE TEXTO LIBRE
 *
 * # Logic:
 * Extracción en dos fases: (1) el texto completo como JSON estricto;
 * (2) barrido de sub-cadenas balanceadas por llaves. Un candidato es
 * válido sólo si deserializa y transporta el campo 'command'. Si ambas
 * fases fallan, la respuesta se trata como conversacional.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Directiva de herramienta sintetizada por el proveedor LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Comando a despachar.
    pub command: String,
    /// Argumentos posicionales.
    #[serde(default)]
    pub args: Vec<String>,
    /// Sonda objetivo explícita.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
    /// Selector de objetivos: "all", "tag:<name>" o un probe_id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Justificación sintetizada por el modelo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/**
 * Intenta extraer una directiva de herramienta de una respuesta libre.
 * Retorna None cuando la respuesta debe tratarse como conversacional.
 */
pub fn extract_tool_call(reply_text: &str) -> Option<ToolCall> {
    let trimmed_reply = reply_text.trim();

    // FASE 1: JSON estricto de cuerpo completo.
    if let Ok(direct_call) = serde_json::from_str::<ToolCall>(trimmed_reply) {
        if !direct_call.command.is_empty() {
            return Some(direct_call);
        }
    }

    // FASE 2: Barrido de sub-cadenas balanceadas.
    scan_balanced_candidates(trimmed_reply)
}

/**
 * Recorre cada apertura de llave y prueba la sub-cadena balanceada que
 * nace en ella. Se descartan llaves dentro de literales de cadena.
 */
fn scan_balanced_candidates(text: &str) -> Option<ToolCall> {
    let bytes = text.as_bytes();

    for (start_index, byte) in bytes.iter().enumerate() {
        if *byte != b'{' {
            continue;
        }

        if let Some(end_index) = find_balanced_end(bytes, start_index) {
            let candidate_slice = &text[start_index..=end_index];
            if let Ok(parsed_call) = serde_json::from_str::<ToolCall>(candidate_slice) {
                if !parsed_call.command.is_empty() {
                    return Some(parsed_call);
                }
            }
        }
    }

    None
}

/// Localiza el cierre balanceado de la llave abierta en 'start_index'.
fn find_balanced_end(bytes: &[u8], start_index: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut inside_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes[start_index..].iter().enumerate() {
        if inside_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                inside_string = false;
            }
            continue;
        }

        match byte {
            b'"' => inside_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start_index + offset);
                }
            }
            _ => {}
        }
    }

    None
}
