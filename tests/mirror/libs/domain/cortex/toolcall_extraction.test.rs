// [tests/mirror/libs/domain/cortex/toolcall_extraction.test.rs]
/**
 * =================================================================
 * APARATO: TOOL-CALL EXTRACTOR TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L9)
 * RESPONSABILIDAD: EXTRACCIÓN BEST-EFFORT DE DIRECTIVAS JSON
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use legator_domain_cortex::toolcall::extract_tool_call;

    #[test]
    fn certify_strict_json_extraction() {
        let reply = r#"{"command": "df", "args": ["-h"], "probe": "prb-abc", "reason": "disk check"}"#;
        let call = extract_tool_call(reply).expect("strict JSON must parse");
        assert_eq!(call.command, "df");
        assert_eq!(call.args, vec!["-h"]);
        assert_eq!(call.probe.as_deref(), Some("prb-abc"));
    }

    #[test]
    fn certify_embedded_json_extraction() {
        let reply = "Voy a revisar el disco del nodo.\n\n\
            {\"command\": \"df\", \"args\": [\"-h\"], \"target\": \"tag:edge\", \"reason\": \"space\"}\n\n\
            Espera los resultados.";
        let call = extract_tool_call(reply).expect("embedded JSON must parse");
        assert_eq!(call.command, "df");
        assert_eq!(call.target.as_deref(), Some("tag:edge"));
    }

    #[test]
    fn certify_conversational_reply_is_not_a_call() {
        assert!(extract_tool_call("La flota luce saludable, sin acciones pendientes.").is_none());
        assert!(extract_tool_call("").is_none());
    }

    #[test]
    fn certify_braces_inside_strings_do_not_break_balance() {
        let reply = "resultado: {\"command\": \"echo\", \"args\": [\"{not json}\"], \"target\": \"all\"}";
        let call = extract_tool_call(reply).expect("braces in strings must not break the scan");
        assert_eq!(call.command, "echo");
        assert_eq!(call.args, vec!["{not json}"]);
    }

    #[test]
    fn certify_json_without_command_is_ignored() {
        let reply = r#"{"status": "ok", "note": "nothing to run"}"#;
        assert!(extract_tool_call(reply).is_none());
    }

    #[test]
    fn certify_first_valid_candidate_wins() {
        let reply = "{\"broken\": } luego {\"command\": \"uptime\", \"probe\": \"prb-1\"}";
        let call = extract_tool_call(reply).expect("scan must recover after invalid candidate");
        assert_eq!(call.command, "uptime");
    }
}
