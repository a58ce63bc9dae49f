// [tests/mirror/libs/infra/db/errors.test.rs]
#[cfg(test)]
mod tests {
    use legator_infra_db::errors::DbError;

    #[test]
    fn certify_error_formatting_semantic() {
        let error = DbError::ProbeNotFound;
        let message = format!("{}", error);

        // El prefijo de estrato alimenta el renderizado del Dashboard.
        assert!(message.contains("[L3_FLEET_FAULT]"));
        assert!(message.contains("PROBE_NOT_FOUND"));
    }

    #[test]
    fn certify_configuration_fault_detail_passthrough() {
        let error = DbError::ConfigurationError("DATABASE_URL_UNDEFINED".into());
        assert!(format!("{}", error).contains("DATABASE_URL_UNDEFINED"));
    }
}
