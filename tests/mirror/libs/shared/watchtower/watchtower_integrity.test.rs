// [tests/mirror/libs/shared/watchtower/watchtower_integrity.test.rs]
#[cfg(test)]
mod tests {
    use legator_shared_watchtower::init_tracing;

    #[test]
    fn certify_tracing_ignition_is_panic_free() {
        // La ignición instala el suscriptor global y el hook de pánicos.
        init_tracing("watchtower_proving_grounds");

        tracing::info!("🧪 [PROVING_GROUNDS]: Watchtower emitting through the installed subscriber.");
        tracing::warn!("🧪 [PROVING_GROUNDS]: Warning severity path exercised.");
    }
}
