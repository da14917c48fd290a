//! Shared test support and end-to-end tests.



/// Route tracing output through the test harness. Safe to call from
/// every test; only the first call installs the subscriber.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}
