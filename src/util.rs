static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the global tracing subscriber once. `RUST_LOG` takes precedence
/// over the configured default level.
pub fn init_tracing_once(default_level: &str) {
    let default_level = default_level.to_string();
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or(default_level);
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}
