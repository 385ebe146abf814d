use tracing_subscriber::EnvFilter;

/// Map a `LOG_LEVEL` value onto an `EnvFilter` directive.
///
/// `WARNING` and `CRITICAL` are accepted as aliases; `DISABLED` yields `None`.
fn filter_directive(log_level: &str) -> Option<String> {
    match log_level.trim().to_ascii_lowercase().as_str() {
        "disabled" => None,
        "warning" => Some("warn".to_string()),
        "critical" => Some("error".to_string()),
        other => Some(other.to_string()),
    }
}

/// Install the global fmt subscriber, unless logging is disabled.
pub fn init_tracing(log_level: &str) {
    let Some(directive) = filter_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid LOG_LEVEL {log_level:?} ({err}); falling back to info");
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
