use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Console-only logging, used when observability is disabled.
///
/// - **Log Level**: `LOG_LEVEL` (default: "info"), overridden by `RUST_LOG`
/// - **Filtering**: noisy dependencies are held at warn
/// - **Format**: compact, with file and line
pub fn init_basic_console_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&log_level)));

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::registry().with(console_layer).try_init();

    eprintln!("Observability disabled - console logging only");
}

pub(crate) fn default_directives(log_level: &str) -> String {
    format!(
        "tastelog={level},tastelog_ratelimit={level},tastelog_auth={level},tastelog_core={level},\
         tower_http=warn,hyper=warn,reqwest=warn,tonic=warn,h2=warn",
        level = log_level
    )
}
