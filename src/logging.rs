use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "warn,k8s_status=info";

/// Initializes logging to stderr, keeping stdout for page output.
pub fn initialize() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_subscriber = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_subscriber).init();
}
