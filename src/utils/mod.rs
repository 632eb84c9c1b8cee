pub mod persistence;

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "budgetwise_core=info";

/// Initializes the global tracing subscriber with the default filter.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_FILTER);
}

/// Initializes the global subscriber once. `RUST_LOG` wins over `filter`.
pub fn init_tracing_with(filter: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        // Another subscriber may already be installed by the host application.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
