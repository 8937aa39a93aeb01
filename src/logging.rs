use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the filter directives, e.g.
/// `UTILONS_LOG=utilons::simulation=debug`.
pub const LOG_ENV: &str = "UTILONS_LOG";

static INIT: Once = Once::new();

/// Install a stderr subscriber filtered by `UTILONS_LOG`, falling back to
/// `utilons=info`. Idempotent.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("utilons=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}
