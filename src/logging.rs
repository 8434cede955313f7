/// Diagnostic tracing
///
/// Tracing is for debugging lucien itself: it goes to stderr and is
/// filtered by `RUST_LOG`. Anything the user is meant to read goes
/// through the console instead.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaults to `warn`.
///
/// ```bash
/// RUST_LOG=lucien_lib=debug lucien
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // try_init so a second call (tests, embedding) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
