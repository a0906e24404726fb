use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "MARGINALIA_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Install a formatted subscriber for hosts that do not bring their own.
///
/// Filter directives come from `MARGINALIA_LOG`, then `RUST_LOG`, then `info`.
/// Calling this more than once, or after another subscriber was installed, is
/// harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
