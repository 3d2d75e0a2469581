//! Structured logging bootstrap for hosts embedding fontmgr.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over [`Config::log_level`]; an invalid filter
/// falls back to `info` with a warning on stderr. Returns `false` when a
/// subscriber was already installed.
pub fn init(cfg: &Config) -> bool {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: FONTMGR_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    let installed = if cfg.log_json {
        subscriber.json().try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    };

    if installed {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "fontmgr logging initialised");
    }
    installed
}
