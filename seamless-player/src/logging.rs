//! Process-wide tracing setup

use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// `level` applies to this library and the `seamless-play` binary; a set
/// `RUST_LOG` replaces it entirely.
///
/// # Returns
/// `true` only for the call that installed the subscriber. Later calls (and
/// calls made after some other subscriber was installed) do nothing and
/// return `false`.
pub fn init(level: &str) -> bool {
    let mut installed_now = false;
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("seamless_player={level},seamless_play={level}"))
        });

        installed_now = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok();
        installed_now
    });
    installed_now
}
