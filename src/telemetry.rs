//! Tracing bootstrap for binaries and tests.
//!
//! The library itself only emits through the [`tracing`] facade; nothing
//! here runs unless a host installs a subscriber. [`init_tracing`] is the
//! batteries-included installer: env-filtered fmt output plus span-trace
//! capture so errors surfaced through `miette` carry their async context.

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the default subscriber: `RUST_LOG`-style filtering (falling
/// back to `info`), formatted output, and an [`ErrorLayer`] for span
/// traces. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}
