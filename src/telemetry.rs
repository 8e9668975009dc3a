//! Process-wide tracing setup for binaries embedding a [`RestHost`].
//!
//! [`RestHost`]: crate::host::RestHost

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). Output is human-readable
/// by default and switches to JSON lines when `RESTMAP_LOG_FORMAT=json`,
/// for log shippers. Calling this more than once is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("RESTMAP_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
