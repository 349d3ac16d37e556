//! Provide tracing, tailored to this library and its tools.
//!
//! A program built on j5-hal should call one of the init_* functions at
//! startup to install a tracing subscriber (i.e., something that emits events
//! to a log). The library itself only emits events and never installs a
//! subscriber.
//!
//! Modules include `use crate::tracing::prelude::*` for convenient access to
//! the `trace!()`, `debug!()`, `info!()`, `warn!()`, and `error!()` macros.
//!
//! Levels as used across the crate:
//!
//! - `trace`: every protocol line, as `<port> -> W 3 H` for lines sent and
//!   `<port> <- + OK` for lines received, and ports discovery ignored
//! - `debug`: connection state transitions and serial port opens
//! - `info`: boards coming up, discovered and closed
//! - `warn`: firmware too old, ports skipped during discovery
//! - `error`: discovery aborted
//!
//! `RUST_LOG=j5_hal=trace` therefore gives a full transcript of the serial
//! traffic, with timestamps to the millisecond so that exchanges can be
//! lined up against the configured timeout.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// If running under systemd, use journald; otherwise fall
/// back to stderr, leaving stdout to the program's own output.
pub fn init_journald_or_stderr() {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry().with(layer).init();
        } else {
            use_stderr();
            error!("Failed to initialize journald logging, using stderr.");
        }
    } else {
        use_stderr();
    }
}

// Log to stderr, filtering according to environment variable RUST_LOG,
// overriding the default level (ERROR) to INFO.
fn use_stderr() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer),
        )
        .init();
}

// Timestamps in local time, to the millisecond.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", formatted)
    }
}
