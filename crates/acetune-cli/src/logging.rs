use std::io::{self, IsTerminal as _};

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Installs the global subscriber. Filtering follows `RUST_LOG`, defaulting to `info`.
///
/// Events go to stderr so that command output on stdout stays machine readable.
pub(crate) fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);
    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}
