use tracing_subscriber::{EnvFilter, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "firebase_migrate=info,services=info,backend=info,utils=info";

/// Install the global subscriber sending log lines to `writer`. `RUST_LOG`
/// overrides the default filter. Calling it twice is harmless.
pub fn init<W>(writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer),
        )
        .try_init();
}
