//! Structured logging bootstrap using the `tracing` crate.
//!
//! All linework crates log through `tracing` macros; recovered data
//! anomalies (skipped entities, unresolved blocks) are reported with
//! `warn!`. Call [`init`] once from the embedding application, or install
//! your own subscriber instead.

/// Initializes the tracing subscriber with default filters.
///
/// Linework crates log at `debug`, external crates at `info`. Override with
/// the `RUST_LOG` environment variable.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,linework_core=debug,linework_dxf=debug,linework_geometry=debug,\
                 linework_text=debug,linework_scene=debug"
                    .into()
            }),
        )
        .init();
}

/// Like [`init`], but never panics if a subscriber is already set.
pub fn try_init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init()
        .is_ok()
}
