//! Client-side shim: a `cdylib` exporting the ten syscall replacements
//! spec.md §6 names, redirecting every one of them (once past the
//! fd-namespace check) to the remote agent over a single TCP connection.
//!
//! Everything runs from the moment this library is loaded: [`init`] is
//! `ctor`-run exactly once, resolving the real primitives
//! ([`original::init`]) and connecting to the configured remote agent
//! ([`connection::connect`]) before the application gets to run any of its
//! own code, matching the original source's `_init`/`_fini` constructor
//! pair.

mod connection;
mod dirtree;
mod error;
pub mod guard;
mod hooks;
mod ops;
mod original;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("NETFS_LAYER_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("netfs=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[ctor::ctor]
fn init() {
    init_tracing();
    original::init();

    let config = netfs_config::NetfsConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to default config");
        netfs_config::NetfsConfig::default()
    });
    connection::connect(config.server_host, config.server_port);
    tracing::info!(host = %config.server_host, port = config.server_port, "netfs layer attached");
}
