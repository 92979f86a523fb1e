//! A multi-tenant inventory cataloging service.
//!
//! This crate provides the catalog engine: per-inventory custom identifier
//! generation driven by a stored segment format, write-access evaluation,
//! and optimistic-concurrency mutations over inventories and their items.
//!
//! Client/server communication relies on [`tonic`], a Rust implementation of
//! gRPC, a high performance, open source, general RPC framework.
//!
//! [`tonic`]: https://docs.rs/tonic


pub mod catalog;
pub mod transport;

#[cfg(feature = "shelfmark_tracing")]
pub mod shelfmark_tracing {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Initialize tracing for tests
    /// This sets up a tracing subscriber that will display logs during test execution.
    /// Call this at the beginning of tests that need to see tracing output.
    pub fn init() {
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("off"))
                .unwrap();

            fmt()
                .with_target(false)
                .with_test_writer()
                .with_env_filter(filter)
                .init();
        });
    }
}
