#![doc(test(attr(deny(warnings))))]

//! Billing Core provides the deterministic slip calculation engine and the
//! history ledger primitives (deduplication, voucher-range reports, artifact
//! persistence) behind the coconut trade billing front-ends.

pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod render;
pub mod storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("billing_core=info".parse().unwrap());

        fmt().with_env_filter(filter).init();
        tracing::info!("Billing Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
