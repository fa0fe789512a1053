//! Integration test infrastructure for the Food Zone license service.
//!
//! Every test gets its own SQLite file in a temp directory, so tests run in
//! parallel without sharing state.
//!
//! ## Usage
//!
//! ```ignore
//! use foodzone_tests::{context::TestContext, helpers::start_test_server};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let ctx = TestContext::new().await.unwrap();
//!     let (addr, _handle) = start_test_server(&ctx, TestContext::admin_credentials()).await.unwrap();
//!     // ...
//! }
//! ```

pub mod context;
pub mod fixtures;
pub mod helpers;

/// Initialize test logging once.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,foodzone_tests=debug"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
