#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared setup for the library's integration tests.

use autoscribe::providers::ai::AiProvider;
use autoscribe::{CompletionClient, CompletionOptions};
use dotenvy::dotenv;
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        tracing_subscriber::fmt().with_test_writer().init();
    });
}

/// A completion client with short timeouts suited to tests.
pub fn test_client(provider: impl AiProvider + 'static) -> CompletionClient {
    CompletionClient::new(
        Box::new(provider),
        CompletionOptions {
            timeout: Duration::from_secs(5),
            max_retries: 1,
            retry_delay: Duration::from_millis(10),
        },
    )
}
