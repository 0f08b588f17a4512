//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create the HTTP client used by every remote provider.
///
/// Config: 30s connect timeout, 60s request timeout, rustls TLS,
/// `stockroom/{version}` user-agent, redirect limit 10. Timeouts surface as
/// [`crate::LlmError::Http`]; nothing is retried.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(60))
        .user_agent(concat!("stockroom/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}
