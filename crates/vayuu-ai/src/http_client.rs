use std::time::Duration;

use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "VAYUU_DISABLE_SYSTEM_PROXY";

/// Build a shared HTTP client with the given request timeout.
pub(crate) fn build_http_client(timeout: Duration) -> Client {
    let builder = Client::builder().timeout(timeout);
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };
    // Falls back to the default client if the TLS backend cannot be configured.
    builder.build().unwrap_or_else(|error| {
        tracing::warn!(error = %error, "Failed to build HTTP client, using defaults");
        Client::new()
    })
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
