use std::time::Duration;

use reqwest::Response;

use crate::error::AiError;

/// Backoff policy for transient completion failures.
#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl LlmRetryConfig {
    /// No in-client retries; every failure surfaces immediately.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (1-based). A server-supplied
    /// `Retry-After` replaces the exponential step; both are capped.
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let cap = Duration::from_millis(self.max_delay_ms);
        let delay = match retry_after_secs {
            Some(seconds) => Duration::from_secs(seconds),
            None => {
                let exponent = attempt.saturating_sub(1) as i32;
                let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
                Duration::from_millis(millis as u64)
            }
        };
        delay.min(cap)
    }
}

const MAX_ERROR_BODY_BYTES: usize = 512;

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn truncate_body(mut body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body;
    }
    let cut = (0..=MAX_ERROR_BODY_BYTES)
        .rev()
        .find(|&i| body.is_char_boundary(i))
        .unwrap_or(0);
    body.truncate(cut);
    body.push_str("... [truncated]");
    body
}

/// Turn a non-2xx completion response into [`AiError::LlmHttp`].
pub async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after_secs = retry_after_secs(&response);
    let body = response.text().await.unwrap_or_default();

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message: truncate_body(body),
        retry_after_secs,
    }
}
