use std::time::Duration;

use reqwest::blocking::{Client, Response};

use super::types::ProviderError;

pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ProviderError::new("client_error", &err.to_string(), false))
}

/// Reads the body of a response, mapping non-success statuses to a provider error.
pub fn read_body(resp: Response) -> Result<String, ProviderError> {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if !(status.is_client_error() || status.is_server_error()) {
        return Ok(body);
    }

    let lowered = body.to_lowercase();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(ProviderError::new("auth_error", &body, false));
    }
    if status.as_u16() == 429 || lowered.contains("quota") || lowered.contains("resource_exhausted") {
        return Err(ProviderError::new("rate_limit", &body, true));
    }
    if status.is_server_error() {
        return Err(ProviderError::new("server_error", &body, true));
    }
    Err(ProviderError::new("api_error", &body, false))
}
