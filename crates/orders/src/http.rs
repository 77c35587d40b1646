use std::time::Duration;

use reqwest::Client;
use storechat_core::errors::{UpstreamError, UpstreamService};

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

pub fn transport_error(service: UpstreamService, error: &reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::timeout(service)
    } else if error.is_decode() {
        UpstreamError::decode(service, error.to_string())
    } else {
        UpstreamError::transport(service, error.to_string())
    }
}
