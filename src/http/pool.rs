use reqwest::Client;
use std::time::Duration;
use crate::error::Result;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Builds the single client shared by every submission.
pub fn create_http_client(connect_timeout: Duration, request_timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .tcp_nodelay(true) // Disable Nagle's algorithm for lower latency
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(10)
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()?;

    Ok(client)
}
