//! Relay reachability probe

use std::time::Duration;
use tokio::net::TcpStream;

/// Whether a relay server accepts connections at `addr` within `timeout`
///
/// The probe connects and closes without subscribing, the server treats
/// that as a probe and registers no session.
pub async fn probe_relay(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!(addr, error = %e, "Relay probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(addr, timeout_ms = timeout.as_millis() as u64, "Relay probe timed out");
            false
        }
    }
}
