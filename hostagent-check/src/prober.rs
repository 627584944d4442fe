use async_trait::async_trait;
use rand::{rng, Rng};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::debug;

const RETRY_JITTER_MIN_MS: u64 = 200;
const RETRY_JITTER_MAX_MS: u64 = 2_000;

/// Measures whether a broker node accepts connections and how fast.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns the connect latency of the first successful attempt, `None` once every
    /// attempt failed.
    async fn probe(
        &self,
        host: &str,
        port: u16,
        attempt_timeout: Duration,
        max_attempts: u32,
    ) -> Option<Duration>;
}

/// Probes with plain TCP connects. The connection is dropped as soon as it is measured.
#[derive(Debug, Clone, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(
        &self,
        host: &str,
        port: u16,
        attempt_timeout: Duration,
        max_attempts: u32,
    ) -> Option<Duration> {
        let attempts = max_attempts.max(1);

        for attempt in 1..=attempts {
            let start = Instant::now();
            match timeout(attempt_timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(stream)) => {
                    let elapsed = start.elapsed();
                    drop(stream);
                    debug!(host = %host, port, attempt, latency = ?elapsed, "broker reachable");
                    return Some(elapsed);
                }
                Ok(Err(e)) => {
                    debug!(host = %host, port, attempt, error = %e, "broker connect failed");
                }
                Err(_) => {
                    debug!(host = %host, port, attempt, timeout = ?attempt_timeout, "broker connect timed out");
                }
            }

            if attempt < attempts {
                sleep(retry_jitter()).await;
            }
        }

        None
    }
}

/// Random pause in [200ms, 2s) so agents probing the same broker do not retry in lockstep.
pub(crate) fn retry_jitter() -> Duration {
    Duration::from_millis(rng().random_range(RETRY_JITTER_MIN_MS..RETRY_JITTER_MAX_MS))
}
