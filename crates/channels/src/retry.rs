use std::time::Duration;

use tracing::warn;

use crate::outbound::{ChannelError, ChannelSender, DeliveryId};

/// Bounded retry policy for outbound sends. Retries are intentionally small:
/// the webhook path must complete quickly, and the event log records what
/// actually went out.
#[derive(Clone, Copy, Debug)]
pub struct SendRetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for SendRetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay: Duration::from_millis(500) }
    }
}

impl SendRetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Send with multiplicative backoff. Returns the last error once the retry
/// budget is exhausted.
pub async fn send_with_retry(
    sender: &dyn ChannelSender,
    to: &str,
    body: &str,
    policy: SendRetryPolicy,
) -> Result<DeliveryId, ChannelError> {
    let mut attempt = 0;

    loop {
        match sender.send(to, body).await {
            Ok(delivery_id) => return Ok(delivery_id),
            Err(error) if attempt < policy.max_retries => {
                warn!(
                    event_name = "channel.send.retry",
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    error = %error,
                    "outbound send failed, backing off before retry"
                );
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
