//! Photo delivery with bounded retry and a text fallback

use crate::menu;
use crate::retry::{retry, RetryOutcome, RetryPolicy, Verdict};
use crate::transport::{ChatTransport, Keyboard, TransportError, UserId};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DELIVERY_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Delivery failed; the user has already been sent the fallback text
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: TransportError },
    #[error("delivery rejected: {0}")]
    Rejected(TransportError),
}

pub struct DeliveryService<T: ChatTransport> {
    transport: Arc<T>,
    policy: RetryPolicy,
}

impl<T: ChatTransport> DeliveryService<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::new(DELIVERY_INTERVAL, MAX_DELIVERY_ATTEMPTS),
        }
    }

    #[allow(dead_code)] // Tests deliver without delays
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Send `image` to `user`. Transient failures are retried; anything else,
    /// or running out of attempts, falls back to an apology text.
    pub async fn deliver(
        &self,
        user: UserId,
        image: &[u8],
        keyboard: Option<&Keyboard>,
    ) -> Result<(), DeliveryError> {
        let transport = &self.transport;

        let outcome = retry(self.policy, move |attempt| async move {
            match transport
                .send_photo(user, image, menu::IMAGE_CAPTION, keyboard)
                .await
            {
                Ok(()) => Verdict::Ready(()),
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        user_id = %user,
                        attempt,
                        error = %e,
                        "Photo delivery failed, will retry"
                    );
                    Verdict::Retry(Some(e))
                }
                Err(e) => Verdict::Abort(e),
            }
        })
        .await;

        let error = match outcome {
            RetryOutcome::Ready(()) => return Ok(()),
            RetryOutcome::Aborted(e) => DeliveryError::Rejected(e),
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => DeliveryError::Exhausted {
                attempts,
                last: last_error
                    .unwrap_or_else(|| TransportError::network("no attempt was made")),
            },
        };

        tracing::error!(user_id = %user, error = %error, "Photo delivery failed");
        if let Err(e) = self
            .transport
            .send_text(user, menu::DELIVERY_FAILED, None)
            .await
        {
            tracing::error!(user_id = %user, error = %e, "Failed to send delivery apology");
        }

        Err(error)
    }
}
