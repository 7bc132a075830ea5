//! Form submission handler
//!
//! Forwards the raw body to the store writer and redirects, without waiting
//! for or checking the outcome.

use crate::relay::RelaySender;
use crate::Response;

/// Where the browser is sent after a submission
pub const SUBMIT_REDIRECT: &str = "/message";

#[derive(Debug, Clone)]
pub struct Submit {
    relay: RelaySender,
}

impl Submit {
    pub fn new(relay: RelaySender) -> Self {
        Self { relay }
    }

    pub async fn handle(&self, body: &[u8]) -> Response {
        match self.relay.forward(body).await {
            Ok(sent) => tracing::debug!(sent, target = %self.relay.target(), "form forwarded"),
            Err(e) => tracing::warn!(
                error = %e,
                len = body.len(),
                target = %self.relay.target(),
                "form forward failed"
            ),
        }

        Response::redirect(SUBMIT_REDIRECT)
    }
}
