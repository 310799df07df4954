use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::{
    applicant::Identity,
    error::{FlowError, Result},
    step::Outbound,
};

/// Outbound side of the chat transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, recipient: Identity, message: Outbound) -> Result<()>;
}

/// Delivers each message in order, logging failures instead of returning them.
pub(crate) async fn deliver_best_effort(
    transport: &dyn Transport,
    recipient: Identity,
    messages: impl IntoIterator<Item = Outbound>,
) {
    for message in messages {
        if let Err(e) = transport.deliver(recipient, message).await {
            warn!(user_id = %recipient, error = %e, "Failed to deliver message");
        }
    }
}

/// Transport that records every delivery. Recipients listed in `unreachable`
/// fail with [`FlowError::DeliveryFailed`].
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(Identity, Outbound)>>>,
    unreachable: Arc<Mutex<Vec<Identity>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_unreachable(&self, recipient: Identity) {
        self.unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(recipient);
    }

    pub fn sent(&self) -> Vec<(Identity, Outbound)> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sent_to(&self, recipient: Identity) -> Vec<Outbound> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, recipient: Identity, message: Outbound) -> Result<()> {
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&recipient);
        if unreachable {
            return Err(FlowError::DeliveryFailed(format!(
                "recipient {recipient} is unreachable"
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((recipient, message));
        Ok(())
    }
}
