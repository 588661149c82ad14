use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::attendance::repository::RosterRepository;
use crate::photos::{PhotoRequestError, PhotoProvisioningService};

/// Localized keyword a person replies with to decline providing a photo.
pub const DECLINE_KEYWORD: &str = "tidak";

/// Payload of one inbound platform event. Ephemeral; consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Media(Vec<u8>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessageEvent {
    pub sender: String,
    pub payload: InboundPayload,
}

/// What the router did with an event; surfaced for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundDisposition {
    ResolvedMedia,
    ResolvedDecline,
    Dropped,
}

/// Resolves inbound platform events against outstanding photo requests.
/// Events from senders with no pending request are dropped without a reply,
/// which also shields the flow from unsolicited messages.
pub struct InboundMessageRouter<S> {
    store: Arc<S>,
    photos: Arc<PhotoProvisioningService<S>>,
}

impl<S> InboundMessageRouter<S>
where
    S: RosterRepository + 'static,
{
    pub fn new(store: Arc<S>, photos: Arc<PhotoProvisioningService<S>>) -> Self {
        Self { store, photos }
    }

    /// Consumes events in arrival order. Running a single loop per router
    /// instance keeps events from one sender ordered; ordering across
    /// distinct senders is not guaranteed.
    pub async fn run(self: Arc<Self>, mut inbox: mpsc::Receiver<InboundMessageEvent>) {
        while let Some(event) = inbox.recv().await {
            let sender = event.sender.clone();
            if let Err(err) = self.handle(event).await {
                warn!(%sender, error = %err, "inbound event processing failed");
            }
        }
    }

    pub async fn handle(
        &self,
        event: InboundMessageEvent,
    ) -> Result<InboundDisposition, PhotoRequestError> {
        let Some(person) = self.store.find_pending_by_contact(&event.sender)? else {
            debug!(sender = %event.sender, "inbound event without pending request dropped");
            return Ok(InboundDisposition::Dropped);
        };

        match event.payload {
            InboundPayload::Media(bytes) => {
                self.photos.resolve_media(&person.id, bytes).await?;
                Ok(InboundDisposition::ResolvedMedia)
            }
            InboundPayload::Text(text) if is_decline(&text) => {
                self.photos.resolve_decline(&person.id).await?;
                Ok(InboundDisposition::ResolvedDecline)
            }
            InboundPayload::Text(_) => Ok(InboundDisposition::Dropped),
        }
    }
}

fn is_decline(text: &str) -> bool {
    text.trim().to_lowercase() == DECLINE_KEYWORD
}
