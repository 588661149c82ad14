use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::messages;
use crate::attendance::domain::{Person, PersonId, PhotoRequestState};
use crate::attendance::repository::{RepositoryError, RosterRepository};
use crate::events::{AdminEvent, EventSink};
use crate::media::{MediaStore, MediaStoreError};
use crate::messaging::{DeliveryError, MessageContent, OutboundDispatcher};
use crate::tasks::TaskGroup;
use crate::tokens::TokenIssuer;

/// How a photo request was initiated; selects the message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoRequestKind {
    /// Sent right after enrollment, before any other contact.
    FirstTime,
    /// Admin-initiated request for a person with no stored photo.
    FollowUp,
    /// Admin-initiated replacement of an existing photo.
    Change,
}

/// Error raised by the photo-provisioning service.
#[derive(Debug, thiserror::Error)]
pub enum PhotoRequestError {
    #[error("person not found")]
    NotFound,
    #[error("person has no registered contact address")]
    MissingContact,
    #[error("a photo request is already pending for this person")]
    AlreadyPending,
    #[error(transparent)]
    Dispatch(DeliveryError),
    #[error(transparent)]
    Media(#[from] MediaStoreError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PhotoRequestError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoRequestReceipt {
    pub person_name: String,
    pub kind: PhotoRequestKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkRequestReceipt {
    pub selected: usize,
}

/// Drives the per-person photo state machine. The claim (check-then-set to
/// `Pending`) happens inside the store's critical section, so concurrent
/// requests for the same person serialize; a failed dispatch always rolls the
/// claim back so nobody is stuck `Pending` with no outstanding message.
pub struct PhotoProvisioningService<S> {
    store: Arc<S>,
    dispatcher: Arc<OutboundDispatcher>,
    tokens: Arc<dyn TokenIssuer>,
    media: Arc<dyn MediaStore>,
    events: Arc<dyn EventSink>,
    tasks: TaskGroup,
}

impl<S> PhotoProvisioningService<S>
where
    S: RosterRepository + 'static,
{
    pub fn new(
        store: Arc<S>,
        dispatcher: Arc<OutboundDispatcher>,
        tokens: Arc<dyn TokenIssuer>,
        media: Arc<dyn MediaStore>,
        events: Arc<dyn EventSink>,
        tasks: TaskGroup,
    ) -> Self {
        Self {
            store,
            dispatcher,
            tokens,
            media,
            events,
            tasks,
        }
    }

    /// Read-through to the roster; the HTTP layer uses it to pick wording.
    pub fn person(&self, id: &PersonId) -> Result<Option<Person>, PhotoRequestError> {
        Ok(self.store.fetch_person(id)?)
    }

    /// Requests a photo from one person. Fails `AlreadyPending` while a
    /// request is outstanding and `MissingContact` when the person cannot be
    /// reached; on dispatch failure the state change is rolled back to
    /// `Idle`.
    pub async fn request_photo(
        &self,
        person_id: &PersonId,
        kind: PhotoRequestKind,
    ) -> Result<PhotoRequestReceipt, PhotoRequestError> {
        let person = self
            .store
            .fetch_person(person_id)?
            .ok_or(PhotoRequestError::NotFound)?;
        let contact = person
            .contact()
            .ok_or(PhotoRequestError::MissingContact)?
            .to_string();

        let claimed = match self.store.claim_photo_request(person_id) {
            Ok(person) => person,
            Err(RepositoryError::Conflict) => return Err(PhotoRequestError::AlreadyPending),
            Err(other) => return Err(other.into()),
        };

        let body = messages::photo_request(kind, &claimed.name);
        if let Err(err) = self
            .dispatcher
            .send_single(&contact, &MessageContent::Text(body))
            .await
        {
            self.store
                .set_photo_state(person_id, PhotoRequestState::Idle)?;
            return Err(PhotoRequestError::Dispatch(err));
        }

        self.events.publish(AdminEvent::info(format!(
            "photo request sent to {}",
            claimed.name
        )));
        Ok(PhotoRequestReceipt {
            person_name: claimed.name,
            kind,
        })
    }

    /// Requests photos from everyone without one. The loop runs in the
    /// background with broadcast pacing; a dispatch failure rolls that one
    /// person back to `Idle` and the batch continues.
    pub fn bulk_request_photo(&self) -> Result<BulkRequestReceipt, PhotoRequestError> {
        let candidates = self.store.photo_request_candidates()?;
        let selected = candidates.len();
        if selected == 0 {
            return Ok(BulkRequestReceipt { selected });
        }

        let store = Arc::clone(&self.store);
        let dispatcher = Arc::clone(&self.dispatcher);
        let events = Arc::clone(&self.events);
        self.tasks.spawn(async move {
            info!(count = selected, "bulk photo request starting");
            for (index, person) in candidates.iter().enumerate() {
                if let Err(err) = bulk_request_one(&store, &dispatcher, person).await {
                    warn!(person = %person.name, error = %err, "bulk photo request failed");
                    events.publish(AdminEvent::warning(format!(
                        "photo request to {} failed: {err}",
                        person.name
                    )));
                } else {
                    events.publish(AdminEvent::info(format!(
                        "photo request sent to {}",
                        person.name
                    )));
                }
                if index + 1 < candidates.len() {
                    dispatcher.pace().await;
                }
            }
            info!("bulk photo request finished");
        });

        Ok(BulkRequestReceipt { selected })
    }

    /// Accepts inbound media for a pending request: stores the photo, marks
    /// the exchange `Completed`, then re-issues the identity token and
    /// confirms delivery. Ignored when the person is not `Pending`.
    pub async fn resolve_media(
        &self,
        person_id: &PersonId,
        bytes: Vec<u8>,
    ) -> Result<(), PhotoRequestError> {
        let Some(person) = self.store.fetch_person(person_id)? else {
            return Ok(());
        };
        if person.photo_request_state != PhotoRequestState::Pending {
            return Ok(());
        }

        let photo = self.media.store_photo(person_id, &bytes)?;
        if !self
            .store
            .complete_photo_request(person_id, Some(photo))?
        {
            // Lost the race against another resolution; nothing to confirm.
            return Ok(());
        }

        self.events.publish(AdminEvent::success(format!(
            "photo received from {}",
            person.name
        )));

        if let Some(contact) = person.contact() {
            self.confirm_media(person_id, contact, &person.name).await;
        }
        Ok(())
    }

    /// Accepts a decline for a pending request: `Completed` without a photo,
    /// with an acknowledgement. Ignored when the person is not `Pending`.
    pub async fn resolve_decline(&self, person_id: &PersonId) -> Result<(), PhotoRequestError> {
        let Some(person) = self.store.fetch_person(person_id)? else {
            return Ok(());
        };
        if person.photo_request_state != PhotoRequestState::Pending {
            return Ok(());
        }
        if !self.store.complete_photo_request(person_id, None)? {
            return Ok(());
        }

        self.events.publish(AdminEvent::info(format!(
            "{} declined the photo request",
            person.name
        )));

        if let Some(contact) = person.contact() {
            if let Err(err) = self
                .dispatcher
                .send_single(
                    contact,
                    &MessageContent::Text(messages::decline_acknowledged().to_string()),
                )
                .await
            {
                warn!(%contact, error = %err, "decline acknowledgement not delivered");
            }
        }
        Ok(())
    }

    /// Administrative escape hatch: unconditionally returns the person to
    /// `Idle`, e.g. after an error left the exchange inconsistent.
    pub fn reset(&self, person_id: &PersonId) -> Result<(), PhotoRequestError> {
        self.store
            .set_photo_state(person_id, PhotoRequestState::Idle)?;
        self.events
            .publish(AdminEvent::info("photo request state reset".to_string()));
        Ok(())
    }

    /// Issues the refreshed token image and sends confirmation plus token.
    /// These are side effects of an already-completed resolution; failures
    /// are logged, never escalated.
    async fn confirm_media(&self, person_id: &PersonId, contact: &str, name: &str) {
        if let Err(err) = self
            .dispatcher
            .send_single(
                contact,
                &MessageContent::Text(messages::media_received().to_string()),
            )
            .await
        {
            warn!(%contact, error = %err, "photo confirmation not delivered");
        }

        let refreshed = match self.store.fetch_person(person_id) {
            Ok(Some(person)) => person,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "could not reload person for token re-issue");
                return;
            }
        };
        match self.tokens.issue(&refreshed) {
            Ok(image) => {
                let content = MessageContent::Image {
                    bytes: image.bytes,
                    caption: messages::token_caption(name, true),
                };
                if let Err(err) = self.dispatcher.send_single(contact, &content).await {
                    warn!(%contact, error = %err, "refreshed token not delivered");
                }
            }
            Err(err) => {
                warn!(error = %err, "token re-issue failed after photo resolution");
            }
        }
    }
}

async fn bulk_request_one<S: RosterRepository>(
    store: &Arc<S>,
    dispatcher: &Arc<OutboundDispatcher>,
    person: &Person,
) -> Result<(), PhotoRequestError> {
    let contact = person
        .contact()
        .ok_or(PhotoRequestError::MissingContact)?
        .to_string();

    // Someone may have claimed this person since the candidate query ran.
    match store.claim_photo_request(&person.id) {
        Ok(_) => {}
        Err(RepositoryError::Conflict) => return Err(PhotoRequestError::AlreadyPending),
        Err(other) => return Err(other.into()),
    }

    let body = messages::photo_request(PhotoRequestKind::FollowUp, &person.name);
    if let Err(err) = dispatcher
        .send_single(&contact, &MessageContent::Text(body))
        .await
    {
        store.set_photo_state(&person.id, PhotoRequestState::Idle)?;
        return Err(PhotoRequestError::Dispatch(err));
    }
    Ok(())
}
