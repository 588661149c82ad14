use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rollcall::attendance::domain::{
    AttendanceRecord, Person, PersonId, PhotoRef, PhotoRequestState, Session, SessionId,
};
use rollcall::attendance::repository::{
    AttendanceRepository, RepositoryError, RosterRepository, SessionRepository,
};
use rollcall::events::{AdminEvent, EventSink};
use rollcall::media::{MediaStore, MediaStoreError};
use rollcall::messaging::{DeliveryError, MessageContent, MessagingGateway};
use rollcall::tokens::{TokenError, TokenImage, TokenIssuer};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store backing all three repository traits. Each collection
/// sits behind its own mutex; every conditional transition the traits demand
/// runs under the owning lock.
#[derive(Default)]
pub(crate) struct InMemoryRollcallStore {
    people: Mutex<HashMap<PersonId, Person>>,
    sessions: Mutex<HashMap<SessionId, Session>>,
    records: Mutex<HashMap<(PersonId, NaiveDate), AttendanceRecord>>,
}

impl RosterRepository for InMemoryRollcallStore {
    fn insert_person(&self, person: Person) -> Result<Person, RepositoryError> {
        let mut guard = self.people.lock().expect("people mutex poisoned");
        if guard.contains_key(&person.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(person.id.clone(), person.clone());
        Ok(person)
    }

    fn update_person(&self, person: Person) -> Result<(), RepositoryError> {
        let mut guard = self.people.lock().expect("people mutex poisoned");
        if !guard.contains_key(&person.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(person.id.clone(), person);
        Ok(())
    }

    fn remove_person(&self, id: &PersonId) -> Result<(), RepositoryError> {
        self.people
            .lock()
            .expect("people mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch_person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        let guard = self.people.lock().expect("people mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list_people(&self) -> Result<Vec<Person>, RepositoryError> {
        let guard = self.people.lock().expect("people mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn contacts(&self) -> Result<Vec<String>, RepositoryError> {
        let guard = self.people.lock().expect("people mutex poisoned");
        Ok(guard
            .values()
            .filter_map(|person| person.contact().map(str::to_string))
            .collect())
    }

    fn find_pending_by_contact(&self, contact: &str) -> Result<Option<Person>, RepositoryError> {
        let guard = self.people.lock().expect("people mutex poisoned");
        Ok(guard
            .values()
            .find(|person| {
                person.photo_request_state == PhotoRequestState::Pending
                    && person.contact() == Some(contact)
            })
            .cloned())
    }

    fn photo_request_candidates(&self) -> Result<Vec<Person>, RepositoryError> {
        let guard = self.people.lock().expect("people mutex poisoned");
        Ok(guard
            .values()
            .filter(|person| {
                person.photo.is_none()
                    && person.photo_request_state != PhotoRequestState::Pending
                    && person.contact().is_some()
            })
            .cloned()
            .collect())
    }

    fn claim_photo_request(&self, id: &PersonId) -> Result<Person, RepositoryError> {
        let mut guard = self.people.lock().expect("people mutex poisoned");
        let person = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if person.photo_request_state == PhotoRequestState::Pending {
            return Err(RepositoryError::Conflict);
        }
        person.photo_request_state = PhotoRequestState::Pending;
        Ok(person.clone())
    }

    fn set_photo_state(
        &self,
        id: &PersonId,
        new_state: PhotoRequestState,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.people.lock().expect("people mutex poisoned");
        let person = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        person.photo_request_state = new_state;
        Ok(())
    }

    fn complete_photo_request(
        &self,
        id: &PersonId,
        photo: Option<PhotoRef>,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.people.lock().expect("people mutex poisoned");
        let person = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if person.photo_request_state != PhotoRequestState::Pending {
            return Ok(false);
        }
        person.photo_request_state = PhotoRequestState::Completed;
        if photo.is_some() {
            person.photo = photo;
        }
        Ok(true)
    }
}

impl SessionRepository for InMemoryRollcallStore {
    fn insert_session(&self, session: Session) -> Result<Session, RepositoryError> {
        let mut guard = self.sessions.lock().expect("sessions mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError> {
        let guard = self.sessions.lock().expect("sessions mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn fetch_session(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let guard = self.sessions.lock().expect("sessions mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active_session(&self) -> Result<Option<Session>, RepositoryError> {
        let guard = self.sessions.lock().expect("sessions mutex poisoned");
        Ok(guard.values().find(|session| session.active).cloned())
    }

    fn activate_session(&self, id: &SessionId) -> Result<Session, RepositoryError> {
        let mut guard = self.sessions.lock().expect("sessions mutex poisoned");
        if !guard.contains_key(id) {
            return Err(RepositoryError::NotFound);
        }
        for session in guard.values_mut() {
            session.active = session.id == *id;
        }
        guard.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    fn remove_session(&self, id: &SessionId) -> Result<(), RepositoryError> {
        self.sessions
            .lock()
            .expect("sessions mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl AttendanceRepository for InMemoryRollcallStore {
    fn insert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("records mutex poisoned");
        let key = (record.person_id.clone(), record.date);
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn upsert_record(&self, record: AttendanceRecord) -> Result<(), RepositoryError> {
        let key = (record.person_id.clone(), record.date);
        self.records
            .lock()
            .expect("records mutex poisoned")
            .insert(key, record);
        Ok(())
    }

    fn fetch_record(
        &self,
        person: &PersonId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard.get(&(person.clone(), date)).cloned())
    }

    fn remove_record(&self, person: &PersonId, date: NaiveDate) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .remove(&(person.clone(), date))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.date == date)
            .cloned()
            .collect())
    }

    fn records_for_person(
        &self,
        person: &PersonId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.person_id == *person)
            .cloned()
            .collect())
    }

    fn records_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.date >= start && record.date <= end)
            .cloned()
            .collect())
    }

    fn session_referenced(&self, session: &SessionId) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("records mutex poisoned");
        Ok(guard.values().any(|record| record.session_id == *session))
    }
}

/// Gateway that logs outbound traffic instead of hitting a messaging
/// platform. Stands in until a platform client is wired up; the readiness
/// flag models the platform session lifecycle.
pub(crate) struct LoggingGateway {
    ready: AtomicBool,
}

impl Default for LoggingGateway {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl MessagingGateway for LoggingGateway {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send(&self, address: &str, content: &MessageContent) -> Result<(), DeliveryError> {
        match content {
            MessageContent::Text(body) => {
                info!(%address, chars = body.len(), "outbound text message");
            }
            MessageContent::Image { bytes, .. } => {
                info!(%address, bytes = bytes.len(), "outbound image message");
            }
        }
        Ok(())
    }
}

/// Fans administrative events out to every connected event-stream client.
/// Send errors mean no subscriber is listening, which is fine.
pub(crate) struct BroadcastEventSink {
    tx: broadcast::Sender<AdminEvent>,
}

impl BroadcastEventSink {
    pub(crate) fn new(tx: broadcast::Sender<AdminEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: AdminEvent) {
        let _ = self.tx.send(event);
    }
}

/// Composes the scannable identity token as an SVG carrying the person id as
/// its payload. The scan endpoint resolves that id straight back to the
/// person, so no decode step exists server-side.
#[derive(Default)]
pub(crate) struct SvgTokenIssuer;

impl TokenIssuer for SvgTokenIssuer {
    fn issue(&self, person: &Person) -> Result<TokenImage, TokenError> {
        let payload = &person.id.0;
        if payload.is_empty() {
            return Err(TokenError::Composition(
                "person id must not be empty".to_string(),
            ));
        }
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"320\" height=\"120\">\
<rect width=\"320\" height=\"120\" fill=\"white\" stroke=\"black\"/>\
<text x=\"160\" y=\"64\" font-family=\"monospace\" font-size=\"14\" text-anchor=\"middle\">{payload}</text>\
</svg>"
        );
        Ok(TokenImage {
            bytes: svg.into_bytes(),
            mime: "image/svg+xml",
        })
    }
}

/// Keeps photo bytes in process memory, keyed by person.
#[derive(Default)]
pub(crate) struct InMemoryMediaStore {
    photos: Mutex<HashMap<PersonId, Vec<u8>>>,
}

impl MediaStore for InMemoryMediaStore {
    fn store_photo(&self, person: &PersonId, bytes: &[u8]) -> Result<PhotoRef, MediaStoreError> {
        self.photos
            .lock()
            .map_err(|_| MediaStoreError::Unavailable("media mutex poisoned".to_string()))?
            .insert(person.clone(), bytes.to_vec());
        Ok(PhotoRef(format!("memory://photos/{}", person.0)))
    }
}
