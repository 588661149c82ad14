//! Shared in-memory fixtures for module tests: a store with the atomic
//! transition semantics the repository traits demand, a recording gateway
//! with failure injection, and inert collaborator implementations.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::attendance::domain::{
    AttendanceRecord, Person, PersonId, PhotoRef, PhotoRequestState, Session, SessionId,
};
use crate::attendance::repository::{
    AttendanceRepository, RepositoryError, RosterRepository, SessionRepository,
};
use crate::config::PacingConfig;
use crate::events::{AdminEvent, EventSink};
use crate::media::{MediaStore, MediaStoreError};
use crate::messaging::{DeliveryError, MessageContent, MessagingGateway, OutboundDispatcher};
use crate::tokens::{TokenError, TokenImage, TokenIssuer};

#[derive(Default)]
struct StoreState {
    people: BTreeMap<PersonId, Person>,
    sessions: BTreeMap<SessionId, Session>,
    records: BTreeMap<(PersonId, NaiveDate), AttendanceRecord>,
}

/// In-memory store; one mutex doubles as the "single transactional
/// statement" the activation and photo-state transitions rely on.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    fn locked(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("store mutex poisoned")
    }

    pub(crate) fn photo_state(&self, id: &PersonId) -> Option<PhotoRequestState> {
        self.locked()
            .people
            .get(id)
            .map(|person| person.photo_request_state)
    }

    pub(crate) fn record_count(&self) -> usize {
        self.locked().records.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.locked()
            .sessions
            .values()
            .filter(|session| session.active)
            .count()
    }
}

impl RosterRepository for MemoryStore {
    fn insert_person(&self, person: Person) -> Result<Person, RepositoryError> {
        let mut state = self.locked();
        if state.people.contains_key(&person.id) {
            return Err(RepositoryError::Conflict);
        }
        state.people.insert(person.id.clone(), person.clone());
        Ok(person)
    }

    fn update_person(&self, person: Person) -> Result<(), RepositoryError> {
        let mut state = self.locked();
        if !state.people.contains_key(&person.id) {
            return Err(RepositoryError::NotFound);
        }
        state.people.insert(person.id.clone(), person);
        Ok(())
    }

    fn remove_person(&self, id: &PersonId) -> Result<(), RepositoryError> {
        self.locked()
            .people
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch_person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(self.locked().people.get(id).cloned())
    }

    fn list_people(&self) -> Result<Vec<Person>, RepositoryError> {
        Ok(self.locked().people.values().cloned().collect())
    }

    fn contacts(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .locked()
            .people
            .values()
            .filter_map(|person| person.contact().map(str::to_string))
            .collect())
    }

    fn find_pending_by_contact(&self, contact: &str) -> Result<Option<Person>, RepositoryError> {
        Ok(self
            .locked()
            .people
            .values()
            .find(|person| {
                person.photo_request_state == PhotoRequestState::Pending
                    && person.contact() == Some(contact)
            })
            .cloned())
    }

    fn photo_request_candidates(&self) -> Result<Vec<Person>, RepositoryError> {
        Ok(self
            .locked()
            .people
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
        let mut state = self.locked();
        let person = state.people.get_mut(id).ok_or(RepositoryError::NotFound)?;
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
        let mut state = self.locked();
        let person = state.people.get_mut(id).ok_or(RepositoryError::NotFound)?;
        person.photo_request_state = new_state;
        Ok(())
    }

    fn complete_photo_request(
        &self,
        id: &PersonId,
        photo: Option<PhotoRef>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.locked();
        let person = state.people.get_mut(id).ok_or(RepositoryError::NotFound)?;
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

impl SessionRepository for MemoryStore {
    fn insert_session(&self, session: Session) -> Result<Session, RepositoryError> {
        let mut state = self.locked();
        if state.sessions.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError> {
        Ok(self.locked().sessions.values().cloned().collect())
    }

    fn fetch_session(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        Ok(self.locked().sessions.get(id).cloned())
    }

    fn active_session(&self) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .locked()
            .sessions
            .values()
            .find(|session| session.active)
            .cloned())
    }

    fn activate_session(&self, id: &SessionId) -> Result<Session, RepositoryError> {
        let mut state = self.locked();
        if !state.sessions.contains_key(id) {
            return Err(RepositoryError::NotFound);
        }
        for session in state.sessions.values_mut() {
            session.active = session.id == *id;
        }
        state
            .sessions
            .get(id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    fn remove_session(&self, id: &SessionId) -> Result<(), RepositoryError> {
        self.locked()
            .sessions
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl AttendanceRepository for MemoryStore {
    fn insert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError> {
        let mut state = self.locked();
        let key = (record.person_id.clone(), record.date);
        if state.records.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        state.records.insert(key, record.clone());
        Ok(record)
    }

    fn upsert_record(&self, record: AttendanceRecord) -> Result<(), RepositoryError> {
        let key = (record.person_id.clone(), record.date);
        self.locked().records.insert(key, record);
        Ok(())
    }

    fn fetch_record(
        &self,
        person: &PersonId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        Ok(self
            .locked()
            .records
            .get(&(person.clone(), date))
            .cloned())
    }

    fn remove_record(&self, person: &PersonId, date: NaiveDate) -> Result<(), RepositoryError> {
        self.locked()
            .records
            .remove(&(person.clone(), date))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(self
            .locked()
            .records
            .values()
            .filter(|record| record.date == date)
            .cloned()
            .collect())
    }

    fn records_for_person(
        &self,
        person: &PersonId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        Ok(self
            .locked()
            .records
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
        Ok(self
            .locked()
            .records
            .values()
            .filter(|record| record.date >= start && record.date <= end)
            .cloned()
            .collect())
    }

    fn session_referenced(&self, session: &SessionId) -> Result<bool, RepositoryError> {
        Ok(self
            .locked()
            .records
            .values()
            .any(|record| record.session_id == *session))
    }
}

/// Gateway that records outbound traffic and can fail per-address.
pub(crate) struct MemoryGateway {
    ready: AtomicBool,
    failing: Mutex<HashSet<String>>,
    sent: Mutex<Vec<(String, MessageContent)>>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(true),
            failing: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryGateway {
    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub(crate) fn fail_address(&self, address: &str) {
        self.failing
            .lock()
            .expect("failing mutex poisoned")
            .insert(address.to_string());
    }

    pub(crate) fn sent(&self) -> Vec<(String, MessageContent)> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }

    pub(crate) fn texts_to(&self, address: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == address)
            .filter_map(|(_, content)| match content {
                MessageContent::Text(body) => Some(body),
                MessageContent::Image { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessagingGateway for MemoryGateway {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send(&self, address: &str, content: &MessageContent) -> Result<(), DeliveryError> {
        if self
            .failing
            .lock()
            .expect("failing mutex poisoned")
            .contains(address)
        {
            return Err(DeliveryError::Upstream("injected failure".to_string()));
        }
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push((address.to_string(), content.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct CollectingEvents {
    events: Mutex<Vec<AdminEvent>>,
}

impl CollectingEvents {
    pub(crate) fn events(&self) -> Vec<AdminEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }
}

impl EventSink for CollectingEvents {
    fn publish(&self, event: AdminEvent) {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(event);
    }
}

#[derive(Default)]
pub(crate) struct MemoryMedia;

impl MediaStore for MemoryMedia {
    fn store_photo(&self, person: &PersonId, _bytes: &[u8]) -> Result<PhotoRef, MediaStoreError> {
        Ok(PhotoRef(format!("{}.jpg", person.0)))
    }
}

#[derive(Default)]
pub(crate) struct StaticTokens;

impl TokenIssuer for StaticTokens {
    fn issue(&self, person: &Person) -> Result<TokenImage, TokenError> {
        Ok(TokenImage {
            bytes: format!("token:{}", person.id.0).into_bytes(),
            mime: "image/png",
        })
    }
}

pub(crate) fn person(id: &str, name: &str, contact: Option<&str>) -> Person {
    Person::new(
        PersonId(id.to_string()),
        name,
        contact.map(str::to_string),
    )
}

pub(crate) fn session(id: &str, name: &str, late_threshold: &str, active: bool) -> Session {
    Session {
        id: SessionId(id.to_string()),
        name: name.to_string(),
        late_threshold: parse_time(late_threshold),
        active,
    }
}

pub(crate) fn parse_time(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").expect("valid test time")
}

pub(crate) fn parse_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
}

pub(crate) fn dispatcher(gateway: &Arc<MemoryGateway>) -> Arc<OutboundDispatcher> {
    Arc::new(OutboundDispatcher::new(
        Arc::clone(gateway) as Arc<dyn MessagingGateway>,
        PacingConfig::immediate(),
    ))
}
