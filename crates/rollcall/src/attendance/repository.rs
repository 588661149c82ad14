use chrono::NaiveDate;

use super::domain::{
    AttendanceRecord, Person, PersonId, PhotoRef, PhotoRequestState, Session, SessionId,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Roster access plus the conditional photo-state transitions. The two
/// check-then-set operations (`claim_photo_request`,
/// `complete_photo_request`) must be atomic inside the store so concurrent
/// requests for the same person serialize correctly.
pub trait RosterRepository: Send + Sync {
    fn insert_person(&self, person: Person) -> Result<Person, RepositoryError>;
    fn update_person(&self, person: Person) -> Result<(), RepositoryError>;
    fn remove_person(&self, id: &PersonId) -> Result<(), RepositoryError>;
    fn fetch_person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError>;
    fn list_people(&self) -> Result<Vec<Person>, RepositoryError>;

    /// Every non-blank contact address on the roster, for broadcasts.
    fn contacts(&self) -> Result<Vec<String>, RepositoryError>;

    /// The person in `Pending` state registered under `contact`, if any.
    fn find_pending_by_contact(&self, contact: &str) -> Result<Option<Person>, RepositoryError>;

    /// People eligible for a bulk photo request: no stored photo, not
    /// `Pending`, and a non-blank contact address.
    fn photo_request_candidates(&self) -> Result<Vec<Person>, RepositoryError>;

    /// Atomically transitions `Idle`/`Completed` to `Pending` and returns the
    /// claimed person. Fails `Conflict` when already `Pending`, `NotFound`
    /// for an unknown id.
    fn claim_photo_request(&self, id: &PersonId) -> Result<Person, RepositoryError>;

    /// Unconditionally writes `state` (dispatch rollback and the admin
    /// reset escape hatch).
    fn set_photo_state(
        &self,
        id: &PersonId,
        state: PhotoRequestState,
    ) -> Result<(), RepositoryError>;

    /// Atomically transitions `Pending` to `Completed`, persisting `photo`
    /// when provided. Returns `false` (no write) when the person was not
    /// `Pending`.
    fn complete_photo_request(
        &self,
        id: &PersonId,
        photo: Option<PhotoRef>,
    ) -> Result<bool, RepositoryError>;
}

/// Session storage. `activate_session` must replace the active-session
/// pointer as a single atomic operation; a deactivate-all-then-activate-one
/// sequence of independent store calls would leave a window with zero active
/// sessions and break the singleton invariant under concurrent activations.
pub trait SessionRepository: Send + Sync {
    fn insert_session(&self, session: Session) -> Result<Session, RepositoryError>;
    fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError>;
    fn fetch_session(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError>;
    fn active_session(&self) -> Result<Option<Session>, RepositoryError>;
    fn activate_session(&self, id: &SessionId) -> Result<Session, RepositoryError>;
    fn remove_session(&self, id: &SessionId) -> Result<(), RepositoryError>;
}

/// Attendance fact storage keyed by (person, date).
pub trait AttendanceRepository: Send + Sync {
    /// Scan-originated insert; fails `Conflict` when a record for the key
    /// already exists.
    fn insert_record(&self, record: AttendanceRecord) -> Result<AttendanceRecord, RepositoryError>;
    /// Manual entry; replaces any existing record for the key.
    fn upsert_record(&self, record: AttendanceRecord) -> Result<(), RepositoryError>;
    fn fetch_record(
        &self,
        person: &PersonId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepositoryError>;
    fn remove_record(&self, person: &PersonId, date: NaiveDate) -> Result<(), RepositoryError>;
    fn records_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    fn records_for_person(
        &self,
        person: &PersonId,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    fn records_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    /// Whether any attendance record references `session`.
    fn session_referenced(&self, session: &SessionId) -> Result<bool, RepositoryError>;
}
