use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::warn;

use super::domain::{AttendanceRecord, AttendanceStatus, PersonId};
use super::repository::{
    AttendanceRepository, RepositoryError, RosterRepository, SessionRepository,
};
use crate::events::{AdminEvent, EventSink};
use crate::messaging::{MessageContent, OutboundDispatcher};
use crate::tasks::TaskGroup;

/// Error raised by attendance recording.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("no attendance session is active")]
    NoActiveSession,
    #[error("person not found")]
    PersonNotFound,
    #[error("{name} is already recorded for {date}")]
    AlreadyRecorded { name: String, date: NaiveDate },
    #[error("no attendance record for that person and date")]
    RecordNotFound,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AttendanceError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

/// Result of a successful scan, echoed to the scanning station.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub person_name: String,
    pub status: AttendanceStatus,
    pub session_name: String,
    pub scan_time: NaiveTime,
}

/// Result of a manual status entry.
#[derive(Debug, Clone, Serialize)]
pub struct ManualOutcome {
    pub person_name: String,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
}

/// Classifies and persists check-ins against the active session. Person
/// notifications ride on the task group: best-effort, observable, and never
/// part of the caller's result.
pub struct AttendanceRecorder<S> {
    store: Arc<S>,
    dispatcher: Arc<OutboundDispatcher>,
    events: Arc<dyn EventSink>,
    tasks: TaskGroup,
}

impl<S> AttendanceRecorder<S>
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    pub fn new(
        store: Arc<S>,
        dispatcher: Arc<OutboundDispatcher>,
        events: Arc<dyn EventSink>,
        tasks: TaskGroup,
    ) -> Self {
        Self {
            store,
            dispatcher,
            events,
            tasks,
        }
    }

    /// Records a token scan at `now`. On time iff the time of day is at or
    /// before the active session's late threshold (boundary inclusive).
    pub fn scan(&self, person_id: &PersonId, now: NaiveDateTime) -> Result<ScanOutcome, AttendanceError> {
        let session = self
            .store
            .active_session()?
            .ok_or(AttendanceError::NoActiveSession)?;
        let person = self
            .store
            .fetch_person(person_id)?
            .ok_or(AttendanceError::PersonNotFound)?;

        let date = now.date();
        let time = now.time();
        if self.store.fetch_record(person_id, date)?.is_some() {
            return Err(AttendanceError::AlreadyRecorded {
                name: person.name,
                date,
            });
        }

        let status = if time <= session.late_threshold {
            AttendanceStatus::OnTime
        } else {
            AttendanceStatus::Late
        };

        let record = AttendanceRecord {
            person_id: person_id.clone(),
            session_id: session.id.clone(),
            date,
            scan_time: Some(time),
            status,
        };
        match self.store.insert_record(record) {
            Ok(_) => {}
            // A concurrent scan for the same person won the insert.
            Err(RepositoryError::Conflict) => {
                return Err(AttendanceError::AlreadyRecorded {
                    name: person.name,
                    date,
                })
            }
            Err(other) => return Err(other.into()),
        }

        if let Some(contact) = person.contact() {
            let body = scan_notification(&person.name, time, status, &session.name);
            self.notify_in_background(contact.to_string(), body);
        }
        self.events.publish(AdminEvent::success(format!(
            "{} checked in ({})",
            person.name,
            status.label()
        )));

        Ok(ScanOutcome {
            person_name: person.name,
            status,
            session_name: session.name,
            scan_time: time,
        })
    }

    /// Administrative upsert of a status for (person, date). `scan_time` is
    /// recorded only for `ManualPresent`. Statuses with no notification
    /// template (the two scan-originated ones) write the record and notify
    /// nobody; that silence is deliberate, not an error.
    pub fn manual_set(
        &self,
        person_id: &PersonId,
        status: AttendanceStatus,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<ManualOutcome, AttendanceError> {
        let session = self
            .store
            .active_session()?
            .ok_or(AttendanceError::NoActiveSession)?;
        let person = self
            .store
            .fetch_person(person_id)?
            .ok_or(AttendanceError::PersonNotFound)?;

        let scan_time = (status == AttendanceStatus::ManualPresent).then(|| now.time());
        self.store.upsert_record(AttendanceRecord {
            person_id: person_id.clone(),
            session_id: session.id,
            date,
            scan_time,
            status,
        })?;

        if let Some(contact) = person.contact() {
            if let Some(body) = manual_notification(&person.name, status, date) {
                self.notify_in_background(contact.to_string(), body);
            }
        }
        self.events.publish(AdminEvent::info(format!(
            "{} manually set to {} for {date}",
            person.name,
            status.label()
        )));

        Ok(ManualOutcome {
            person_name: person.name,
            status,
            date,
        })
    }

    /// Deletes the record for (person, date); `RecordNotFound` when absent.
    pub fn cancel(&self, person_id: &PersonId, date: NaiveDate) -> Result<(), AttendanceError> {
        match self.store.remove_record(person_id, date) {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(AttendanceError::RecordNotFound),
            Err(other) => Err(other.into()),
        }
    }

    fn notify_in_background(&self, contact: String, body: String) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let events = Arc::clone(&self.events);
        self.tasks.spawn(async move {
            if let Err(err) = dispatcher
                .send_single(&contact, &MessageContent::Text(body))
                .await
            {
                warn!(%contact, error = %err, "attendance notification not delivered");
                events.publish(AdminEvent::warning(format!(
                    "notification to {contact} failed: {err}"
                )));
            }
        });
    }
}

fn scan_notification(
    name: &str,
    time: NaiveTime,
    status: AttendanceStatus,
    session_name: &str,
) -> String {
    format!(
        "✅ Absensi berhasil!\n\nNama: *{name}*\nWaktu: {}\nStatus: *{}*\nSesi: {session_name}",
        time.format("%H:%M:%S"),
        status.label()
    )
}

/// Notification template per manual status. `OnTime`/`Late` are
/// scan-originated and intentionally map to none.
fn manual_notification(name: &str, status: AttendanceStatus, date: NaiveDate) -> Option<String> {
    let date = date.format("%d-%m-%Y");
    match status {
        AttendanceStatus::ManualPresent => Some(format!(
            "✅ Absensi Manual berhasil!\n\nNama: *{name}*\nStatus: *Hadir (Manual)*\nTanggal: {date}"
        )),
        AttendanceStatus::Sick => Some(format!(
            "ℹ️ Pemberitahuan Absensi\n\nNama: *{name}* telah dicatat *Sakit* untuk {date}. Semoga lekas sembuh."
        )),
        AttendanceStatus::Excused => Some(format!(
            "ℹ️ Pemberitahuan Absensi\n\nNama: *{name}* telah dicatat *Izin* untuk {date}."
        )),
        AttendanceStatus::UnexcusedAbsent => Some(format!(
            "⚠️ Peringatan Absensi!\n\nNama: *{name}* tercatat *ALFA* untuk {date}. Mohon konfirmasi jika ada kekeliruan."
        )),
        AttendanceStatus::OnTime | AttendanceStatus::Late => None,
    }
}
