//! Attendance recording: the session registry with its single-active
//! invariant, and the recorder that classifies scans against the active
//! session's late-arrival threshold.

pub mod domain;
pub mod recorder;
pub mod repository;
pub mod router;
pub mod sessions;


pub use domain::{
    AttendanceRecord, AttendanceStatus, Person, PersonId, PhotoRef, PhotoRequestState, Session,
    SessionId,
};
pub use recorder::{AttendanceError, AttendanceRecorder, ManualOutcome, ScanOutcome};
pub use repository::{
    AttendanceRepository, RepositoryError, RosterRepository, SessionRepository,
};
pub use router::attendance_router;
pub use sessions::{SessionError, SessionRegistry};
