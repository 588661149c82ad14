use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Durable, opaque person identifier. Doubles as the identity-token payload:
/// the scanner reads it off the token and posts it back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub String);

/// Reference to a stored profile photo (a media-store key, not the bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef(pub String);

/// Per-person photo-provisioning state. `Pending` means a request message is
/// outstanding and exactly one qualifying reply will resolve it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhotoRequestState {
    #[default]
    Idle,
    Pending,
    Completed,
}

/// Roster member. The photo-request state field is mutated only through the
/// conditional repository transitions; attendance recording never touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub contact: Option<String>,
    pub photo: Option<PhotoRef>,
    pub photo_request_state: PhotoRequestState,
}

impl Person {
    pub fn new(id: PersonId, name: impl Into<String>, contact: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            contact,
            photo: None,
            photo_request_state: PhotoRequestState::Idle,
        }
    }

    /// The contact address, if present and non-blank.
    pub fn contact(&self) -> Option<&str> {
        self.contact
            .as_deref()
            .map(str::trim)
            .filter(|contact| !contact.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A time-boxed attendance session. At most one session is active at any
/// instant; the active one accepts scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    /// Time-of-day boundary separating `OnTime` from `Late` (inclusive).
    pub late_threshold: NaiveTime,
    pub active: bool,
}

/// Closed attendance status enumeration with an exhaustive mapping to
/// localized labels, report abbreviations, and notification content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    OnTime,
    Late,
    ManualPresent,
    Sick,
    Excused,
    UnexcusedAbsent,
}

impl AttendanceStatus {
    /// Label shown to people in notifications and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::OnTime => "Tepat Waktu",
            Self::Late => "Terlambat",
            Self::ManualPresent => "Hadir (Manual)",
            Self::Sick => "Sakit",
            Self::Excused => "Izin",
            Self::UnexcusedAbsent => "Alfa",
        }
    }

    /// Single-letter abbreviation used by the monthly recap grid.
    pub fn abbreviation(self) -> char {
        match self {
            Self::OnTime | Self::ManualPresent => 'H',
            Self::Late => 'T',
            Self::Sick => 'S',
            Self::Excused => 'I',
            Self::UnexcusedAbsent => 'A',
        }
    }

    /// Whether the status counts toward presence totals.
    pub fn counts_as_present(self) -> bool {
        matches!(self, Self::OnTime | Self::Late | Self::ManualPresent)
    }

    /// Ranking points: punctual scans are worth double.
    pub fn ranking_points(self) -> u32 {
        match self {
            Self::OnTime => 2,
            Self::Late | Self::ManualPresent => 1,
            Self::Sick | Self::Excused | Self::UnexcusedAbsent => 0,
        }
    }
}

/// One attendance fact, keyed by (person, calendar date). Scan-originated
/// inserts reject on conflict; manual entries upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub person_id: PersonId,
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub scan_time: Option<NaiveTime>,
    pub status: AttendanceStatus,
}
