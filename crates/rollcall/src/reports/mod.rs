//! Read-only reporting over the roster and attendance facts: daily
//! overview, dashboard summary, monthly recap grid (with CSV export), and
//! punctuality rankings.

pub mod rankings;
pub mod recap;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::attendance::domain::{AttendanceStatus, PersonId};
use crate::attendance::repository::{AttendanceRepository, RepositoryError, RosterRepository};

pub use rankings::{RankingEntry, RankingPeriod};
pub use recap::MonthlyRecap;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("not a valid calendar month")]
    InvalidMonth,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// One roster row in the daily overview; absent people carry no status.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStatusView {
    pub person_id: PersonId,
    pub name: String,
    pub status: Option<AttendanceStatus>,
    pub scan_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_people: usize,
    pub recorded_today: usize,
    pub unrecorded_today: usize,
    /// Records whose status counts toward presence.
    pub present_today: usize,
    /// Count per status label.
    pub breakdown: BTreeMap<&'static str, usize>,
}

/// Builds report views from the store. Purely read-only.
pub struct ReportBuilder<S> {
    store: Arc<S>,
}

impl<S> ReportBuilder<S>
where
    S: RosterRepository + AttendanceRepository,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Roster left-joined with the records for `date`, ordered by name.
    pub fn daily_overview(&self, date: NaiveDate) -> Result<Vec<DailyStatusView>, ReportError> {
        let mut people = self.store.list_people()?;
        people.sort_by(|a, b| a.name.cmp(&b.name));
        let records: BTreeMap<PersonId, _> = self
            .store
            .records_for_date(date)?
            .into_iter()
            .map(|record| (record.person_id.clone(), record))
            .collect();

        Ok(people
            .into_iter()
            .map(|person| {
                let record = records.get(&person.id);
                DailyStatusView {
                    status: record.map(|record| record.status),
                    scan_time: record.and_then(|record| record.scan_time),
                    person_id: person.id,
                    name: person.name,
                }
            })
            .collect())
    }

    /// Headline counts for the dashboard.
    pub fn dashboard_summary(&self, date: NaiveDate) -> Result<DashboardSummary, ReportError> {
        let total_people = self.store.list_people()?.len();
        let records = self.store.records_for_date(date)?;
        let mut breakdown: BTreeMap<&'static str, usize> = BTreeMap::new();
        for record in &records {
            *breakdown.entry(record.status.label()).or_default() += 1;
        }
        let present_today = records
            .iter()
            .filter(|record| record.status.counts_as_present())
            .count();
        Ok(DashboardSummary {
            total_people,
            recorded_today: records.len(),
            unrecorded_today: total_people.saturating_sub(records.len()),
            present_today,
            breakdown,
        })
    }

    /// Day-by-day abbreviation grid for one calendar month.
    pub fn monthly_recap(&self, year: i32, month: u32) -> Result<MonthlyRecap, ReportError> {
        recap::build(self.store.as_ref(), year, month)
    }

    /// Top punctuality scores for the requested period, as of `today`.
    pub fn rankings(
        &self,
        period: RankingPeriod,
        today: NaiveDate,
    ) -> Result<Vec<RankingEntry>, ReportError> {
        rankings::build(self.store.as_ref(), period, today)
    }
}
