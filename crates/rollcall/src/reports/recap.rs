use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::ReportError;
use crate::attendance::domain::PersonId;
use crate::attendance::repository::{AttendanceRepository, RosterRepository};

/// Per-person row of the monthly grid: one abbreviation cell per calendar
/// day ('-' when nothing is recorded) plus summary totals.
#[derive(Debug, Clone, Serialize)]
pub struct RecapRow {
    pub name: String,
    pub days: Vec<String>,
    pub total_present: u32,
    pub total_sick: u32,
    pub total_excused: u32,
    pub total_absent: u32,
    pub total_late: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyRecap {
    pub year: i32,
    pub month: u32,
    pub headers: Vec<String>,
    pub rows: Vec<RecapRow>,
}

impl MonthlyRecap {
    /// Renders the grid as CSV, one header row then one row per person.
    pub fn to_csv(&self) -> Result<String, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(self.headers.len());
            record.push(row.name.clone());
            record.extend(row.days.iter().cloned());
            record.push(row.total_present.to_string());
            record.push(row.total_sick.to_string());
            record.push(row.total_excused.to_string());
            record.push(row.total_absent.to_string());
            record.push(row.total_late.to_string());
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| ReportError::Csv(err.into_error().into()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub(super) fn build<S>(store: &S, year: i32, month: u32) -> Result<MonthlyRecap, ReportError>
where
    S: RosterRepository + AttendanceRepository,
{
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(ReportError::InvalidMonth)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(ReportError::InvalidMonth)?;
    let last = next_month.pred_opt().ok_or(ReportError::InvalidMonth)?;
    let num_days = last.day();

    let mut people = store.list_people()?;
    people.sort_by(|a, b| a.name.cmp(&b.name));

    let mut by_person_day: HashMap<(PersonId, u32), char> = HashMap::new();
    for record in store.records_between(first, last)? {
        by_person_day.insert(
            (record.person_id.clone(), record.date.day()),
            record.status.abbreviation(),
        );
    }

    let mut headers = vec!["Name".to_string()];
    headers.extend((1..=num_days).map(|day| day.to_string()));
    headers.extend(
        [
            "Total Present",
            "Total Sick",
            "Total Excused",
            "Total Absent",
            "Total Late",
        ]
        .map(String::from),
    );

    let rows = people
        .into_iter()
        .map(|person| {
            let mut days = Vec::with_capacity(num_days as usize);
            let mut total_present = 0;
            let mut total_sick = 0;
            let mut total_excused = 0;
            let mut total_late = 0;
            for day in 1..=num_days {
                match by_person_day.get(&(person.id.clone(), day)) {
                    Some(&abbrev) => {
                        match abbrev {
                            'H' => total_present += 1,
                            'T' => {
                                total_present += 1;
                                total_late += 1;
                            }
                            'S' => total_sick += 1,
                            'I' => total_excused += 1,
                            _ => {}
                        }
                        days.push(abbrev.to_string());
                    }
                    None => days.push("-".to_string()),
                }
            }
            // Days with nothing on file count as unexcused absences.
            let total_absent = num_days - (total_present + total_sick + total_excused);
            RecapRow {
                name: person.name,
                days,
                total_present,
                total_sick,
                total_excused,
                total_absent,
                total_late,
            }
        })
        .collect();

    Ok(MonthlyRecap {
        year,
        month,
        headers,
        rows,
    })
}
