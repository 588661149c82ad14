use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::ReportError;
use crate::attendance::domain::PersonId;
use crate::attendance::repository::{AttendanceRepository, RosterRepository};

const RANKING_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPeriod {
    /// The trailing seven days, inclusive of today.
    Weekly,
    /// The current calendar month.
    Monthly,
    AllTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    pub person_id: PersonId,
    pub name: String,
    pub score: u32,
}

pub(super) fn build<S>(
    store: &S,
    period: RankingPeriod,
    today: NaiveDate,
) -> Result<Vec<RankingEntry>, ReportError>
where
    S: RosterRepository + AttendanceRepository,
{
    let people = store.list_people()?;
    let names: HashMap<&PersonId, &str> = people
        .iter()
        .map(|person| (&person.id, person.name.as_str()))
        .collect();

    let mut scores: HashMap<PersonId, u32> = HashMap::new();
    for record in store.records_between(NaiveDate::MIN, today)? {
        if !in_period(record.date, period, today) {
            continue;
        }
        *scores.entry(record.person_id.clone()).or_default() +=
            record.status.ranking_points();
    }

    let mut entries: Vec<RankingEntry> = scores
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .filter_map(|(person_id, score)| {
            names.get(&person_id).map(|name| RankingEntry {
                name: (*name).to_string(),
                person_id,
                score,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(RANKING_LIMIT);
    Ok(entries)
}

fn in_period(date: NaiveDate, period: RankingPeriod, today: NaiveDate) -> bool {
    match period {
        RankingPeriod::Weekly => date >= today - Duration::days(6) && date <= today,
        RankingPeriod::Monthly => date.year() == today.year() && date.month() == today.month(),
        RankingPeriod::AllTime => true,
    }
}
