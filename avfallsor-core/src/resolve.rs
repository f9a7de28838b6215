//! Norwegian date-label parsing and next-pickup reduction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;
use regex::Regex;

use crate::model::{ResolvedPickup, WasteCalendar};

/// Norwegian month names in calendar order.
const MONTHS: [&str; 12] = [
    "januar",
    "februar",
    "mars",
    "april",
    "mai",
    "juni",
    "juli",
    "august",
    "september",
    "oktober",
    "november",
    "desember",
];

/// First "<day>. <month-word>" pair in a heading, e.g. "Mandag 1. januar".
static DAY_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.\s+(\w+)").expect("day/month pattern is valid"));

fn month_number(name: &str) -> Option<u32> {
    let lowered = name.to_lowercase();
    MONTHS
        .iter()
        .position(|month| *month == lowered)
        .and_then(|index| u32::try_from(index + 1).ok())
}

/// Extract the (day, month) pair from a date-label.
///
/// Month names are matched case-insensitively. Returns `None` when the label
/// carries no recognizable pair; callers skip such labels.
#[must_use]
pub fn parse_label(label: &str) -> Option<(u32, u32)> {
    let captures = DAY_MONTH.captures(label)?;
    let day = captures.get(1)?.as_str().parse().ok()?;
    let month = month_number(captures.get(2)?.as_str())?;
    Some((day, month))
}

/// Attach a year to a (day, month) pair relative to `now`.
///
/// The source labels carry no year, so the year of `now` is assumed; a month
/// strictly before the current one rolls into next year. A date in the
/// current month whose day has already passed is deliberately not rolled
/// over; it gets filtered out later instead. Known limitation of the
/// heuristic.
fn candidate_date(day: u32, month: u32, now: NaiveDateTime) -> Option<NaiveDate> {
    let mut year = now.year();
    if month < now.month() {
        year += 1;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Reduce a calendar to the nearest upcoming pickup per fraction.
///
/// Labels without a parsable date and impossible dates (such as 31. februar)
/// are logged and skipped. Only dates at or after `now` are considered; the
/// comparison anchors each candidate at midnight, so today's pickup drops out
/// once any time of day has elapsed. Per fraction the earliest date wins,
/// with ties going to the entry seen first.
#[must_use]
pub fn resolve_next(
    calendar: &WasteCalendar,
    now: NaiveDateTime,
) -> BTreeMap<String, ResolvedPickup> {
    let mut next: BTreeMap<String, ResolvedPickup> = BTreeMap::new();

    for entry in calendar.entries() {
        let Some((day, month)) = parse_label(&entry.label) else {
            warn!("Skipping heading without a recognizable date: {:?}", entry.label);
            continue;
        };

        let Some(date) = candidate_date(day, month, now) else {
            warn!("Invalid date: {:?}", entry.label);
            continue;
        };

        if date.and_time(NaiveTime::MIN) < now {
            continue;
        }

        for fraction in &entry.fractions {
            let is_earlier = next
                .get(fraction)
                .is_none_or(|existing| date < existing.date);
            if is_earlier {
                next.insert(
                    fraction.clone(),
                    ResolvedPickup {
                        fraction: fraction.clone(),
                        date,
                        source_label: entry.label.clone(),
                    },
                );
            }
        }
    }

    next
}
