//! Domain data structures for addresses, waste calendars, and resolved pickups.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Free-text address to resolve against the lookup service.
pub struct AddressQuery(pub String);

impl AddressQuery {
    /// Check whether the query contains anything to look up.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AddressQuery {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Location of the pickup-calendar page for a resolved address.
pub struct CalendarUrl(pub String);

impl fmt::Display for CalendarUrl {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One calendar heading with the waste fractions collected on that day.
pub struct CalendarEntry {
    /// Raw heading text, e.g. "Mandag 1. januar". Not yet a calendar date.
    pub label: String,
    /// Fraction slugs in document order. Duplicates are kept as found.
    pub fractions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Insertion-ordered collection of calendar entries keyed by heading text.
///
/// Re-inserting a label replaces its fractions in place without moving the
/// entry, matching the dictionary semantics of the calendar source.
pub struct WasteCalendar {
    entries: Vec<CalendarEntry>,
}

impl WasteCalendar {
    /// Create an empty calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, overwriting the fractions of an existing label.
    pub fn insert(&mut self, label: String, fractions: Vec<String>) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|entry| entry.label == label)
        {
            existing.fractions = fractions;
        } else {
            self.entries.push(CalendarEntry { label, fractions });
        }
    }

    /// Iterate over entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &CalendarEntry> {
        self.entries.iter()
    }

    /// Number of retained headings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the calendar holds no headings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for WasteCalendar {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut calendar = Self::new();
        for (label, fractions) in iter {
            calendar.insert(label, fractions);
        }
        calendar
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Nearest upcoming pickup for a single waste fraction.
pub struct ResolvedPickup {
    /// Fraction slug, e.g. "restavfall".
    pub fraction: String,
    /// Resolved collection date.
    pub date: NaiveDate,
    /// Heading the date was parsed from.
    pub source_label: String,
}
