//! Traits describing the lookup and calendar backends plus shared error types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{AddressQuery, CalendarUrl, WasteCalendar};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the Avfall Sør backends.
pub enum PortError {
    /// Network layer failed or the server answered with an error status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The lookup service returned no match for the address.
    #[error("No address found for: {0}")]
    AddressNotFound(String),
    /// A matched address record did not carry a calendar link.
    #[error("No calendar link found for address: {0}")]
    MissingCalendarLink(String),
}

#[async_trait]
/// Trait for resolving a free-text address to its pickup-calendar page.
pub trait AddressPort: Send + Sync {
    /// Look up the calendar page for the given address.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails, nothing matches, or
    /// the match carries no calendar link.
    async fn locate(&self, query: &AddressQuery) -> Result<CalendarUrl, PortError>;
}

#[async_trait]
/// Trait for fetching and extracting a pickup calendar.
pub trait CalendarPort: Send + Sync {
    /// Fetch the calendar page and extract its pickup entries.
    ///
    /// An empty [`WasteCalendar`] is a valid result; it means the page lists
    /// no upcoming pickups, not that the request failed.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the page cannot be fetched.
    async fn extract(&self, url: &CalendarUrl) -> Result<WasteCalendar, PortError>;
}
