//! High-level service facade running the lookup → extract → resolve pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::model::{AddressQuery, CalendarUrl, ResolvedPickup, WasteCalendar};
use crate::ports::{AddressPort, CalendarPort, PortError};
use crate::resolve::resolve_next;

/// Public entry point combining the address lookup and calendar backends.
pub struct PickupService {
    address_port: Arc<dyn AddressPort>,
    calendar_port: Arc<dyn CalendarPort>,
}

impl PickupService {
    /// Create a new service bound to the provided ports.
    #[must_use]
    pub fn new(address_port: Arc<dyn AddressPort>, calendar_port: Arc<dyn CalendarPort>) -> Self {
        Self {
            address_port,
            calendar_port,
        }
    }

    /// Resolve the calendar page for an address.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the lookup fails or matches nothing.
    pub async fn locate(&self, query: &AddressQuery) -> Result<CalendarUrl, PortError> {
        self.address_port.locate(query).await
    }

    /// Fetch and extract the pickup calendar behind a calendar page.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the page cannot be fetched.
    pub async fn calendar(&self, url: &CalendarUrl) -> Result<WasteCalendar, PortError> {
        self.calendar_port.extract(url).await
    }

    /// Run the full pipeline: locate the address, extract its calendar, and
    /// reduce it to the nearest upcoming pickup per fraction.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] from either backend; date-label problems never
    /// surface here, they are skipped during resolution.
    pub async fn next_pickups(
        &self,
        query: &AddressQuery,
        now: NaiveDateTime,
    ) -> Result<BTreeMap<String, ResolvedPickup>, PortError> {
        let url = self.locate(query).await?;
        let calendar = self.calendar(&url).await?;
        Ok(resolve_next(&calendar, now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    use super::PickupService;
    use crate::model::{AddressQuery, CalendarUrl, WasteCalendar};
    use crate::ports::{AddressPort, CalendarPort, PortError};

    struct FixedAddressPort {
        url: String,
    }

    #[async_trait]
    impl AddressPort for FixedAddressPort {
        async fn locate(&self, _query: &AddressQuery) -> Result<CalendarUrl, PortError> {
            Ok(CalendarUrl(self.url.clone()))
        }
    }

    struct FixedCalendarPort {
        calendar: WasteCalendar,
    }

    #[async_trait]
    impl CalendarPort for FixedCalendarPort {
        async fn extract(&self, _url: &CalendarUrl) -> Result<WasteCalendar, PortError> {
            Ok(self.calendar.clone())
        }
    }

    #[tokio::test]
    async fn pipeline_runs_lookup_extraction_and_resolution() {
        let calendar: WasteCalendar = [(
            "Mandag 1. januar".to_owned(),
            vec!["restavfall".to_owned()],
        )]
        .into_iter()
        .collect();

        let service = PickupService::new(
            Arc::new(FixedAddressPort {
                url: "https://avfallsor.no/henteplan/x".to_owned(),
            }),
            Arc::new(FixedCalendarPort { calendar }),
        );

        let now =
            NaiveDateTime::parse_from_str("2024-12-20 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let next = service
            .next_pickups(&AddressQuery("Testveien 1".to_owned()), now)
            .await
            .unwrap();

        assert_eq!(next.len(), 1);
        assert_eq!(next["restavfall"].date.to_string(), "2025-01-01");
    }

    #[tokio::test]
    async fn empty_calendar_yields_empty_result_not_an_error() {
        let service = PickupService::new(
            Arc::new(FixedAddressPort {
                url: "https://avfallsor.no/henteplan/x".to_owned(),
            }),
            Arc::new(FixedCalendarPort {
                calendar: WasteCalendar::new(),
            }),
        );

        let now =
            NaiveDateTime::parse_from_str("2024-12-20 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let next = service
            .next_pickups(&AddressQuery("Testveien 1".to_owned()), now)
            .await
            .unwrap();

        assert!(next.is_empty());
    }
}
