//! Backend for Avfall Sør: address lookup via the wp-json endpoint and
//! pickup-calendar scraping from the public calendar pages.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use log::{info, warn};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use avfallsor_core::{
    model::{AddressQuery, CalendarUrl, WasteCalendar},
    ports::{AddressPort, CalendarPort, PortError},
    service::PickupService,
};

const LOOKUP_URL: &str = "https://avfallsor.no/wp-json/addresses/v1/address";
const FRACTION_CLASS_PREFIX: &str = "waste-icon--";

/// Date headings in the calendar markup.
static DATE_HEADING: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".wp-block-site-pickup-calendar__date").expect("heading selector is valid")
});

/// Fraction icons inside a heading's sibling container.
static FRACTION_ICON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[class*='waste-icon--']").expect("icon selector is valid")
});

/// Some calendar pages close an `<h3>` heading with `</h1>`.
static BROKEN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h3([^>]*)>(.*?)</h1>").expect("heading pattern is valid"));

/// Matched address record from the lookup endpoint.
#[derive(Debug, Deserialize)]
struct AddressRecord {
    href: Option<String>,
}

/// Address lookup implementation against the Avfall Sør wp-json endpoint.
pub struct AvfallsorAddressPort {
    client: Client,
}

impl AvfallsorAddressPort {
    /// Create a new address port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AddressPort for AvfallsorAddressPort {
    async fn locate(&self, query: &AddressQuery) -> Result<CalendarUrl, PortError> {
        if query.is_empty() {
            return Err(PortError::AddressNotFound(query.0.clone()));
        }

        info!("Looking up address: {query}");

        let matches: BTreeMap<String, AddressRecord> = self
            .client
            .get(LOOKUP_URL)
            .query(&[("lookup_term", query.0.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let href = pick_calendar_link(&query.0, matches)?;
        info!("Found calendar page: {href}");
        Ok(CalendarUrl(href))
    }
}

/// Pick the calendar link from the lookup response.
///
/// The endpoint normally returns exactly one match. When it returns more,
/// the lexicographically smallest address key wins, so repeated runs stay
/// deterministic regardless of response order.
fn pick_calendar_link(
    query: &str,
    matches: BTreeMap<String, AddressRecord>,
) -> Result<String, PortError> {
    if matches.len() > 1 {
        warn!(
            "Lookup returned {} matches for {query:?}; using the alphabetically first",
            matches.len()
        );
    }

    let (_address, record) = matches
        .into_iter()
        .next()
        .ok_or_else(|| PortError::AddressNotFound(query.to_owned()))?;

    record
        .href
        .filter(|href| !href.is_empty())
        .ok_or_else(|| PortError::MissingCalendarLink(query.to_owned()))
}

/// Calendar scraping implementation for the Avfall Sør pickup pages.
pub struct AvfallsorCalendarPort {
    client: Client,
}

impl AvfallsorCalendarPort {
    /// Create a new calendar port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CalendarPort for AvfallsorCalendarPort {
    async fn extract(&self, url: &CalendarUrl) -> Result<WasteCalendar, PortError> {
        info!("Fetching waste calendar from: {url}");

        let html = self
            .client
            .get(&url.0)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let calendar = parse_calendar(&html);
        info!("Found {} dates with waste collection", calendar.len());
        Ok(calendar)
    }
}

/// Rewrite `<h3 …>…</h1>` sequences to close with `</h3>`.
///
/// The upstream markup is invalid in exactly this way; without the repair the
/// structural parser swallows the headings and extraction comes up empty.
fn repair_markup(html: &str) -> Cow<'_, str> {
    BROKEN_HEADING.replace_all(html, "<h3${1}>${2}</h3>")
}

/// Extract the pickup calendar from the page markup.
///
/// Every date heading contributes its trimmed text as the label and the
/// fraction slugs found in its next sibling element. Headings without any
/// fraction icon are dropped.
#[must_use]
pub fn parse_calendar(html: &str) -> WasteCalendar {
    let repaired = repair_markup(html);
    let document = Html::parse_document(&repaired);

    let mut calendar = WasteCalendar::new();
    for heading in document.select(&DATE_HEADING) {
        let label = heading.text().collect::<String>().trim().to_owned();

        let Some(container) = next_sibling_element(heading) else {
            continue;
        };

        let fractions: Vec<String> = container
            .select(&FRACTION_ICON)
            .flat_map(|icon| {
                icon.value()
                    .classes()
                    .filter_map(|class| class.strip_prefix(FRACTION_CLASS_PREFIX))
                    .map(str::to_owned)
                    .collect::<Vec<String>>()
            })
            .collect();

        if fractions.is_empty() {
            continue;
        }
        calendar.insert(label, fractions);
    }

    calendar
}

/// The next sibling that is an element, skipping text and comment nodes.
fn next_sibling_element(node: ElementRef<'_>) -> Option<ElementRef<'_>> {
    node.next_siblings().find_map(ElementRef::wrap)
}

/// Bundle both ports over a shared HTTP client into a ready-to-use service.
#[must_use]
pub fn service(client: Client) -> PickupService {
    let address_port = Arc::new(AvfallsorAddressPort::new(client.clone()));
    let calendar_port = Arc::new(AvfallsorCalendarPort::new(client));
    PickupService::new(address_port, calendar_port)
}
