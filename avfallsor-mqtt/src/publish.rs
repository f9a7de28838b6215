//! Home Assistant MQTT discovery and state publishing.

use std::collections::BTreeMap;

use log::info;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, QoS};
use serde::Serialize;
use tokio::time::sleep;

use avfallsor_core::model::ResolvedPickup;

use crate::config::MqttSettings;

/// Root of the state topics, independent of the discovery prefix.
const STATE_TOPIC_ROOT: &str = "avfallsor/sensor";
/// State payload format understood by the `date` device class.
const DATE_FORMAT: &str = "%Y-%m-%d";
/// Request queue capacity for the MQTT client.
const CLIENT_CAPACITY: usize = 16;

#[derive(thiserror::Error, Debug)]
/// Errors raised while talking to the MQTT broker.
pub enum PublishError {
    /// The broker connection failed or was rejected.
    #[error("MQTT connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    /// The client could not enqueue a message.
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    /// The discovery payload could not be encoded.
    #[error("Failed to encode discovery payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Home Assistant MQTT discovery payload for one sensor.
#[derive(Debug, Serialize)]
struct DiscoveryPayload {
    name: String,
    unique_id: String,
    state_topic: String,
    icon: String,
    device_class: String,
    value_template: String,
    device: DeviceInfo,
}

/// Device block grouping all fraction sensors under one device.
#[derive(Debug, Serialize)]
struct DeviceInfo {
    identifiers: Vec<String>,
    name: String,
    manufacturer: String,
    model: String,
}

impl DeviceInfo {
    fn avfallsor() -> Self {
        Self {
            identifiers: vec![String::from("avfallsor")],
            name: String::from("Avfall Sør"),
            manufacturer: String::from("Avfall Sør"),
            model: String::from("Waste Collection Calendar"),
        }
    }
}

/// Both retained messages announcing one fraction sensor.
#[derive(Debug)]
struct SensorAnnouncement {
    fraction: String,
    date: String,
    discovery_topic: String,
    discovery_payload: String,
    state_topic: String,
}

fn announcements(
    discovery_prefix: &str,
    pickups: &BTreeMap<String, ResolvedPickup>,
) -> Result<Vec<SensorAnnouncement>, serde_json::Error> {
    pickups
        .values()
        .map(|pickup| {
            let sensor_id = format!("avfallsor_{}", pickup.fraction);
            let state_topic = format!("{STATE_TOPIC_ROOT}/{sensor_id}/state");

            let payload = DiscoveryPayload {
                name: format!("Avfall Sør {}", capitalize(&pickup.fraction)),
                unique_id: sensor_id.clone(),
                state_topic: state_topic.clone(),
                icon: String::from("mdi:trash-can"),
                device_class: String::from("date"),
                value_template: String::from("{{ value }}"),
                device: DeviceInfo::avfallsor(),
            };

            Ok(SensorAnnouncement {
                fraction: pickup.fraction.clone(),
                date: pickup.date.format(DATE_FORMAT).to_string(),
                discovery_topic: format!("{discovery_prefix}/sensor/{sensor_id}/config"),
                discovery_payload: serde_json::to_string(&payload)?,
                state_topic,
            })
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Publish discovery and state messages for every resolved pickup.
///
/// Messages go out sequentially, discovery before state per fraction, with
/// the configured delay after each publish. All messages are retained and
/// sent at most once. A broker failure aborts the remaining publishes;
/// already-published sensors stay as they are.
///
/// # Errors
///
/// Returns a [`PublishError`] when the connection fails or a message cannot
/// be enqueued or encoded.
pub async fn publish(
    settings: &MqttSettings,
    pickups: &BTreeMap<String, ResolvedPickup>,
) -> Result<(), PublishError> {
    let announcements = announcements(&settings.discovery_prefix, pickups)?;

    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    if let Some((username, password)) = &settings.credentials {
        options.set_credentials(username, password);
    }

    let (client, mut eventloop) = AsyncClient::new(options, CLIENT_CAPACITY);
    let delay = settings.publish_delay;

    // Publishes are enqueued from this task while the loop below keeps the
    // network connection pumping. The disconnect at the end shuts the loop
    // down again.
    let sender = tokio::spawn(async move {
        for announcement in announcements {
            client
                .publish(
                    announcement.discovery_topic,
                    QoS::AtMostOnce,
                    true,
                    announcement.discovery_payload,
                )
                .await?;
            sleep(delay).await;

            client
                .publish(
                    announcement.state_topic,
                    QoS::AtMostOnce,
                    true,
                    announcement.date.clone(),
                )
                .await?;
            sleep(delay).await;

            info!(
                "Published {} collection date: {}",
                announcement.fraction, announcement.date
            );
        }
        client.disconnect().await
    });

    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                sender.abort();
                return Err(err.into());
            }
        }
    }

    if let Ok(result) = sender.await {
        result?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use serde_json::Value;

    use avfallsor_core::model::ResolvedPickup;

    use super::{announcements, capitalize};

    fn pickups() -> BTreeMap<String, ResolvedPickup> {
        let mut map = BTreeMap::new();
        map.insert(
            "papp".to_owned(),
            ResolvedPickup {
                fraction: "papp".to_owned(),
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                source_label: "Tirsdag 2. januar".to_owned(),
            },
        );
        map.insert(
            "restavfall".to_owned(),
            ResolvedPickup {
                fraction: "restavfall".to_owned(),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                source_label: "Mandag 1. januar".to_owned(),
            },
        );
        map
    }

    #[test]
    fn topics_follow_the_sensor_id_scheme() {
        let messages = announcements("homeassistant", &pickups()).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].discovery_topic,
            "homeassistant/sensor/avfallsor_papp/config"
        );
        assert_eq!(
            messages[0].state_topic,
            "avfallsor/sensor/avfallsor_papp/state"
        );
    }

    #[test]
    fn state_payload_is_the_iso_date() {
        let messages = announcements("homeassistant", &pickups()).unwrap();
        assert_eq!(messages[0].date, "2025-01-02");
        assert_eq!(messages[1].date, "2025-01-01");
    }

    #[test]
    fn discovery_payload_describes_the_sensor() {
        let messages = announcements("homeassistant", &pickups()).unwrap();
        let payload: Value = serde_json::from_str(&messages[1].discovery_payload).unwrap();

        assert_eq!(payload["name"], "Avfall Sør Restavfall");
        assert_eq!(payload["unique_id"], "avfallsor_restavfall");
        assert_eq!(
            payload["state_topic"],
            "avfallsor/sensor/avfallsor_restavfall/state"
        );
        assert_eq!(payload["icon"], "mdi:trash-can");
        assert_eq!(payload["device_class"], "date");
        assert_eq!(payload["value_template"], "{{ value }}");
        assert_eq!(payload["device"]["identifiers"][0], "avfallsor");
        assert_eq!(payload["device"]["name"], "Avfall Sør");
        assert_eq!(payload["device"]["manufacturer"], "Avfall Sør");
        assert_eq!(payload["device"]["model"], "Waste Collection Calendar");
    }

    #[test]
    fn custom_discovery_prefix_is_honored() {
        let messages = announcements("ha", &pickups()).unwrap();
        assert_eq!(
            messages[0].discovery_topic,
            "ha/sensor/avfallsor_papp/config"
        );
        // State topics do not move with the discovery prefix.
        assert_eq!(
            messages[0].state_topic,
            "avfallsor/sensor/avfallsor_papp/state"
        );
    }

    #[test]
    fn capitalize_uppercases_the_first_letter_only() {
        assert_eq!(capitalize("restavfall"), "Restavfall");
        assert_eq!(capitalize("papp"), "Papp");
        assert_eq!(capitalize(""), "");
    }
}
