//! Environment-based configuration, built once at startup and passed around
//! by reference.

use std::env;
use std::time::Duration;

use avfallsor_core::model::AddressQuery;

/// Default MQTT port when `MQTT_PORT` is unset.
const DEFAULT_MQTT_PORT: u16 = 1883;
/// Default HTTP timeout in seconds when `HTTP_TIMEOUT_SECS` is unset.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Default pause between publishes in milliseconds when `PUBLISH_DELAY_MS` is unset.
const DEFAULT_PUBLISH_DELAY_MS: u64 = 250;

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading the environment, before any network activity.
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    /// A variable is set but cannot be parsed as a number.
    #[error("{0} must be a number, got {1:?}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
/// Connection and topic settings for the MQTT broker.
pub struct MqttSettings {
    /// Broker hostname or IP.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Username/password pair; used only when both are set.
    pub credentials: Option<(String, String)>,
    /// Client identifier announced to the broker.
    pub client_id: String,
    /// Home Assistant discovery topic prefix.
    pub discovery_prefix: String,
    /// Pause after each publish to give the broker time to process.
    pub publish_delay: Duration,
}

#[derive(Debug, Clone)]
/// Full application configuration.
pub struct Config {
    /// Address whose pickup calendar is fetched.
    pub address: AddressQuery,
    /// Broker settings for publishing.
    pub mqtt: MqttSettings,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
}

impl Config {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required variable is missing or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the configuration through an injectable variable lookup.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let address = required(&get, "ADDRESS")?;
        let host = required(&get, "MQTT_HOST")?;

        let port = numeric(&get, "MQTT_PORT", DEFAULT_MQTT_PORT)?;
        let http_timeout_secs = numeric(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let publish_delay_ms = numeric(&get, "PUBLISH_DELAY_MS", DEFAULT_PUBLISH_DELAY_MS)?;

        let credentials = match (get("MQTT_USERNAME"), get("MQTT_PASSWORD")) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        };

        Ok(Self {
            address: AddressQuery(address),
            mqtt: MqttSettings {
                host,
                port,
                credentials,
                client_id: get("MQTT_CLIENT_ID")
                    .unwrap_or_else(|| String::from("avfallsor-mqtt")),
                discovery_prefix: get("MQTT_DISCOVERY_PREFIX")
                    .unwrap_or_else(|| String::from("homeassistant")),
                publish_delay: Duration::from_millis(publish_delay_ms),
            },
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

fn required(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    get(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn numeric<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(value) => value
            .parse()
            .map_err(|_parse_err| ConfigError::Invalid(name, value)),
        None => Ok(default),
    }
}
