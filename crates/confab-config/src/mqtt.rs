/// MQTT broker settings for the fan-out publisher.
///
/// Fan-out is best effort and can be switched off entirely with
/// `MQTT_ENABLED=false`; the server then runs persist-only.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl MqttConfig {
    pub(crate) fn from_env() -> Self {
        MqttConfig {
            enabled: std::env::var("MQTT_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            host: std::env::var("MQTT_BROKER").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("MQTT_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1883),
            client_id: std::env::var("MQTT_CLIENT_ID")
                .unwrap_or_else(|_| "confab-server".to_string()),
            username: std::env::var("MQTT_USERNAME").ok(),
            password: std::env::var("MQTT_PASSWORD").ok(),
            keep_alive_secs: std::env::var("MQTT_KEEP_ALIVE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_when_env_absent() {
        for key in [
            "MQTT_ENABLED",
            "MQTT_BROKER",
            "MQTT_PORT",
            "MQTT_CLIENT_ID",
            "MQTT_USERNAME",
            "MQTT_PASSWORD",
            "MQTT_KEEP_ALIVE_SECS",
        ] {
            std::env::remove_var(key);
        }

        let config = MqttConfig::from_env();
        assert!(config.enabled);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.client_id, "confab-server");
        assert_eq!(config.username, None);
        assert_eq!(config.password, None);
        assert_eq!(config.keep_alive_secs, 60);
    }

    #[test]
    #[serial]
    fn test_disabled_via_env() {
        std::env::set_var("MQTT_ENABLED", "false");
        assert!(!MqttConfig::from_env().enabled);
        std::env::remove_var("MQTT_ENABLED");
    }
}
