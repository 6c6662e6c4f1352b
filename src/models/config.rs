//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP fetch behavior for the target page
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Scheduling defaults and history bounds
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Destination extraction vocabulary and heuristics
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Outbound SMS transport settings
    #[serde(default)]
    pub sms: SmsConfig,

    /// HTTP control surface settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override settings from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override settings from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(sid) = get("TWILIO_ACCOUNT_SID") {
            self.sms.account_sid = Some(sid);
        }
        if let Some(token) = get("TWILIO_AUTH_TOKEN") {
            self.sms.auth_token = Some(token);
        }
        if let Some(from) = get("TWILIO_PHONE_NUMBER") {
            self.sms.from_number = Some(from);
        }
        if let Some(to) = get("ALERT_PHONE_NUMBER") {
            self.sms.alert_number = Some(to);
        }

        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT value: {}", port),
            }
        }

        if let Some(timeout) = get("FETCH_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.fetch.timeout_secs = secs,
                Err(_) => log::warn!("Ignoring invalid FETCH_TIMEOUT_SECS value: {}", timeout),
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.monitor.default_interval_minutes == 0 {
            return Err(AppError::validation(
                "monitor.default_interval_minutes must be > 0",
            ));
        }
        if self.monitor.scan_history_capacity == 0 {
            return Err(AppError::validation(
                "monitor.scan_history_capacity must be > 0",
            ));
        }
        if self.monitor.notification_history_capacity == 0 {
            return Err(AppError::validation(
                "monitor.notification_history_capacity must be > 0",
            ));
        }
        url::Url::parse(&self.monitor.default_url)?;
        self.extraction.validate()
    }
}

/// Target page fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header presented to the target site
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Scheduling defaults and history bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// URL scanned when a request does not name one
    #[serde(default = "defaults::default_url")]
    pub default_url: String,

    /// Interval used when a request does not name one
    #[serde(default = "defaults::interval_minutes")]
    pub default_interval_minutes: u64,

    /// Maximum retained scan records
    #[serde(default = "defaults::scan_history_capacity")]
    pub scan_history_capacity: usize,

    /// Maximum retained notification records
    #[serde(default = "defaults::notification_history_capacity")]
    pub notification_history_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_url: defaults::default_url(),
            default_interval_minutes: defaults::interval_minutes(),
            scan_history_capacity: defaults::scan_history_capacity(),
            notification_history_capacity: defaults::notification_history_capacity(),
        }
    }
}

/// Destination extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Literal phrase that precedes a destination name in an offer
    #[serde(default = "defaults::trigger_phrase")]
    pub trigger_phrase: String,

    /// Characters after the trigger match searched for price and dates
    #[serde(default = "defaults::lookahead_chars")]
    pub lookahead_chars: usize,

    /// Regex for destination image assets (informational only)
    #[serde(default = "defaults::image_pattern")]
    pub image_pattern: String,

    /// Translation table, in output order
    #[serde(default = "defaults::destinations")]
    pub destinations: Vec<DestinationName>,
}

impl ExtractionConfig {
    /// Check that the vocabulary is usable and the table is a bijection.
    pub fn validate(&self) -> Result<()> {
        if self.trigger_phrase.is_empty() {
            return Err(AppError::validation("extraction.trigger_phrase is empty"));
        }
        if self.destinations.is_empty() {
            return Err(AppError::validation("No destinations defined"));
        }

        let mut local = HashSet::new();
        let mut display = HashSet::new();
        for entry in &self.destinations {
            if entry.local_name.trim().is_empty() || entry.display_name.trim().is_empty() {
                return Err(AppError::validation("Destination names must not be empty"));
            }
            if !local.insert(entry.local_name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate local destination name: {}",
                    entry.local_name
                )));
            }
            if !display.insert(entry.display_name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate display destination name: {}",
                    entry.display_name
                )));
            }
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            trigger_phrase: defaults::trigger_phrase(),
            lookahead_chars: defaults::lookahead_chars(),
            image_pattern: defaults::image_pattern(),
            destinations: defaults::destinations(),
        }
    }
}

/// One entry of the translation table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationName {
    /// Name as written on the target page
    pub local_name: String,

    /// Translated name used for identity and display
    pub display_name: String,
}

impl DestinationName {
    pub fn new(local_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            display_name: display_name.into(),
        }
    }
}

/// SMS transport credentials and numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sending number
    #[serde(default)]
    pub from_number: Option<String>,

    /// Number that receives change alerts
    #[serde(default)]
    pub alert_number: Option<String>,

    /// Transport API base URL
    #[serde(default = "defaults::sms_api_base")]
    pub api_base: String,

    /// Link appended to every alert
    #[serde(default = "defaults::details_url")]
    pub details_url: String,
}

impl SmsConfig {
    /// Credentials are present, so a transport can be built.
    pub fn has_credentials(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some()
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            alert_number: None,
            api_base: defaults::sms_api_base(),
            details_url: defaults::details_url(),
        }
    }
}

/// HTTP control surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

mod defaults {
    use super::DestinationName;

    // Fetch defaults
    pub fn user_agent() -> String {
        concat!(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
            "(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        )
        .into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.5".into()
    }
    pub fn timeout() -> u64 {
        15
    }

    // Monitor defaults
    pub fn default_url() -> String {
        "https://www.tustus.co.il/Arkia/Home".into()
    }
    pub fn interval_minutes() -> u64 {
        1
    }
    pub fn scan_history_capacity() -> usize {
        200
    }
    pub fn notification_history_capacity() -> usize {
        50
    }

    // Extraction defaults
    pub fn trigger_phrase() -> String {
        "טיסה ל".into()
    }
    pub fn lookahead_chars() -> usize {
        200
    }
    pub fn image_pattern() -> String {
        r#"res\.cloudinary\.com/arkia/image/upload/ARKIA_Destinations/[^"'>\s]+"#.into()
    }

    pub fn destinations() -> Vec<DestinationName> {
        [
            ("אילת", "Eilat"),
            ("כרתים", "Crete"),
            ("אתונה", "Athens"),
            ("רודוס", "Rhodes"),
            ("סלוניקי", "Thessaloniki"),
            ("לרנקה", "Larnaca"),
            ("בודפשט", "Budapest"),
            ("פראג", "Prague"),
            ("ברלין", "Berlin"),
            ("רומא", "Rome"),
            ("מילאנו", "Milan"),
            ("ברצלונה", "Barcelona"),
            ("מדריד", "Madrid"),
            ("לונדון", "London"),
            ("פריז", "Paris"),
            ("אמסטרדם", "Amsterdam"),
            ("ניו יורק", "New York"),
            ("לוס אנג'לס", "Los Angeles"),
            ("מיאמי", "Miami"),
            ("טורונטו", "Toronto"),
            ("קלמטה", "Kalamata"),
            ("מיקונוס", "Mykonos"),
            ("זנזיבר", "Zanzibar"),
            ("קורפו", "Corfu"),
            ("פרבזה", "Preveza"),
            ("טיראנה", "Tirana"),
            ("בטומי", "Batumi"),
            ("טביליסי", "Tbilisi"),
            ("חלקידיקי", "Halkidiki"),
            ("לפקדה", "Lefkada"),
            ("קוס", "Kos"),
            ("בודווה", "Budva"),
            ("טיווט", "Tivat"),
            ("קוטור", "Kotor"),
            ("בלגרד", "Belgrade"),
            ("סרי לנקה-קולומבו", "Colombo"),
            ("איה נאפה", "Ayia Napa"),
            ("לימסול", "Limassol"),
            ("זאדאר", "Zadar"),
            ("טרוגיר", "Trogir"),
            ("ספליט", "Split"),
        ]
        .into_iter()
        .map(|(local, display)| DestinationName::new(local, display))
        .collect()
    }

    // SMS defaults
    pub fn sms_api_base() -> String {
        "https://api.twilio.com".into()
    }
    pub fn details_url() -> String {
        "https://www.tustus.co.il/Arkia/Home".into()
    }

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        3002
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_table_has_all_destinations() {
        let config = ExtractionConfig::default();
        assert_eq!(config.destinations.len(), 41);
        assert_eq!(config.destinations[0], DestinationName::new("אילת", "Eilat"));
        assert_eq!(config.destinations[40].display_name, "Split");
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.monitor.default_interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_display_names() {
        let mut config = Config::default();
        config
            .extraction
            .destinations
            .push(DestinationName::new("אילת2", "Eilat"));
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn env_overrides_sms_and_port() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_PHONE_NUMBER", "+15550001"),
            ("ALERT_PHONE_NUMBER", ""),
            ("PORT", "8080"),
        ]);

        let mut config = Config::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.sms.account_sid.as_deref(), Some("AC123"));
        assert!(config.sms.has_credentials());
        assert_eq!(config.sms.from_number.as_deref(), Some("+15550001"));
        assert!(config.sms.alert_number.is_none());
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn env_ignores_invalid_port() {
        let mut config = Config::default();
        config.apply_env_from(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 3002);
    }

    #[test]
    fn env_timeout_override_and_invalid_value() {
        let mut config = Config::default();
        config.apply_env_from(|key| (key == "FETCH_TIMEOUT_SECS").then(|| "30".to_string()));
        assert_eq!(config.fetch.timeout_secs, 30);

        config.apply_env_from(|key| (key == "FETCH_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn load_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[monitor]\ndefault_interval_minutes = 5\n\n[fetch]\ntimeout_secs = 30"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.monitor.default_interval_minutes, 5);
        assert_eq!(config.monitor.scan_history_capacity, 200);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.extraction.trigger_phrase, "טיסה ל");
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/nonexistent/flight-monitor.toml");
        assert_eq!(config.server.port, 3002);
    }
}
