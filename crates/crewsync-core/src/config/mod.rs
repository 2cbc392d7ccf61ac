//! Runtime configuration.
//!
//! Tunables live in a JSON file (every section optional and defaulted);
//! secrets are read from the environment only, see [`Credentials`].

mod credentials;
mod field_mapping;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::is_http_url;

pub use credentials::Credentials;
pub use field_mapping::{FieldMapping, MappedRecord};

const MAX_ATTEMPTS_LIMIT: u32 = 20;

/// Application configuration loaded from `config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub inactivity: InactivitySettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub field_mapping: FieldMapping,
}

/// Sync queue tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// Seconds between periodic queue passes
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    /// Delivery attempts before an item is moved to the failed log
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// URL probed before each pass; unset means always online
    #[serde(default)]
    pub reachability_url: Option<String>,
    #[serde(default)]
    pub crm: CrmSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            max_attempts: default_max_attempts(),
            reachability_url: None,
            crm: CrmSettings::default(),
        }
    }
}

/// Remote CRM endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case", deny_unknown_fields)]
pub enum CrmSettings {
    Salesforce {
        instance_url: String,
        #[serde(default = "default_salesforce_api_version")]
        api_version: String,
        #[serde(default = "default_survey_object")]
        survey_object: String,
        #[serde(default = "default_appointment_object")]
        appointment_object: String,
    },
    Zapier {
        webhook_url: String,
    },
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self::Salesforce {
            instance_url: "https://login.salesforce.com".to_string(),
            api_version: default_salesforce_api_version(),
            survey_object: default_survey_object(),
            appointment_object: default_appointment_object(),
        }
    }
}

impl CrmSettings {
    pub const fn provider(&self) -> &'static str {
        match self {
            Self::Salesforce { .. } => "salesforce",
            Self::Zapier { .. } => "zapier",
        }
    }
}

/// Inactivity detection and escalation tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InactivitySettings {
    #[serde(default = "default_threshold_minutes")]
    pub threshold_minutes: i64,
    #[serde(default = "default_push_threshold_minutes")]
    pub push_threshold_minutes: i64,
    #[serde(default = "default_sms_threshold_minutes")]
    pub sms_threshold_minutes: i64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Append an `auto_logged` entry when a worker is first flagged
    #[serde(default = "default_true")]
    pub auto_log: bool,
}

impl Default for InactivitySettings {
    fn default() -> Self {
        Self {
            threshold_minutes: default_threshold_minutes(),
            push_threshold_minutes: default_push_threshold_minutes(),
            sms_threshold_minutes: default_sms_threshold_minutes(),
            check_interval_secs: default_check_interval_secs(),
            auto_log: true,
        }
    }
}

/// Push and SMS gateway endpoints (credentials come from the environment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    #[serde(default = "default_expo_push_url")]
    pub expo_push_url: String,
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    #[serde(default)]
    pub twilio_from_number: Option<String>,
    #[serde(default = "default_twilio_base_url")]
    pub twilio_base_url: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            expo_push_url: default_expo_push_url(),
            twilio_account_sid: None,
            twilio_from_number: None,
            twilio_base_url: default_twilio_base_url(),
        }
    }
}

const fn default_sync_interval_secs() -> u64 {
    300
}

const fn default_max_attempts() -> u32 {
    3
}

fn default_salesforce_api_version() -> String {
    "59.0".to_string()
}

fn default_survey_object() -> String {
    "Lead".to_string()
}

fn default_appointment_object() -> String {
    "Event".to_string()
}

const fn default_threshold_minutes() -> i64 {
    15
}

const fn default_push_threshold_minutes() -> i64 {
    15
}

const fn default_sms_threshold_minutes() -> i64 {
    30
}

const fn default_check_interval_secs() -> u64 {
    60
}

const fn default_true() -> bool {
    true
}

fn default_expo_push_url() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

fn default_twilio_base_url() -> String {
    "https://api.twilio.com".to_string()
}

impl AppConfig {
    /// Load and validate a config file; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.sync.validate()?;
        self.inactivity.validate()?;
        self.notifications.validate()?;
        self.field_mapping.validate()
    }
}

impl SyncSettings {
    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Config("sync.interval_secs must be positive".to_string()));
        }
        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.max_attempts) {
            return Err(Error::Config(format!(
                "sync.max_attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}"
            )));
        }
        if let Some(url) = &self.reachability_url {
            require_http_url(url, "sync.reachability_url")?;
        }

        match &self.crm {
            CrmSettings::Salesforce {
                instance_url,
                api_version,
                survey_object,
                appointment_object,
            } => {
                require_http_url(instance_url, "sync.crm.instance_url")?;
                for (value, field) in [
                    (api_version, "api_version"),
                    (survey_object, "survey_object"),
                    (appointment_object, "appointment_object"),
                ] {
                    if value.trim().is_empty() {
                        return Err(Error::Config(format!("sync.crm.{field} must not be empty")));
                    }
                }
                Ok(())
            }
            CrmSettings::Zapier { webhook_url } => {
                require_http_url(webhook_url, "sync.crm.webhook_url")
            }
        }
    }
}

impl InactivitySettings {
    fn validate(&self) -> Result<()> {
        if self.threshold_minutes <= 0 || self.push_threshold_minutes <= 0 {
            return Err(Error::Config(
                "inactivity thresholds must be positive".to_string(),
            ));
        }
        if self.sms_threshold_minutes < self.push_threshold_minutes {
            return Err(Error::Config(
                "inactivity.sms_threshold_minutes must not be below push_threshold_minutes"
                    .to_string(),
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(Error::Config(
                "inactivity.check_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl NotificationSettings {
    fn validate(&self) -> Result<()> {
        require_http_url(&self.expo_push_url, "notifications.expo_push_url")?;
        require_http_url(&self.twilio_base_url, "notifications.twilio_base_url")
    }
}

fn require_http_url(value: &str, field: &str) -> Result<()> {
    if is_http_url(value.trim()) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{field} must start with http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.sync.max_attempts, 3);
        assert_eq!(config.inactivity.push_threshold_minutes, 15);
        assert_eq!(config.inactivity.sms_threshold_minutes, 30);
        assert!(config.inactivity.auto_log);
    }

    #[test]
    fn parses_zapier_provider() {
        let config = AppConfig::from_json(
            r#"{"sync": {"crm": {"provider": "zapier", "webhook_url": "https://hooks.zapier.com/hooks/catch/1/abc"}}}"#,
        )
        .unwrap();
        assert_eq!(config.sync.crm.provider(), "zapier");
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = AppConfig::from_json(r#"{"sync": {"interval": 5}}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn rejects_out_of_range_attempts() {
        let error = AppConfig::from_json(r#"{"sync": {"max_attempts": 0}}"#).unwrap_err();
        assert!(error.to_string().contains("max_attempts"));
    }

    #[test]
    fn rejects_sms_threshold_below_push() {
        let error = AppConfig::from_json(
            r#"{"inactivity": {"push_threshold_minutes": 20, "sms_threshold_minutes": 10}}"#,
        )
        .unwrap_err();
        assert!(error.to_string().contains("sms_threshold_minutes"));
    }

    #[test]
    fn rejects_non_http_webhook() {
        let error = AppConfig::from_json(
            r#"{"sync": {"crm": {"provider": "zapier", "webhook_url": "hooks.zapier.com"}}}"#,
        )
        .unwrap_err();
        assert!(error.to_string().contains("webhook_url"));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.inactivity.auto_log = false;
        config.sync.reachability_url = Some("https://example.com/health".to_string());
        config.save_to_path(&path).unwrap();

        assert_eq!(AppConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
