//! Configuration management for `MorningBot`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::{MorningBotError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure, built once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorningBotConfig {
    /// Language tag used for labels, units and the forecast descriptions
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub contacts: ContactsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,
    /// Base URL of the OpenWeatherMap data API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// OpenWeatherMap city id
    #[serde(default = "default_location_code")]
    pub location_code: String,
}

/// Settings shared by every outgoing HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Currency basket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// ISO 4217 code looked up in the CBR feed
    #[serde(default = "default_currency_code")]
    pub code: String,
    /// Amount of `code` converted to rubles
    #[serde(default = "default_currency_amount")]
    pub amount: u32,
    /// CBR daily feed endpoint
    #[serde(default = "default_currency_feed_url")]
    pub feed_url: String,
}

/// Microsoft 365 calendar settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Azure app registration client id
    pub client_id: Option<String>,
    /// Client secret, only for confidential app registrations
    pub client_secret: Option<String>,
    /// Identity platform root; the tenant is appended to it
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    /// Directory tenant used in the identity endpoints
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Redirect URL registered for the app
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    /// Microsoft Graph API root
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    /// Where the OAuth token is stored between runs
    pub token_path: Option<PathBuf>,
}

/// Contacts provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsConfig {
    #[serde(default)]
    pub client_id: String,
}

/// Where the finished briefing goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    Telegram,
    Email,
}

/// Delivery channel settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub sink: SinkKind,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

/// SMTP settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_language() -> String {
    "ru".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_location_code() -> String {
    // Saint Petersburg, RU
    "498817".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_currency_code() -> String {
    "EUR".to_string()
}

fn default_currency_amount() -> u32 {
    1
}

fn default_currency_feed_url() -> String {
    "http://www.cbr.ru/scripts/XML_daily.asp".to_string()
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_tenant() -> String {
    "common".to_string()
}

fn default_redirect_url() -> String {
    "https://login.microsoftonline.com/common/oauth2/nativeclient".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            location_code: default_location_code(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: default_currency_code(),
            amount: default_currency_amount(),
            feed_url: default_currency_feed_url(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authority_url: default_authority_url(),
            tenant: default_tenant(),
            redirect_url: default_redirect_url(),
            graph_base_url: default_graph_base_url(),
            token_path: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api_base(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MorningBotConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            http: HttpConfig::default(),
            weather: WeatherConfig::default(),
            currency: CurrencyConfig::default(),
            calendar: CalendarConfig::default(),
            contacts: ContactsConfig::default(),
            delivery: DeliveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MorningBotConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// Layers, lowest first: built-in defaults, the TOML file,
    /// `MORNINGBOT_*` variables (`__` between sections), legacy `TMB_*` variables.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with(config_path, |name| std::env::var(name).ok())
    }

    /// Same as [`Self::load_from_path`] with the legacy variables read through `legacy_lookup`
    pub fn load_with<F>(config_path: Option<PathBuf>, legacy_lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        match config_path {
            Some(path) => {
                builder = builder.add_source(
                    File::from(path)
                        .required(true)
                        .format(config::FileFormat::Toml),
                );
            }
            None => {
                if let Some(path) = Self::get_config_path().filter(|p| p.exists()) {
                    builder = builder.add_source(
                        File::from(path)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("MORNINGBOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: MorningBotConfig = builder.build()?.try_deserialize()?;

        config.apply_legacy_env(legacy_lookup)?;
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("morningbot").join("config.toml"))
    }

    /// Apply the flat variables of older deployments through `lookup`:
    /// `TMB_O365_CLIENT_ID`, `TMB_CURRENCY`, `TMB_CURRENCY_AMOUNT`,
    /// `TMB_OPEN_WEATHER_MAP_API_KEY`, `TMB_OPENWEATHER_CITY_CODE`, `TMB_LANG`
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(client_id) = lookup("TMB_O365_CLIENT_ID") {
            self.calendar.client_id = Some(client_id);
        }
        if let Some(code) = lookup("TMB_CURRENCY") {
            self.currency.code = code;
        }
        if let Some(amount) = lookup("TMB_CURRENCY_AMOUNT") {
            self.currency.amount = amount.trim().parse().map_err(|_| {
                MorningBotError::config(format!(
                    "TMB_CURRENCY_AMOUNT must be a non-negative integer, got '{amount}'"
                ))
            })?;
        }
        if let Some(api_key) = lookup("TMB_OPEN_WEATHER_MAP_API_KEY") {
            self.weather.api_key = Some(api_key);
        }
        if let Some(code) = lookup("TMB_OPENWEATHER_CITY_CODE") {
            self.weather.location_code = code;
        }
        if let Some(lang) = lookup("TMB_LANG") {
            self.language = lang;
        }
        Ok(())
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.language.is_empty() {
            self.language = default_language();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.location_code.is_empty() {
            self.weather.location_code = default_location_code();
        }
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_timeout();
        }
        if self.currency.code.is_empty() {
            self.currency.code = default_currency_code();
        }
        if self.currency.feed_url.is_empty() {
            self.currency.feed_url = default_currency_feed_url();
        }
        if self.calendar.authority_url.is_empty() {
            self.calendar.authority_url = default_authority_url();
        }
        if self.calendar.tenant.is_empty() {
            self.calendar.tenant = default_tenant();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_delivery()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(MorningBotError::config(
                "Request timeout cannot exceed 300 seconds",
            ));
        }
        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(MorningBotError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(MorningBotError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        let code = &self.currency.code;
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(MorningBotError::config(format!(
                "Currency code '{code}' must be three uppercase letters, e.g. EUR"
            )));
        }

        for (name, url) in [
            ("weather.base_url", &self.weather.base_url),
            ("currency.feed_url", &self.currency.feed_url),
            ("calendar.authority_url", &self.calendar.authority_url),
            ("calendar.graph_base_url", &self.calendar.graph_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(MorningBotError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                )));
            }
        }

        Ok(())
    }

    fn validate_delivery(&self) -> Result<()> {
        match self.delivery.sink {
            SinkKind::Console => Ok(()),
            SinkKind::Telegram => {
                let telegram = &self.delivery.telegram;
                if is_blank(&telegram.bot_token) || is_blank(&telegram.chat_id) {
                    return Err(MorningBotError::config(
                        "Telegram delivery needs delivery.telegram.bot_token and delivery.telegram.chat_id",
                    ));
                }
                Ok(())
            }
            SinkKind::Email => {
                let email = &self.delivery.email;
                if is_blank(&email.smtp_host) || is_blank(&email.from) || is_blank(&email.to) {
                    return Err(MorningBotError::config(
                        "E-mail delivery needs delivery.email.smtp_host, delivery.email.from and delivery.email.to",
                    ));
                }
                Ok(())
            }
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl WeatherConfig {
    /// The API key, or a configuration error naming both ways to set it
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                MorningBotError::config(
                    "weather.api_key is not set (TMB_OPEN_WEATHER_MAP_API_KEY)",
                )
            })
    }
}

impl CalendarConfig {
    /// The app registration id, or a configuration error
    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                MorningBotError::config("calendar.client_id is not set (TMB_O365_CLIENT_ID)")
            })
    }

    /// Token store location, defaulting under the user config directory
    pub fn token_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.token_path {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("morningbot").join("o365_token.json"))
            .ok_or_else(|| MorningBotError::config("Unable to determine config directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MorningBotConfig::default();
        assert_eq!(config.language, "ru");
        assert_eq!(config.weather.location_code, "498817");
        assert_eq!(config.currency.code, "EUR");
        assert_eq!(config.currency.amount, 1);
        assert_eq!(config.delivery.sink, SinkKind::Console);
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_overrides() {
        let mut config = MorningBotConfig::default();
        config
            .apply_legacy_env(lookup_from(&[
                ("TMB_O365_CLIENT_ID", "client-123"),
                ("TMB_CURRENCY", "USD"),
                ("TMB_CURRENCY_AMOUNT", "250"),
                ("TMB_OPEN_WEATHER_MAP_API_KEY", "owm-key"),
                ("TMB_OPENWEATHER_CITY_CODE", "524901"),
                ("TMB_LANG", "en"),
            ]))
            .unwrap();

        assert_eq!(config.calendar.client_id.as_deref(), Some("client-123"));
        assert_eq!(config.currency.code, "USD");
        assert_eq!(config.currency.amount, 250);
        assert_eq!(config.weather.api_key.as_deref(), Some("owm-key"));
        assert_eq!(config.weather.location_code, "524901");
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_legacy_amount_must_be_integer() {
        let mut config = MorningBotConfig::default();
        let result = config.apply_legacy_env(lookup_from(&[("TMB_CURRENCY_AMOUNT", "1.5")]));
        assert!(matches!(result, Err(MorningBotError::Config { .. })));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = MorningBotConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_currency_code() {
        let mut config = MorningBotConfig::default();
        config.currency.code = "usd".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timeout() {
        let mut config = MorningBotConfig::default();
        config.http.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_telegram_sink_requires_token_and_chat() {
        let mut config = MorningBotConfig::default();
        config.delivery.sink = SinkKind::Telegram;
        config.delivery.telegram.bot_token = Some("123:abc".to_string());
        assert!(config.validate().is_err());

        config.delivery.telegram.chat_id = Some("42".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_values() {
        let mut config = MorningBotConfig::default();
        assert!(config.weather.require_api_key().is_err());
        assert!(config.calendar.require_client_id().is_err());

        config.weather.api_key = Some("owm-key".to_string());
        config.calendar.client_id = Some("  ".to_string());
        assert_eq!(config.weather.require_api_key().unwrap(), "owm-key");
        assert!(config.calendar.require_client_id().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_empty_values() {
        let mut config = MorningBotConfig::default();
        config.language = String::new();
        config.http.timeout_seconds = 0;
        config.apply_defaults();
        assert_eq!(config.language, "ru");
        assert_eq!(config.http.timeout_seconds, 30);
    }

    #[test]
    fn test_parse_toml_sections() {
        let toml_str = r#"
language = "en"

[weather]
api_key = "owm-key"
location_code = "2643743"

[currency]
code = "USD"
amount = 100

[delivery]
sink = "telegram"

[delivery.telegram]
bot_token = "123:abc"
chat_id = "42"
"#;
        let config: MorningBotConfig = Config::builder()
            .add_source(File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.language, "en");
        assert_eq!(config.weather.location_code, "2643743");
        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(config.currency.amount, 100);
        assert_eq!(config.delivery.sink, SinkKind::Telegram);
        assert_eq!(config.calendar.tenant, "common");
        assert!(config.validate().is_ok());
    }

    fn write_temp_config(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("morningbot-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_from_file() {
        let path = write_temp_config(
            "load.toml",
            r#"
language = "en"

[http]
timeout_seconds = 10

[weather]
api_key = "owm-key"
location_code = "2643743"

[currency]
code = "USD"
amount = 5
"#,
        );

        let config = MorningBotConfig::load_with(Some(path), |_| None).unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.http.timeout_seconds, 10);
        assert_eq!(config.weather.api_key.as_deref(), Some("owm-key"));
        assert_eq!(config.weather.location_code, "2643743");
        assert_eq!(config.currency.code, "USD");
        assert_eq!(config.currency.amount, 5);
        assert_eq!(config.calendar.authority_url, "https://login.microsoftonline.com");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_legacy_env_overrides_file() {
        let path = write_temp_config(
            "legacy.toml",
            r#"
language = "en"

[currency]
code = "USD"
amount = 5
"#,
        );

        let config = MorningBotConfig::load_with(
            Some(path),
            lookup_from(&[("TMB_CURRENCY", "GBP"), ("TMB_LANG", "ru")]),
        )
        .unwrap();
        assert_eq!(config.currency.code, "GBP");
        assert_eq!(config.currency.amount, 5);
        assert_eq!(config.language, "ru");
    }

    #[test]
    fn test_loaded_file_is_validated() {
        let path = write_temp_config("invalid.toml", "[http]\ntimeout_seconds = 900\n");
        let err = MorningBotConfig::load_with(Some(path), |_| None).unwrap_err();
        assert!(matches!(err, MorningBotError::Config { .. }));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let path = std::env::temp_dir().join("morningbot-definitely-missing.toml");
        assert!(MorningBotConfig::load_with(Some(path), |_| None).is_err());
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = MorningBotConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("morningbot"));
            assert!(path.ends_with("config.toml"));
        }
    }
}
