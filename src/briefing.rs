//! Briefing assembly
//!
//! A briefing is an ordered list of [`Section`]s. Each section pairs a
//! display label with a [`Provider`] that already carries its arguments;
//! [`assemble`] runs them one after another and concatenates
//! `label\nbody\n\n`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::calendar::{FirstMeeting, GraphCalendar, MeetingSource, OAuthTokenProvider, StdinPrompt};
use crate::config::MorningBotConfig;
use crate::contacts::Birthdays;
use crate::currency::{CbrClient, CurrencyExchange, CurrencyFeed};
use crate::i18n::{self, keys};
use crate::weather::{ForecastCache, ForecastSource, OpenWeatherMapClient, SunHours, TimeAndPlace, Weather};
use crate::Result;

/// Produces the body text of one section
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<String>;
}

pub struct Section {
    pub label: String,
    pub provider: Box<dyn Provider>,
}

impl Section {
    pub fn new(label: impl Into<String>, provider: impl Provider + 'static) -> Self {
        Self {
            label: label.into(),
            provider: Box::new(provider),
        }
    }
}

/// Run every section in order. The first failing provider aborts the
/// whole briefing and later providers are not called.
#[instrument(skip_all, fields(sections = sections.len()))]
pub async fn assemble(sections: &[Section]) -> Result<String> {
    let mut message = String::new();
    for section in sections {
        info!("Fetching section {}", section.provider.name());
        let body = section.provider.fetch().await?;
        message.push_str(&section.label);
        message.push('\n');
        message.push_str(&body);
        message.push_str("\n\n");
    }
    Ok(message)
}

/// Per-run values every provider is built with
#[derive(Debug, Clone)]
pub struct BriefingContext {
    pub today: NaiveDate,
    pub lang: String,
}

impl BriefingContext {
    pub fn new(today: NaiveDate, lang: impl Into<String>) -> Self {
        Self {
            today,
            lang: lang.into(),
        }
    }
}

/// External data the standard briefing reads from
#[derive(Clone)]
pub struct Sources {
    pub forecasts: Arc<dyn ForecastSource>,
    pub currency: Arc<dyn CurrencyFeed>,
    pub meetings: Arc<dyn MeetingSource>,
}

impl Sources {
    /// Real network clients. Fails on missing credentials before any
    /// request is made.
    pub fn connect(config: &MorningBotConfig) -> Result<Self> {
        let timeout = config.http.timeout_seconds;

        let weather = OpenWeatherMapClient::new(&config.weather, &config.language, timeout)?;
        let currency = CbrClient::new(&config.currency, timeout)?;
        let tokens = OAuthTokenProvider::new(&config.calendar, Box::new(StdinPrompt))?;
        let calendar = GraphCalendar::new(&config.calendar, Arc::new(tokens), timeout)?;

        Ok(Self {
            forecasts: Arc::new(ForecastCache::new(weather)),
            currency: Arc::new(currency),
            meetings: Arc::new(calendar),
        })
    }
}

/// Sections of the standard morning briefing, in delivery order
pub fn standard_sections(
    config: &MorningBotConfig,
    context: &BriefingContext,
    sources: &Sources,
) -> Vec<Section> {
    let lang = context.lang.as_str();
    let location = config.weather.location_code.as_str();
    let label = |key: &str| i18n::get(key, lang).to_string();

    vec![
        Section::new(
            "",
            TimeAndPlace::new(Arc::clone(&sources.forecasts), location, context.today),
        ),
        Section::new(
            label(keys::DAY_LENGTH),
            SunHours::new(Arc::clone(&sources.forecasts), location),
        ),
        Section::new(
            label(keys::FIRST_MEETING),
            FirstMeeting::new(Arc::clone(&sources.meetings), context.today, lang),
        ),
        Section::new(
            label(keys::CURRENCY_BASKET),
            CurrencyExchange::new(
                Arc::clone(&sources.currency),
                config.currency.code.as_str(),
                config.currency.amount,
                context.today,
            ),
        ),
        Section::new(
            label(keys::BIRTHDAYS),
            Birthdays::new(config.contacts.client_id.as_str(), lang),
        ),
        Section::new(
            label(keys::WEATHER),
            Weather::new(Arc::clone(&sources.forecasts), location, context.today, lang),
        ),
    ]
}

/// Assemble the standard briefing from `sources`
pub async fn compose(
    config: &MorningBotConfig,
    context: &BriefingContext,
    sources: &Sources,
) -> Result<String> {
    assemble(&standard_sections(config, context, sources)).await
}
