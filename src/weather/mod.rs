//! Weather and time-of-day sections of the briefing
//!
//! All three providers read the same forecast payload, fetched at most
//! once per location code through a [`ForecastCache`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::briefing::Provider;
use crate::i18n::{self, keys};
use crate::models::ForecastResponse;
use crate::Result;

pub mod openweathermap;

pub use openweathermap::OpenWeatherMapClient;

/// Anything that can produce the forecast for a location code
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn forecast(&self, location_code: &str) -> Result<Arc<ForecastResponse>>;
}

/// Memoizes forecasts by location code for the lifetime of one run.
///
/// No expiry and no invalidation: build a fresh cache per run.
pub struct ForecastCache {
    source: Box<dyn ForecastSource>,
    entries: Mutex<HashMap<String, Arc<ForecastResponse>>>,
}

impl ForecastCache {
    pub fn new(source: impl ForecastSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-populate an entry; later lookups for `location_code` never hit the source
    pub async fn insert(&self, location_code: &str, forecast: ForecastResponse) {
        self.entries
            .lock()
            .await
            .insert(location_code.to_string(), Arc::new(forecast));
    }

    pub async fn contains(&self, location_code: &str) -> bool {
        self.entries.lock().await.contains_key(location_code)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ForecastSource for ForecastCache {
    async fn forecast(&self, location_code: &str) -> Result<Arc<ForecastResponse>> {
        let mut entries = self.entries.lock().await;
        if let Some(hit) = entries.get(location_code) {
            debug!(location_code, "forecast cache hit");
            return Ok(Arc::clone(hit));
        }

        let fresh = self.source.forecast(location_code).await?;
        entries.insert(location_code.to_string(), Arc::clone(&fresh));
        Ok(fresh)
    }
}

/// `"<city>, <YYYY-MM-DD> (<yy>W<ww>)"` using the ISO week of `today`
#[must_use]
pub fn format_time_and_place(forecast: &ForecastResponse, today: NaiveDate) -> String {
    let week = today.iso_week();
    format!(
        "{}, {} ({:02}W{:02})",
        forecast.city.name,
        today.format("%Y-%m-%d"),
        week.year().rem_euclid(100),
        week.week()
    )
}

/// One line per sample of `today`, newline-terminated, in feed order
pub fn format_weather(forecast: &ForecastResponse, today: NaiveDate, lang: &str) -> Result<String> {
    let wind_unit = i18n::get(keys::METERS_PER_SECOND, lang);
    let pressure_unit = i18n::get(keys::HPA, lang);

    let mut res = String::new();
    for sample in forecast.samples_on(today) {
        res.push_str(&format!(
            "{}: {}/{} °C, {}, {} {}, {} {}, {}%\n",
            sample.clock_time()?,
            round_half_even(sample.main.temp),
            round_half_even(sample.main.feels_like),
            sample.description()?,
            round_half_even(sample.wind.speed),
            wind_unit,
            sample.main.pressure,
            pressure_unit,
            sample.main.humidity,
        ));
    }
    Ok(res)
}

/// `"HH:MM - HH:MM"` of sunrise and sunset in the city's own time
pub fn format_sun_hours(forecast: &ForecastResponse) -> Result<String> {
    let sunrise = forecast.city.sunrise_local()?;
    let sunset = forecast.city.sunset_local()?;
    Ok(format!(
        "{} - {}",
        sunrise.format("%H:%M"),
        sunset.format("%H:%M")
    ))
}

/// Nearest integer, ties to even
fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// City name, date and ISO week
pub struct TimeAndPlace {
    forecasts: Arc<dyn ForecastSource>,
    location_code: String,
    today: NaiveDate,
}

impl TimeAndPlace {
    pub fn new(
        forecasts: Arc<dyn ForecastSource>,
        location_code: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            forecasts,
            location_code: location_code.into(),
            today,
        }
    }
}

#[async_trait]
impl Provider for TimeAndPlace {
    fn name(&self) -> &str {
        "time_and_place"
    }

    #[instrument(name = "time_and_place", skip(self), fields(location = %self.location_code))]
    async fn fetch(&self) -> Result<String> {
        let forecast = self.forecasts.forecast(&self.location_code).await?;
        Ok(format_time_and_place(&forecast, self.today))
    }
}

/// Today's forecast samples, one per line
pub struct Weather {
    forecasts: Arc<dyn ForecastSource>,
    location_code: String,
    today: NaiveDate,
    lang: String,
}

impl Weather {
    pub fn new(
        forecasts: Arc<dyn ForecastSource>,
        location_code: impl Into<String>,
        today: NaiveDate,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            forecasts,
            location_code: location_code.into(),
            today,
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl Provider for Weather {
    fn name(&self) -> &str {
        "weather"
    }

    #[instrument(name = "weather", skip(self), fields(location = %self.location_code))]
    async fn fetch(&self) -> Result<String> {
        let forecast = self.forecasts.forecast(&self.location_code).await?;
        format_weather(&forecast, self.today, &self.lang)
    }
}

/// Sunrise to sunset
pub struct SunHours {
    forecasts: Arc<dyn ForecastSource>,
    location_code: String,
}

impl SunHours {
    pub fn new(forecasts: Arc<dyn ForecastSource>, location_code: impl Into<String>) -> Self {
        Self {
            forecasts,
            location_code: location_code.into(),
        }
    }
}

#[async_trait]
impl Provider for SunHours {
    fn name(&self) -> &str {
        "sun_hours"
    }

    #[instrument(name = "sun_hours", skip(self), fields(location = %self.location_code))]
    async fn fetch(&self) -> Result<String> {
        let forecast = self.forecasts.forecast(&self.location_code).await?;
        format_sun_hours(&forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{City, Condition, ForecastSample, MainReadings, Wind};
    use crate::MorningBotError;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample(dt_txt: &str, temp: f64, feels: f64, wind: f64, pressure: i64, humidity: i64) -> ForecastSample {
        ForecastSample {
            dt_txt: dt_txt.to_string(),
            main: MainReadings {
                temp,
                feels_like: feels,
                pressure,
                humidity,
            },
            weather: vec![Condition {
                description: "overcast clouds".to_string(),
            }],
            wind: Wind { speed: wind },
        }
    }

    fn forecast() -> ForecastResponse {
        ForecastResponse {
            city: City {
                name: "Saint Petersburg".to_string(),
                timezone: 10800,
                // 2026-10-17 05:05 and 15:10 UTC
                sunrise: 1_792_213_500,
                sunset: 1_792_249_800,
            },
            list: vec![
                sample("2026-10-16 21:00:00", 1.0, -1.0, 4.0, 1015, 90),
                sample("2026-10-17 10:00:00", 5.4, 3.2, 2.6, 1013, 80),
                sample("2026-10-17 13:00:00", 7.1, 6.9, 1.1, 1012, 75),
                sample("2026-10-18 10:00:00", 9.0, 8.0, 3.0, 1010, 70),
            ],
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ForecastSource for CountingSource {
        async fn forecast(&self, location_code: &str) -> Result<Arc<ForecastResponse>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if location_code == "missing" {
                return Err(MorningBotError::api("404 city not found"));
            }
            Ok(Arc::new(forecast()))
        }
    }

    #[test]
    fn test_weather_lines_for_today() {
        let text = format_weather(&forecast(), today(), "en").unwrap();
        assert_eq!(
            text,
            "10:00: 5/3 °C, overcast clouds, 3 m/s, 1013 hPa, 80%\n\
             13:00: 7/7 °C, overcast clouds, 1 m/s, 1012 hPa, 75%\n"
        );
    }

    #[test]
    fn test_weather_units_are_localized() {
        let text = format_weather(&forecast(), today(), "ru").unwrap();
        assert!(text.starts_with("10:00: 5/3 °C, overcast clouds, 3 м/с, 1013 гПа, 80%"));
    }

    #[test]
    fn test_weather_without_samples_today_is_empty() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert_eq!(format_weather(&forecast(), day, "en").unwrap(), "");
    }

    #[test]
    fn test_weather_sample_without_condition_fails() {
        let mut broken = forecast();
        broken.list[1].weather.clear();
        assert!(format_weather(&broken, today(), "en").is_err());
    }

    #[rstest]
    #[case(2.5, 2)]
    #[case(3.5, 4)]
    #[case(-0.4, 0)]
    #[case(-2.5, -2)]
    #[case(5.4, 5)]
    fn test_rounding_ties_to_even(#[case] value: f64, #[case] expected: i64) {
        assert_eq!(round_half_even(value), expected);
    }

    #[test]
    fn test_time_and_place() {
        assert_eq!(
            format_time_and_place(&forecast(), today()),
            "Saint Petersburg, 2026-10-17 (26W42)"
        );
    }

    #[test]
    fn test_time_and_place_uses_iso_year() {
        // 2027-01-01 belongs to ISO week 53 of 2026
        let day = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(
            format_time_and_place(&forecast(), day),
            "Saint Petersburg, 2027-01-01 (26W53)"
        );
    }

    #[test]
    fn test_sun_hours_in_city_time() {
        assert_eq!(format_sun_hours(&forecast()).unwrap(), "08:05 - 18:10");
    }

    #[test]
    fn test_sun_hours_rejects_bad_offset() {
        let mut broken = forecast();
        broken.city.timezone = 90_000;
        assert!(format_sun_hours(&broken).is_err());
    }

    #[tokio::test]
    async fn test_cache_fetches_once_per_location() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(ForecastCache::new(CountingSource {
            calls: Arc::clone(&calls),
        }));

        let place = TimeAndPlace::new(cache.clone(), "498817", today());
        let sun = SunHours::new(cache.clone(), "498817");
        let weather = Weather::new(cache.clone(), "498817", today(), "en");

        place.fetch().await.unwrap();
        sun.fetch().await.unwrap();
        weather.fetch().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.forecast("524901").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_cache_does_not_store_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ForecastCache::new(CountingSource {
            calls: Arc::clone(&calls),
        });

        assert!(cache.forecast("missing").await.is_err());
        assert!(cache.forecast("missing").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_prepopulated_cache_skips_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ForecastCache::new(CountingSource {
            calls: Arc::clone(&calls),
        });
        cache.insert("498817", forecast()).await;

        assert!(cache.contains("498817").await);
        let hit = cache.forecast("498817").await.unwrap();
        assert_eq!(hit.city.name, "Saint Petersburg");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
