//! OpenWeatherMap 5-day forecast model and accessors

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{MorningBotError, Result};

/// Forecast response for one location code
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastResponse {
    /// Metadata of the forecast location
    pub city: City,
    /// Three-hourly samples in chronological order
    pub list: Vec<ForecastSample>,
}

/// City metadata block of the forecast response
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct City {
    /// Display name in the requested language
    pub name: String,
    /// Shift in seconds from UTC
    pub timezone: i32,
    /// Sunrise, Unix seconds
    pub sunrise: i64,
    /// Sunset, Unix seconds
    pub sunset: i64,
}

/// A single forecast sample
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastSample {
    /// Sample time as `YYYY-MM-DD HH:MM:SS` (UTC)
    pub dt_txt: String,
    pub main: MainReadings,
    pub weather: Vec<Condition>,
    pub wind: Wind,
}

/// Temperature, pressure and humidity readings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MainReadings {
    /// Temperature in Celsius (units=metric)
    pub temp: f64,
    /// Perceived temperature in Celsius
    pub feels_like: f64,
    /// Sea-level pressure in hPa
    pub pressure: i64,
    /// Relative humidity in percent
    pub humidity: i64,
}

/// Weather condition entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Condition {
    /// Localized condition description, e.g. "light rain"
    pub description: String,
}

/// Wind readings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Wind {
    /// Wind speed in m/s (units=metric)
    pub speed: f64,
}

impl ForecastResponse {
    /// Samples whose timestamp falls on `date`, in feed order
    pub fn samples_on(&self, date: NaiveDate) -> impl Iterator<Item = &ForecastSample> {
        let prefix = date.format("%Y-%m-%d").to_string();
        self.list
            .iter()
            .filter(move |sample| sample.dt_txt.starts_with(&prefix))
    }
}

impl City {
    /// Offset of the city's local time from UTC
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.timezone).ok_or_else(|| {
            MorningBotError::parse(format!("invalid timezone offset {}s", self.timezone))
        })
    }

    /// Sunrise in the city's local time
    pub fn sunrise_local(&self) -> Result<DateTime<FixedOffset>> {
        to_local(self.sunrise, self.offset()?)
    }

    /// Sunset in the city's local time
    pub fn sunset_local(&self) -> Result<DateTime<FixedOffset>> {
        to_local(self.sunset, self.offset()?)
    }
}

impl ForecastSample {
    /// `HH:MM` part of the sample timestamp
    pub fn clock_time(&self) -> Result<&str> {
        self.dt_txt
            .get(11..16)
            .ok_or_else(|| MorningBotError::parse(format!("malformed dt_txt '{}'", self.dt_txt)))
    }

    /// Description of the first weather condition
    pub fn description(&self) -> Result<&str> {
        self.weather
            .first()
            .map(|c| c.description.as_str())
            .ok_or_else(|| {
                MorningBotError::parse(format!("sample {} has no weather condition", self.dt_txt))
            })
    }
}

fn to_local(timestamp: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| MorningBotError::parse(format!("timestamp {timestamp} out of range")))
}
