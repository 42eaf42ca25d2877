//! Data models for the morning briefing
//!
//! - Forecast: OpenWeatherMap forecast payload
//! - Currency: CBR daily rates feed
//! - Meeting: calendar events and the daily query window

pub mod currency;
pub mod forecast;
pub mod meeting;

pub use currency::{DailyRates, Valute};
pub use forecast::{City, Condition, ForecastResponse, ForecastSample, MainReadings, Wind};
pub use meeting::{Meeting, MeetingWindow};
