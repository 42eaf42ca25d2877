//! `MorningBot` - a once-a-day briefing message
//!
//! The briefing combines the city and ISO week, sunrise and sunset, the
//! first meeting of the day, a currency conversion, birthdays and the
//! day's weather into one plain-text message, then hands it to a
//! delivery sink.

pub mod briefing;
pub mod calendar;
pub mod config;
pub mod contacts;
pub mod currency;
pub mod delivery;
pub mod error;
pub mod http;
pub mod i18n;
pub mod logging;
pub mod models;
pub mod weather;

// Re-export core types for public API
pub use briefing::{BriefingContext, Provider, Section, Sources, assemble, compose, standard_sections};
pub use config::MorningBotConfig;
pub use delivery::{DeliverySink, sink_from_config};
pub use error::MorningBotError;
pub use models::{ForecastResponse, Meeting, MeetingWindow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, MorningBotError>;
