//! CBR daily exchange rates feed model

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::{MorningBotError, Result};

/// Root `ValCurs` element of the daily feed
#[derive(Debug, Deserialize)]
pub struct DailyRates {
    /// Publication date, `DD.MM.YYYY`
    #[serde(rename = "@Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Valute", default)]
    pub valutes: Vec<Valute>,
}

/// One currency quote of the feed
#[derive(Debug, Deserialize)]
pub struct Valute {
    /// ISO 4217 letter code, e.g. `USD`
    #[serde(rename = "CharCode")]
    pub char_code: String,
    /// Rate in rubles, comma as decimal separator
    #[serde(rename = "Value")]
    pub value: String,
}

impl DailyRates {
    /// Parse the XML body of the feed
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(from_str(xml)?)
    }

    /// Rate for `code`, or `NotFound` when the feed has no such currency
    pub fn rate(&self, code: &str) -> Result<f64> {
        let valute = self
            .valutes
            .iter()
            .find(|v| v.char_code == code)
            .ok_or_else(|| {
                MorningBotError::not_found(format!(
                    "currency {code} in CBR feed{}",
                    self.date
                        .as_deref()
                        .map(|d| format!(" of {d}"))
                        .unwrap_or_default()
                ))
            })?;
        valute.rate()
    }
}

impl Valute {
    /// Value with the comma separator normalized
    pub fn rate(&self) -> Result<f64> {
        self.value
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| {
                MorningBotError::parse(format!(
                    "invalid rate '{}' for {}",
                    self.value, self.char_code
                ))
            })
    }
}
