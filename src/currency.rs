//! Exchange rate section backed by the Central Bank of Russia daily feed

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::briefing::Provider;
use crate::config::CurrencyConfig;
use crate::http::{build_client, check_status};
use crate::models::DailyRates;
use crate::Result;

/// Source of the daily rates table
#[async_trait]
pub trait CurrencyFeed: Send + Sync {
    async fn daily_rates(&self, date: NaiveDate) -> Result<DailyRates>;
}

/// HTTP client for `XML_daily.asp`
pub struct CbrClient {
    client: Client,
    feed_url: String,
}

impl CbrClient {
    pub fn new(config: &CurrencyConfig, timeout_seconds: u32) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            feed_url: config.feed_url.clone(),
        })
    }

    fn daily_url(&self, date: NaiveDate) -> String {
        format!("{}?date_req={}", self.feed_url, date.format("%d/%m/%Y"))
    }
}

#[async_trait]
impl CurrencyFeed for CbrClient {
    #[instrument(skip(self))]
    async fn daily_rates(&self, date: NaiveDate) -> Result<DailyRates> {
        let url = self.daily_url(date);
        debug!("CBR request URL: {url}");

        let started = Instant::now();
        let response = self.client.get(&url).send().await?;
        let response = check_status(response, "CBR", started).await?;
        // the feed is windows-1251; text() decodes using the response charset
        let body = response.text().await?;
        let rates = DailyRates::parse(&body)?;

        info!(
            "Retrieved {} CBR rates in {:.3}s",
            rates.valutes.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(rates)
    }
}

/// Rubles per one unit of `code` on `date`
pub async fn currency_rate(feed: &dyn CurrencyFeed, date: NaiveDate, code: &str) -> Result<f64> {
    feed.daily_rates(date).await?.rate(code)
}

/// Two fractional digits with `,` grouping, e.g. `1,234.50`
#[must_use]
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Ruble value of `amount` units of `code`
pub struct CurrencyExchange {
    feed: Arc<dyn CurrencyFeed>,
    code: String,
    amount: u32,
    today: NaiveDate,
}

impl CurrencyExchange {
    pub fn new(
        feed: Arc<dyn CurrencyFeed>,
        code: impl Into<String>,
        amount: u32,
        today: NaiveDate,
    ) -> Self {
        Self {
            feed,
            code: code.into(),
            amount,
            today,
        }
    }
}

#[async_trait]
impl Provider for CurrencyExchange {
    fn name(&self) -> &str {
        "currency_exchange"
    }

    #[instrument(name = "currency_exchange", skip(self), fields(code = %self.code, amount = self.amount))]
    async fn fetch(&self) -> Result<String> {
        let rate = currency_rate(self.feed.as_ref(), self.today, &self.code).await?;
        Ok(format_amount(rate * f64::from(self.amount)))
    }
}
