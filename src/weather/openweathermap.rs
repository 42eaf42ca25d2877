//! OpenWeatherMap 5-day / 3-hour forecast client

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::ForecastSource;
use crate::config::WeatherConfig;
use crate::http::{build_client, check_status, redact};
use crate::models::ForecastResponse;
use crate::Result;

/// Fetches forecasts in metric units and the briefing language
pub struct OpenWeatherMapClient {
    client: Client,
    base_url: String,
    api_key: String,
    lang: String,
}

impl OpenWeatherMapClient {
    /// Fails when no API key is configured
    pub fn new(config: &WeatherConfig, lang: &str, timeout_seconds: u32) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.require_api_key()?.to_string(),
            lang: lang.to_string(),
        })
    }

    fn forecast_url(&self, location_code: &str) -> String {
        format!(
            "{}/forecast?id={}&appid={}&units=metric&lang={}",
            self.base_url,
            urlencoding::encode(location_code),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.lang)
        )
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn forecast(&self, location_code: &str) -> Result<Arc<ForecastResponse>> {
        let url = self.forecast_url(location_code);
        debug!("OpenWeatherMap request URL: {}", redact(&url, &self.api_key));

        let started = Instant::now();
        let response = self.client.get(&url).send().await?;
        let response = check_status(response, "OpenWeatherMap", started).await?;
        let forecast: ForecastResponse = response.json().await?;

        info!(
            "Retrieved forecast for {} with {} samples in {:.3}s",
            forecast.city.name,
            forecast.list.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(Arc::new(forecast))
    }
}
