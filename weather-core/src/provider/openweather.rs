use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::{
    config::{ApiConfig, Units},
    error::WeatherError,
    model::WeatherReport,
};

use super::WeatherClient;

const CURRENT_WEATHER_PATH: &str = "data/2.5/weather";

/// Current-weather lookups against the OpenWeather REST API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api: &ApiConfig, api_key: &str) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = api.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            units: api.units,
            http,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{CURRENT_WEATHER_PATH}", self.base_url)
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip(self), fields(units = %self.units))]
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let url = self.endpoint();
        debug!(%url, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("units", self.units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            warn!(%status, "weather request rejected");
            return Err(WeatherError::status(status, &body));
        }

        let report: WeatherReport = serde_json::from_str(&body)?;
        debug!(location = ?report.location_name, "decoded weather report");

        Ok(report)
    }
}
