use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, WeatherReport, error::WeatherError};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// One outbound lookup per call: no retries, no caching.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

/// Construct the OpenWeather client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    let api_key = config.api_key()?;
    OpenWeatherClient::new(&config.api, api_key)
}
