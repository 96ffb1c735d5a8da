//! One-shot adapter between the fetch controller and a [`WeatherClient`].

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{error::WeatherError, model::WeatherReport, provider::WeatherClient};

/// Why a report could not be produced.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Human-readable description, if the failure carries one.
    pub fn message(&self) -> Option<String> {
        let msg = self.to_string();
        if msg.trim().is_empty() { None } else { Some(msg) }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Resolves to exactly one report or the failure that prevented it.
    async fn fetch_report(&self, city: &str) -> Result<WeatherReport, FetchError>;
}

/// Forwards every call to the wrapped client; nothing is memoized.
#[derive(Debug, Clone)]
pub struct ClientFetcher<C> {
    client: C,
}

impl<C: WeatherClient> ClientFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: WeatherClient> WeatherFetcher for ClientFetcher<C> {
    async fn fetch_report(&self, city: &str) -> Result<WeatherReport, FetchError> {
        Ok(self.client.fetch(city).await?)
    }
}
