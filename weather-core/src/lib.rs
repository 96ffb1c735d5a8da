//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and the fetcher seam above it
//! - The fetch controller that turns a city query into a [`FetchState`]
//! - Preference storage for the last searched city
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod preferences;
pub mod provider;

pub use config::{ApiConfig, Config, Units};
pub use controller::{FetchController, UNKNOWN_ERROR};
pub use error::{QueryError, WeatherError};
pub use fetcher::{ClientFetcher, FetchError, WeatherFetcher};
pub use model::{FetchState, WeatherQuery, WeatherReport};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use provider::{OpenWeatherClient, WeatherClient};
