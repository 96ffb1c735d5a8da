use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::QueryError;

/// City text as typed by the user, trimmed and guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeatherQuery(String);

impl WeatherQuery {
    pub fn new(text: &str) -> Result<Self, QueryError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Blank);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Applies the region qualifier unless the user already gave one (`"Paris,FR"`).
    pub fn with_region(&self, region: Option<&str>) -> String {
        match region.map(str::trim).filter(|r| !r.is_empty()) {
            Some(region) if !self.0.contains(',') => format!("{},{}", self.0, region),
            _ => self.0.clone(),
        }
    }
}

impl std::fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current-conditions payload for one location.
///
/// Every top-level field is optional: the provider may leave any of them out and
/// consumers treat absence as "unknown". Field names on the wire follow the
/// OpenWeather current weather document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(rename = "coord", default)]
    pub coordinates: Option<Coordinates>,
    #[serde(rename = "weather", default)]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(rename = "main", default)]
    pub measurements: Option<Measurements>,
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub clouds: Option<Clouds>,
    #[serde(rename = "dt", default)]
    pub observed_at_unix_seconds: Option<i64>,
    #[serde(rename = "sys", default)]
    pub system: Option<SystemInfo>,
    #[serde(rename = "timezone", default)]
    pub utc_offset_seconds: Option<i32>,
    #[serde(rename = "id", default)]
    pub location_id: Option<i64>,
    #[serde(rename = "name", default)]
    pub location_name: Option<String>,
    #[serde(rename = "cod", default, deserialize_with = "lenient_code")]
    pub response_code: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "lat")]
    pub latitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    /// Group name such as "Rain" or "Clear".
    #[serde(rename = "main")]
    pub category: String,
    pub description: String,
    #[serde(rename = "icon")]
    pub icon_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// hPa
    pub pressure: u32,
    pub humidity: u8,
    #[serde(default)]
    pub sea_level: Option<u32>,
    #[serde(rename = "grnd_level", default)]
    pub ground_level: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(rename = "deg")]
    pub direction_degrees: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clouds {
    #[serde(rename = "all")]
    pub cover_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "country")]
    pub country_code: String,
    #[serde(rename = "sunrise")]
    pub sunrise_unix_seconds: i64,
    #[serde(rename = "sunset")]
    pub sunset_unix_seconds: i64,
}

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

impl WeatherReport {
    /// The first reported condition; presentation treats it as the headline.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.as_ref().and_then(|c| c.first())
    }

    pub fn icon_url(&self) -> Option<String> {
        self.primary_condition()
            .map(|c| format!("{ICON_BASE_URL}/{}@2x.png", c.icon_id))
    }

    pub fn cloud_cover_percent(&self) -> Option<u8> {
        self.clouds.map(|c| c.cover_percent)
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at_unix_seconds.and_then(unix_to_utc)
    }

    /// Observation time in the location's own UTC offset.
    pub fn local_observed_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds?)?;
        self.observed_at().map(|t| t.with_timezone(&offset))
    }

    pub fn sunrise(&self) -> Option<DateTime<Utc>> {
        self.system.as_ref().and_then(|s| unix_to_utc(s.sunrise_unix_seconds))
    }

    pub fn sunset(&self) -> Option<DateTime<Utc>> {
        self.system.as_ref().and_then(|s| unix_to_utc(s.sunset_unix_seconds))
    }
}

/// What the presentation layer should show right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchState {
    #[default]
    Initial,
    Loading,
    Success(WeatherReport),
    Failed(String),
}

impl FetchState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Failed(_) => "failed",
        }
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

// The provider sends `cod` as a number on success and as a string on errors.
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Code>::deserialize(deserializer)? {
        Some(Code::Number(n)) => Some(n),
        Some(Code::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
