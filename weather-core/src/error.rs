use reqwest::StatusCode;
use thiserror::Error;

/// Failures of a single weather lookup.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Weather request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body does not have the expected shape.
    #[error("Failed to decode weather response: {0}")]
    Decode(String),
}

impl WeatherError {
    /// Non-success statuses count as transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub(crate) fn status(status: StatusCode, body: &str) -> Self {
        Self::Status { status, body: truncate_body(body) }
    }
}

// The request URL carries the API key, so it never reaches the message.
impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Rejected search text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("City name must not be blank")]
    Blank,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_counts_as_transport() {
        let err = WeatherError::status(StatusCode::NOT_FOUND, r#"{"cod":"404"}"#);
        assert!(err.is_transport());
        assert!(!err.is_decode());
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "é".repeat(300);
        let WeatherError::Status { body, .. } = WeatherError::status(StatusCode::BAD_GATEWAY, &body)
        else {
            panic!("expected status error");
        };
        assert!(body.ends_with("..."));
        assert!(body.len() <= 203);
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err: WeatherError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(err.is_decode());
    }
}
