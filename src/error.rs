use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeatherError {
    #[error("Permission to access location was denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Please add your OpenWeatherMap API key")]
    ConfigMissing,

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("Network error: {0}")]
    Network(String),
}

impl WeatherError {
    /// Short text for notifications and the error screen.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => "Permission to access location was denied".to_string(),
            Self::LocationUnavailable(msg) => msg.clone(),
            Self::ConfigMissing => {
                "Please add your OpenWeatherMap API key (--api-key or OPENWEATHER_API_KEY)"
                    .to_string()
            }
            Self::Http(status) => format!("HTTP error! status: {status}"),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Title for the notification raised by an explicit location request.
    pub fn notice_title(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Permission denied",
            _ => "Location Error",
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http(status.as_u16()),
            None => Self::Network(err.to_string()),
        }
    }
}
