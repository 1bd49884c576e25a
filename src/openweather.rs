use std::collections::HashMap;

use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::WeatherError;

pub const BASE_URL: &str = "https://api.openweathermap.org";
const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const USER_AGENT: &str = concat!("owx/", env!("CARGO_PKG_VERSION"));
const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

pub const SEARCH_LIMIT: usize = 5;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when either axis moved by more than `epsilon` degrees.
    pub fn differs_from(&self, other: &Coordinate, epsilon: f64) -> bool {
        (self.latitude - other.latitude).abs() > epsilon
            || (self.longitude - other.longitude).abs() > epsilon
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Condition {
    pub id: u32,

    pub description: String,

    pub icon: String,
}

impl Condition {
    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}@2x.png", self.icon)
    }

    pub fn small_icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}.png", self.icon)
    }

    /// Terminal stand-in for the icon image.
    /// See: https://openweathermap.org/weather-conditions
    pub fn glyph(&self) -> &'static str {
        match self.id {
            200..=232 => "⛈",
            300..=321 | 500..=531 => "🌧",
            600..=622 => "❄",
            701..=781 => "🌫",
            800 => "☀",
            801 => "⛅",
            802..=804 => "☁",
            _ => "?",
        }
    }
}

pub mod current {
    use super::*;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct CurrentConditions {
        pub name: String,

        pub main: Main,

        pub wind: Wind,

        pub sys: Sys,

        #[serde(default)]
        pub weather: Vec<Condition>,
    }

    impl CurrentConditions {
        pub fn condition(&self) -> Option<&Condition> {
            self.weather.first()
        }
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Main {
        pub temp: f64,

        pub feels_like: f64,

        pub humidity: u8,
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Wind {
        pub speed: f64,

        pub deg: Option<f64>,
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Sys {
        #[serde(default)]
        pub country: String,

        pub sunrise: i64,

        pub sunset: i64,
    }
}

pub mod forecast {
    use super::*;

    #[derive(Deserialize, Debug, Clone, PartialEq, Default)]
    pub struct Forecast {
        pub list: Vec<ForecastSample>,
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct ForecastSample {
        pub dt: i64,

        pub main: Main,

        #[serde(default)]
        pub weather: Vec<Condition>,
    }

    impl ForecastSample {
        pub fn condition(&self) -> Option<&Condition> {
            self.weather.first()
        }
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Main {
        pub temp_min: f64,

        pub temp_max: f64,
    }
}

pub mod geo {
    use super::*;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Suggestion {
        pub name: String,

        pub state: Option<String>,

        #[serde(default)]
        pub country: String,

        #[serde(flatten)]
        pub coordinate: Coordinate,

        #[serde(default)]
        pub local_names: HashMap<String, String>,
    }

    impl Suggestion {
        /// English name, when it differs from `name`.
        pub fn local_name(&self) -> Option<&str> {
            self.local_names
                .get("en")
                .map(String::as_str)
                .filter(|en| *en != self.name)
        }

        /// `Name, State, CC` as shown in the suggestion list.
        pub fn label(&self) -> String {
            match self.state {
                Some(ref state) => format!("{}, {}, {}", self.name, state, self.country),
                None => format!("{}, {}", self.name, self.country),
            }
        }

        /// Text placed in the search box once this suggestion is picked.
        pub fn query_text(&self) -> String {
            format!("{}, {}", self.name, self.country)
        }
    }
}

/// Current conditions and the raw forecast, committed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub current: current::CurrentConditions,
    pub forecast: forecast::Forecast,
}

#[derive(Clone, Debug)]
pub struct Client {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, WeatherError> {
        let http = HttpClient::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str, WeatherError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != PLACEHOLDER_KEY => Ok(key),
            _ => Err(WeatherError::ConfigMissing),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_ok()
    }

    #[instrument(skip(self), level = "info")]
    pub async fn current(
        &self,
        coord: Coordinate,
    ) -> Result<current::CurrentConditions, WeatherError> {
        let key = self.api_key()?;
        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("appid", key.to_string()),
            ])
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self), level = "info")]
    pub async fn forecast(&self, coord: Coordinate) -> Result<forecast::Forecast, WeatherError> {
        let key = self.api_key()?;
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("appid", key.to_string()),
            ])
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self), level = "info")]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<geo::Suggestion>, WeatherError> {
        let key = self.api_key()?;
        let url = format!("{}/geo/1.0/direct", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("limit", limit.to_string()),
                ("appid", key.to_string()),
            ])
            .send()
            .await?;
        let results: Vec<geo::Suggestion> = read_json(response).await?;
        info!(count = results.len(), "search results");
        Ok(results)
    }

    /// Fetches current conditions and the forecast concurrently.
    ///
    /// Both requests run as independent tasks: the join fails as soon as either fails and the
    /// other request is left to finish on its own with its result discarded.
    pub async fn fetch_weather(&self, coord: Coordinate) -> Result<Weather, WeatherError> {
        self.api_key()?;

        let current_client = self.clone();
        let forecast_client = self.clone();
        let current = tokio::spawn(async move { current_client.current(coord).await });
        let forecast = tokio::spawn(async move { forecast_client.forecast(coord).await });

        let (current, forecast) = tokio::try_join!(flatten(current), flatten(forecast))?;
        info!(samples = forecast.list.len(), city = %current.name, "weather fetched");
        Ok(Weather { current, forecast })
    }
}

async fn flatten<T>(
    handle: tokio::task::JoinHandle<Result<T, WeatherError>>,
) -> Result<T, WeatherError> {
    match handle.await {
        Ok(result) => result,
        Err(err) => Err(WeatherError::Network(err.to_string())),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, WeatherError> {
    let status = response.status();
    if !status.is_success() {
        return Err(WeatherError::Http(status.as_u16()));
    }
    response
        .json::<T>()
        .await
        .map_err(|err| WeatherError::Network(err.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn current_json() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": 13.41, "lat": 52.52},
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 293.15, "feels_like": 292.5, "temp_min": 291.0, "temp_max": 295.0,
                     "pressure": 1012, "humidity": 48},
            "wind": {"speed": 3.6, "deg": 250},
            "sys": {"country": "DE", "sunrise": 1717210000, "sunset": 1717270000},
            "name": "Berlin",
            "dt": 1717240000
        })
    }

    pub(crate) fn forecast_json() -> serde_json::Value {
        serde_json::json!({
            "cnt": 2,
            "list": [
                {"dt": 1717243200, "main": {"temp": 294.0, "temp_min": 293.0, "temp_max": 296.0},
                 "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
                 "dt_txt": "2024-06-01 12:00:00"},
                {"dt": 1717329600, "main": {"temp": 290.0, "temp_min": 289.0, "temp_max": 291.5},
                 "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
                 "dt_txt": "2024-06-02 12:00:00"}
            ]
        })
    }

    fn client(server: &MockServer) -> Client {
        Client::new(&server.uri(), Some("test_key".to_string())).unwrap()
    }

    #[test]
    fn test_coordinate_differs_from() {
        let a = Coordinate::new(52.52, 13.41);
        assert!(!a.differs_from(&Coordinate::new(52.5205, 13.4095), 0.001));
        assert!(a.differs_from(&Coordinate::new(52.522, 13.41), 0.001));
        assert!(a.differs_from(&Coordinate::new(52.52, 13.408), 0.001));
    }

    #[test]
    fn test_condition_icons() {
        let mut cond = Condition {
            id: 800,
            description: "clear sky".into(),
            icon: "01n".into(),
        };
        assert_eq!(cond.icon_url(), "https://openweathermap.org/img/wn/01n@2x.png");
        assert_eq!(cond.small_icon_url(), "https://openweathermap.org/img/wn/01n.png");
        assert_eq!(cond.glyph(), "☀");
        cond.id = 502;
        assert_eq!(cond.glyph(), "🌧");
        cond.id = 211;
        assert_eq!(cond.glyph(), "⛈");
        cond.id = 900;
        assert_eq!(cond.glyph(), "?");
    }

    #[test]
    fn test_suggestion_parsing() {
        let suggestion: geo::Suggestion = serde_json::from_value(serde_json::json!({
            "name": "Portland",
            "local_names": {"en": "Portland", "ru": "Портленд"},
            "lat": 45.5202471,
            "lon": -122.674194,
            "country": "US",
            "state": "Oregon"
        }))
        .unwrap();
        assert_eq!(suggestion.coordinate, Coordinate::new(45.5202471, -122.674194));
        assert_eq!(suggestion.label(), "Portland, Oregon, US");
        assert_eq!(suggestion.query_text(), "Portland, US");
        assert_eq!(suggestion.local_name(), None);

        let suggestion: geo::Suggestion = serde_json::from_value(serde_json::json!({
            "name": "München",
            "local_names": {"en": "Munich"},
            "lat": 48.13,
            "lon": 11.57,
            "country": "DE"
        }))
        .unwrap();
        assert_eq!(suggestion.label(), "München, DE");
        assert_eq!(suggestion.local_name(), Some("Munich"));
    }

    #[tokio::test]
    async fn test_missing_key_is_checked_before_any_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let coord = Coordinate::new(1.0, 2.0);
        for key in [None, Some(String::new()), Some(PLACEHOLDER_KEY.to_string())] {
            let client = Client::new(&mock_server.uri(), key).unwrap();
            assert!(!client.has_api_key());
            assert_eq!(client.fetch_weather(coord).await, Err(WeatherError::ConfigMissing));
            assert_eq!(client.search("Paris", 5).await, Err(WeatherError::ConfigMissing));
        }
    }

    #[tokio::test]
    async fn test_fetch_weather() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "52.52"))
            .and(query_param("lon", "13.41"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let weather = client(&mock_server)
            .fetch_weather(Coordinate::new(52.52, 13.41))
            .await
            .unwrap();
        assert_eq!(weather.current.name, "Berlin");
        assert_eq!(weather.current.sys.country, "DE");
        assert_eq!(weather.current.main.humidity, 48);
        assert_eq!(weather.current.wind.deg, Some(250.0));
        assert_eq!(weather.current.condition().unwrap().description, "clear sky");
        assert_eq!(weather.forecast.list.len(), 2);
        assert_eq!(weather.forecast.list[1].main.temp_max, 291.5);
    }

    #[tokio::test]
    async fn test_fetch_weather_fails_when_forecast_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .fetch_weather(Coordinate::new(52.52, 13.41))
            .await;
        assert_eq!(result, Err(WeatherError::Http(500)));
    }

    #[tokio::test]
    async fn test_fetch_weather_fails_when_current_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server)
            .fetch_weather(Coordinate::new(52.52, 13.41))
            .await;
        assert_eq!(result, Err(WeatherError::Http(401)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_network_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).current(Coordinate::new(0.0, 0.0)).await;
        assert!(matches!(result, Err(WeatherError::Network(_))));
    }

    #[tokio::test]
    async fn test_search() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "San Jose"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "San Jose", "lat": 37.33, "lon": -121.89, "country": "US", "state": "California"},
                {"name": "San José", "local_names": {"en": "San Jose"}, "lat": 9.93, "lon": -84.08, "country": "CR"}
            ])))
            .mount(&mock_server)
            .await;

        let results = client(&mock_server).search("San Jose", SEARCH_LIMIT).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label(), "San Jose, California, US");
        assert_eq!(results[1].local_name(), Some("San Jose"));
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).search("Paris", SEARCH_LIMIT).await;
        assert_eq!(result, Err(WeatherError::Http(429)));
    }
}
