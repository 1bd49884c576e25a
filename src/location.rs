//! Device position lookup.
//!
//! A terminal has no location hardware, so the "device" position comes from the command line:
//! fixed coordinates, a city name resolved once through the geocoder, or nothing at all, which
//! behaves like a denied permission.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::WeatherError;
use crate::openweather::{Client, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    #[default]
    Balanced,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionOptions {
    pub accuracy: Accuracy,
    pub timeout: Option<Duration>,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Permission;

    async fn current_position(&self, options: PositionOptions)
        -> Result<Coordinate, WeatherError>;
}

/// Why a position is being requested. The two entry points use different fix options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Initial,
    UserRequest,
}

pub struct FixedLocation {
    coordinate: Coordinate,
}

impl FixedLocation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, WeatherError> {
        Ok(self.coordinate)
    }
}

/// Position of a named place, looked up through the geocoder on every request.
pub struct GeocodedLocation {
    client: Client,
    query: String,
}

impl GeocodedLocation {
    pub fn new(client: Client, query: &str) -> Self {
        Self {
            client,
            query: query.to_string(),
        }
    }
}

#[async_trait]
impl LocationProvider for GeocodedLocation {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, WeatherError> {
        let mut places = self.client.search(&self.query, 1).await.map_err(|err| match err {
            WeatherError::ConfigMissing => err,
            other => WeatherError::LocationUnavailable(format!(
                "Could not look up {}: {}",
                self.query,
                other.user_message()
            )),
        })?;
        match places.pop() {
            Some(place) => Ok(place.coordinate),
            None => Err(WeatherError::LocationUnavailable(format!(
                "No place named {}",
                self.query
            ))),
        }
    }
}

/// No location source configured.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, WeatherError> {
        Err(WeatherError::PermissionDenied)
    }
}

#[derive(Clone)]
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
    request_timeout: Duration,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn LocationProvider>, request_timeout: Duration) -> Self {
        Self {
            provider,
            request_timeout,
        }
    }

    /// Fix options per entry point: only an explicit request is high accuracy and time-bounded.
    pub fn options(&self, origin: Origin) -> PositionOptions {
        match origin {
            Origin::Initial => PositionOptions::default(),
            Origin::UserRequest => PositionOptions {
                accuracy: Accuracy::High,
                timeout: Some(self.request_timeout),
            },
        }
    }

    pub async fn resolve(&self, origin: Origin) -> Result<Coordinate, WeatherError> {
        if self.provider.request_permission().await == Permission::Denied {
            warn!(?origin, "location permission denied");
            return Err(WeatherError::PermissionDenied);
        }

        let options = self.options(origin);
        debug!(accuracy = ?options.accuracy, timeout = ?options.timeout, "requesting position");
        let position = self.provider.current_position(options);
        let coordinate = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, position).await {
                Ok(result) => result,
                Err(_) => Err(WeatherError::LocationUnavailable(format!(
                    "Location request timed out after {}s",
                    limit.as_secs()
                ))),
            },
            None => position.await,
        }?;

        info!(
            ?origin,
            lat = coordinate.latitude,
            lon = coordinate.longitude,
            "position resolved"
        );
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SlowLocation {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationProvider for SlowLocation {
        async fn request_permission(&self) -> Permission {
            Permission::Granted
        }

        async fn current_position(
            &self,
            _options: PositionOptions,
        ) -> Result<Coordinate, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Coordinate::new(1.0, 2.0))
        }
    }

    #[tokio::test]
    async fn test_fixed_location() {
        let resolver = LocationResolver::new(
            Arc::new(FixedLocation::new(Coordinate::new(52.52, 13.41))),
            Duration::from_secs(10),
        );
        assert_eq!(
            resolver.resolve(Origin::Initial).await,
            Ok(Coordinate::new(52.52, 13.41))
        );
    }

    #[tokio::test]
    async fn test_no_location_is_permission_denied() {
        let resolver = LocationResolver::new(Arc::new(NoLocation), Duration::from_secs(10));
        assert_eq!(
            resolver.resolve(Origin::UserRequest).await,
            Err(WeatherError::PermissionDenied)
        );
    }

    #[test]
    fn test_options_per_origin() {
        let resolver = LocationResolver::new(Arc::new(NoLocation), Duration::from_secs(10));
        assert_eq!(resolver.options(Origin::Initial), PositionOptions::default());
        assert_eq!(resolver.options(Origin::Initial).timeout, None);
        assert_eq!(
            resolver.options(Origin::UserRequest),
            PositionOptions {
                accuracy: Accuracy::High,
                timeout: Some(Duration::from_secs(10)),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_request_times_out() {
        let resolver = LocationResolver::new(
            Arc::new(SlowLocation {
                delay: Duration::from_secs(30),
                calls: AtomicUsize::new(0),
            }),
            Duration::from_secs(10),
        );
        let result = resolver.resolve(Origin::UserRequest).await;
        assert!(matches!(result, Err(WeatherError::LocationUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_request_has_no_timeout() {
        let provider = Arc::new(SlowLocation {
            delay: Duration::from_secs(30),
            calls: AtomicUsize::new(0),
        });
        let resolver = LocationResolver::new(provider.clone(), Duration::from_secs(10));
        assert_eq!(
            resolver.resolve(Origin::Initial).await,
            Ok(Coordinate::new(1.0, 2.0))
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_geocoded_location() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Lisbon"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Lisbon", "lat": 38.72, "lon": -9.14, "country": "PT"}
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Nowhere"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let client = Client::new(&mock_server.uri(), Some("k".to_string())).unwrap();
        let lisbon = GeocodedLocation::new(client.clone(), "Lisbon");
        assert_eq!(
            lisbon.current_position(PositionOptions::default()).await,
            Ok(Coordinate::new(38.72, -9.14))
        );

        let nowhere = GeocodedLocation::new(client, "Nowhere");
        assert!(matches!(
            nowhere.current_position(PositionOptions::default()).await,
            Err(WeatherError::LocationUnavailable(_))
        ));
    }
}
