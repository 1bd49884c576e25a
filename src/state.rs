//! Application state and the reducer that drives it.
//!
//! Every change goes through [`AppState::update`], which returns the side effects the worker
//! must run. Results come back as further messages.

use tracing::{debug, info, warn};

use crate::error::WeatherError;
use crate::location::Origin;
use crate::openweather::geo::Suggestion;
use crate::openweather::{Coordinate, Weather};

/// Position changes at or below this many degrees don't trigger a refetch.
pub const LOCATION_EPSILON: f64 = 0.001;
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Loading,
    Error(String),
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Search {
    pub query: String,
    pub suggestions: Vec<Suggestion>,
    pub highlighted: usize,
    pub loading: bool,
    generation: u64,
}

impl Search {
    /// Empties the list and invalidates any response still in flight.
    fn reset_results(&mut self) {
        self.suggestions.clear();
        self.highlighted = 0;
        self.loading = false;
        self.generation += 1;
    }
}

#[derive(Debug, PartialEq)]
pub enum Msg {
    InitialLoad,
    Retry,
    LocationResolved {
        origin: Origin,
        result: Result<Coordinate, WeatherError>,
    },
    UseCurrentLocation,
    WeatherFetched {
        generation: u64,
        result: Result<Weather, WeatherError>,
    },
    SearchChanged(String),
    SearchResults {
        generation: u64,
        result: Result<Vec<Suggestion>, WeatherError>,
    },
    HighlightNext,
    HighlightPrevious,
    SelectSuggestion(usize),
    ClearSearch,
    DismissNotice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ResolveLocation(Origin),
    FetchWeather {
        coordinate: Coordinate,
        generation: u64,
    },
    Search {
        query: String,
        generation: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub screen: Screen,
    pub coordinate: Option<Coordinate>,
    pub weather: Option<Weather>,
    pub search: Search,
    pub locating: bool,
    pub notice: Option<Notice>,
    fetch_generation: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: Screen::Loading,
            coordinate: None,
            weather: None,
            search: Search::default(),
            locating: false,
            notice: None,
            fetch_generation: 0,
        }
    }
}

impl AppState {
    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::InitialLoad | Msg::Retry => {
                self.screen = Screen::Loading;
                self.notice = None;
                vec![Command::ResolveLocation(Origin::Initial)]
            }
            Msg::LocationResolved { origin, result } => self.location_resolved(origin, result),
            Msg::UseCurrentLocation => {
                if self.locating {
                    return vec![];
                }
                self.locating = true;
                self.notice = None;
                vec![Command::ResolveLocation(Origin::UserRequest)]
            }
            Msg::WeatherFetched { generation, result } => {
                if generation != self.fetch_generation {
                    debug!(generation, current = self.fetch_generation, "dropping stale weather");
                    return vec![];
                }
                match result {
                    Ok(weather) => {
                        self.weather = Some(weather);
                        self.screen = Screen::Ready;
                    }
                    Err(err) => {
                        warn!(%err, "weather fetch failed");
                        self.weather = None;
                        self.screen = Screen::Error(err.user_message());
                    }
                }
                vec![]
            }
            Msg::SearchChanged(query) => {
                self.search.query = query;
                self.search.reset_results();
                if self.search.query.chars().count() < MIN_QUERY_LEN {
                    return vec![];
                }
                self.search.loading = true;
                vec![Command::Search {
                    query: self.search.query.clone(),
                    generation: self.search.generation,
                }]
            }
            Msg::SearchResults { generation, result } => {
                if generation != self.search.generation {
                    debug!(
                        generation,
                        current = self.search.generation,
                        "dropping stale search results"
                    );
                    return vec![];
                }
                self.search.loading = false;
                self.search.highlighted = 0;
                match result {
                    Ok(suggestions) => self.search.suggestions = suggestions,
                    Err(err) => {
                        warn!(%err, "search failed");
                        self.search.suggestions.clear();
                    }
                }
                vec![]
            }
            Msg::HighlightNext => {
                let len = self.search.suggestions.len();
                if len > 0 {
                    self.search.highlighted = (self.search.highlighted + 1) % len;
                }
                vec![]
            }
            Msg::HighlightPrevious => {
                let len = self.search.suggestions.len();
                if len > 0 {
                    self.search.highlighted = (self.search.highlighted + len - 1) % len;
                }
                vec![]
            }
            Msg::SelectSuggestion(index) => {
                let Some(place) = self.search.suggestions.get(index).cloned() else {
                    return vec![];
                };
                info!(place = %place.label(), "location selected");
                self.search.query = place.query_text();
                self.search.reset_results();
                self.move_to(place.coordinate)
            }
            Msg::ClearSearch => {
                self.search.query.clear();
                self.search.reset_results();
                vec![]
            }
            Msg::DismissNotice => {
                self.notice = None;
                vec![]
            }
        }
    }

    fn location_resolved(
        &mut self,
        origin: Origin,
        result: Result<Coordinate, WeatherError>,
    ) -> Vec<Command> {
        match (origin, result) {
            (Origin::Initial, Ok(coordinate)) => {
                self.coordinate = Some(coordinate);
                vec![self.fetch(coordinate)]
            }
            (Origin::Initial, Err(err)) => {
                warn!(%err, "initial location failed");
                self.screen = Screen::Error(err.user_message());
                vec![]
            }
            (Origin::UserRequest, Ok(coordinate)) => {
                self.locating = false;
                let moved = match self.coordinate {
                    Some(held) => coordinate.differs_from(&held, LOCATION_EPSILON),
                    None => true,
                };
                if self.weather.is_some() && !moved {
                    info!("position unchanged, keeping current weather");
                    return vec![];
                }
                self.search.query.clear();
                self.search.reset_results();
                self.coordinate = Some(coordinate);
                self.screen = Screen::Loading;
                vec![self.fetch(coordinate)]
            }
            (Origin::UserRequest, Err(err)) => {
                self.locating = false;
                warn!(%err, "current location request failed");
                self.notice = Some(Notice {
                    title: err.notice_title().to_string(),
                    message: err.user_message(),
                });
                vec![]
            }
        }
    }

    /// Holds a new coordinate and fetches for it; an unchanged coordinate is a no-op.
    fn move_to(&mut self, coordinate: Coordinate) -> Vec<Command> {
        if self.coordinate == Some(coordinate) {
            return vec![];
        }
        self.coordinate = Some(coordinate);
        self.screen = Screen::Loading;
        vec![self.fetch(coordinate)]
    }

    fn fetch(&mut self, coordinate: Coordinate) -> Command {
        self.fetch_generation += 1;
        Command::FetchWeather {
            coordinate,
            generation: self.fetch_generation,
        }
    }
}
