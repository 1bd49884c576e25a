//! Runs reducer commands off the UI thread; results come back as [`Msg`]s over an mpsc channel.

use std::sync::mpsc::Sender;

use tokio::runtime::Handle;

use crate::location::LocationResolver;
use crate::openweather::{Client, SEARCH_LIMIT};
use crate::state::{Command, Msg};

#[derive(Clone)]
pub struct Worker {
    runtime: Handle,
    client: Client,
    resolver: LocationResolver,
    tx: Sender<Msg>,
}

impl Worker {
    pub fn new(
        runtime: Handle,
        client: Client,
        resolver: LocationResolver,
        tx: Sender<Msg>,
    ) -> Self {
        Self {
            runtime,
            client,
            resolver,
            tx,
        }
    }

    /// Fire and forget: each command runs on its own task with no cancellation.
    pub fn dispatch(&self, command: Command) {
        let tx = self.tx.clone();
        match command {
            Command::ResolveLocation(origin) => {
                let resolver = self.resolver.clone();
                self.runtime.spawn(async move {
                    let result = resolver.resolve(origin).await;
                    let _ = tx.send(Msg::LocationResolved { origin, result });
                });
            }
            Command::FetchWeather {
                coordinate,
                generation,
            } => {
                let client = self.client.clone();
                self.runtime.spawn(async move {
                    let result = client.fetch_weather(coordinate).await;
                    let _ = tx.send(Msg::WeatherFetched { generation, result });
                });
            }
            Command::Search { query, generation } => {
                let client = self.client.clone();
                self.runtime.spawn(async move {
                    let result = client.search(&query, SEARCH_LIMIT).await;
                    let _ = tx.send(Msg::SearchResults { generation, result });
                });
            }
        }
    }
}
