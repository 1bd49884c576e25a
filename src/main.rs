use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod cli;
mod daily;
mod error;
mod location;
mod openweather;
mod report;
mod state;
mod units;
mod worker;

use crate::app::run_app;
use crate::cli::Args;
use crate::location::{
    FixedLocation, GeocodedLocation, LocationProvider, LocationResolver, NoLocation, Origin,
};
use crate::openweather::Client;
use crate::state::AppState;
use crate::worker::Worker;

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "owx=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn location_provider(args: &Args, client: &Client) -> Arc<dyn LocationProvider> {
    match (args.coordinate(), args.city.as_deref()) {
        (Some(coordinate), _) => Arc::new(FixedLocation::new(coordinate)),
        (None, Some(city)) => Arc::new(GeocodedLocation::new(client.clone(), city)),
        (None, None) => Arc::new(NoLocation),
    }
}

async fn print_report(client: &Client, resolver: &LocationResolver) -> Result<()> {
    let coordinate = resolver
        .resolve(Origin::Initial)
        .await
        .map_err(|err| anyhow!(err.user_message()))?;
    let weather = client
        .fetch_weather(coordinate)
        .await
        .map_err(|err| anyhow!(err.user_message()))?;
    print!(
        "{}",
        report::format_report(&weather, Local::now().date_naive(), &Local)
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(ref path) = args.log_file {
        init_logging(path)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let client = Client::new(&args.base_url, args.api_key.clone())?;
    if !client.has_api_key() {
        tracing::warn!("no OpenWeatherMap API key configured");
    }
    let provider = location_provider(&args, &client);
    let resolver = LocationResolver::new(provider, args.location_timeout());

    if args.plain {
        return runtime.block_on(print_report(&client, &resolver));
    }

    let (tx, rx) = mpsc::channel();
    let worker = Worker::new(runtime.handle().clone(), client, resolver, tx);

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    tracing::info!("starting owx");
    let mut state = AppState::default();
    let res = run_app(&mut terminal, &mut state, &worker, &rx);

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // in-flight requests are abandoned on exit
    runtime.shutdown_background();

    res.context("terminal error")
}
