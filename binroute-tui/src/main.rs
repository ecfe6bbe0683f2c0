//! Terminal dashboard for bin priorities, van assignments, and collection routes.

mod app;
mod config;
mod input;
mod logging;
mod ui;

use std::{
    io,
    path::PathBuf,
    sync::Arc,
    time::{Duration as StdDuration, Instant},
};

use anyhow::{Context as _, Result};
use binroute_core::{
    dispatch::Dispatcher, model::RouteOutcome, plugin::StrategyRegistry, ports::PortError,
    routing::RouteBuilder, service::CollectionService,
};
use binroute_provider_firebase::FirebaseTelemetry;
use binroute_provider_gmaps::GoogleDirections;
use binroute_provider_twilio::TwilioNotifier;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tracing::{info, warn};

use crate::app::App;
use crate::config::AppConfig;
use crate::input::Action;

#[derive(Parser, Debug)]
#[command(name = "binroute", version, about = "Plan waste collection runs from live bin telemetry")]
struct Cli {
    /// Read variables from this file instead of `.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Run one collection cycle, log a summary, and exit without the dashboard
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.env_file.as_deref())?;
    logging::init(&config.logging)?;

    // HTTP + service setup
    let client = Client::builder().user_agent("binroute/0.1").build()?;
    let service = Arc::new(build_service(&config, client)?);

    let workers = match &config.workers_file {
        Some(path) => config::load_workers(path)?,
        None => Vec::new(),
    };
    info!(
        source = service.source(),
        strategy = %service.strategy(),
        workers = workers.len(),
        sms = service.notifications_enabled(),
        "binroute starting"
    );

    if cli.once {
        return run_once(&service).await;
    }

    // App state
    let app = App::new(service, workers, config.refresh_interval);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn build_service(config: &AppConfig, client: Client) -> Result<CollectionService> {
    let strategy = StrategyRegistry::standard().strategy(&config.strategy)?;

    let telemetry = Arc::new(FirebaseTelemetry::new(
        client.clone(),
        config.firebase.clone(),
    ));
    let directions = Arc::new(GoogleDirections::new(
        client.clone(),
        config.gmaps_api_key.clone(),
    ));
    let routes = RouteBuilder::new(directions)
        .with_timeout(config.route_timeout)
        .with_max_in_flight(config.max_route_requests);

    let dispatcher = match &config.twilio {
        Some(twilio) => Dispatcher::new(Arc::new(TwilioNotifier::new(client, twilio.clone()))),
        None => {
            warn!("twilio credentials incomplete, task notifications disabled");
            Dispatcher::disabled()
        }
    };

    Ok(CollectionService::new(telemetry, strategy, routes).with_dispatcher(dispatcher))
}

async fn run_once(service: &CollectionService) -> Result<()> {
    let snapshot = service
        .run_cycle()
        .await
        .context("collection cycle failed")?;

    for route in &snapshot.routes {
        match &route.outcome {
            RouteOutcome::Routed(planned) => {
                info!(van = %route.van, color = %route.color, stops = planned.stops.len(), "route ready");
            }
            RouteOutcome::Idle => info!(van = %route.van, "van idle"),
            RouteOutcome::Failed(reason) => warn!(van = %route.van, %reason, "route failed"),
        }
    }
    for bin in snapshot.assignment.unassigned() {
        warn!(%bin, "bin unassigned");
    }
    info!(
        total_fill = snapshot.analytics.total_fill,
        average_carbon_kg = snapshot.analytics.average_carbon_kg,
        "cycle summary"
    );

    Ok(())
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        if app.refresh_due(Instant::now()) {
            refresh(terminal, &mut app).await?;
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::Refresh => {
                    app.status_message = None;
                    refresh(terminal, &mut app).await?;
                }
                Action::DispatchSelected => {
                    dispatch_selected(terminal, &mut app).await?;
                }
            }
        }
    }

    Ok(())
}

async fn refresh(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    app.is_loading = true;
    terminal.draw(|frame| ui::draw(frame, app))?;

    let result = app.service.run_cycle().await;

    app.is_loading = false;
    app.apply_cycle(result, Instant::now());
    Ok(())
}

async fn dispatch_selected(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let Some(bin) = app.selected_bin().map(|scored| scored.bin.id.clone()) else {
        app.error_message = Some("No bin selected".into());
        return Ok(());
    };
    let Some(worker) = app.selected_worker().cloned() else {
        app.error_message = Some("No field worker to notify (set BINROUTE_WORKERS_FILE)".into());
        return Ok(());
    };

    app.is_loading = true;
    app.error_message = None;
    app.status_message = None;
    terminal.draw(|frame| ui::draw(frame, app))?;

    let res = match &app.snapshot {
        Some(snapshot) => app.service.dispatch_task(snapshot, &bin, &worker).await,
        None => Err(PortError::UnknownBin(bin.clone())),
    };

    app.is_loading = false;
    match res {
        Ok(()) => {
            app.status_message = Some(format!("Sent bin {bin} to {}", worker.name));
        }
        Err(err) => {
            app.error_message = Some(format!("Dispatch failed: {err}"));
        }
    }
    Ok(())
}
