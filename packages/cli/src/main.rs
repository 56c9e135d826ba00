#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal front end for safe route planning.
//!
//! Drives a [`MapSession`] over a [`TerminalMap`]: calculates routes and
//! lets the user switch between them, loads the incident feed and reports
//! how it clusters at a given zoom, or checks that the backend is up.
//! Without a subcommand it prompts for a route.
//!
//! Uses `indicatif-log-bridge` (via [`safe_route_cli_utils::init_logger`])
//! so that log lines and the busy spinner never fight for the terminal.

mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use safe_route_client::{ApiClient, ClientConfig};
use safe_route_geography_models::GeoPoint;
use safe_route_incident_models::{SeverityLevel, severity_histogram};
use safe_route_map::MapSurface;
use safe_route_routes::CalculationOutcome;
use safe_route_session::{FixedLocation, MapSession, RefreshOutcome, initial_viewport};

use crate::terminal::{TerminalMap, format_entry};

#[derive(Parser)]
#[command(name = "safe_route_cli", about = "Plan safer routes and explore incident data")]
struct Cli {
    /// TOML file overriding the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Your position as `lat,lng`; centers the map on it
    #[arg(long, global = true, value_parser = parse_point)]
    location: Option<GeoPoint>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate routes between two places and pick one
    Route {
        /// Starting location (prompted for when omitted)
        #[arg(long)]
        start: Option<String>,

        /// Destination (prompted for when omitted)
        #[arg(long)]
        end: Option<String>,
    },
    /// Load the incident feed and summarize it
    Incidents {
        /// Zoom level to cluster at (defaults to the configured zoom)
        #[arg(long)]
        zoom: Option<u8>,
    },
    /// Check that the backend is reachable
    Ping,
}

fn parse_point(value: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{value}`"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    GeoPoint::new(lat, lng).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = safe_route_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = ClientConfig::load(cli.config.as_deref())?;
    let client = ApiClient::new(&config)?;

    println!("Safe Route ({})", client.base_url());
    println!();

    let command = cli.command.unwrap_or(Command::Route {
        start: None,
        end: None,
    });

    if matches!(command, Command::Ping) {
        let message = client.ping().await?;
        println!("Backend says: {message}");
        return Ok(());
    }

    let surface = TerminalMap::new(&multi, initial_viewport(&config));
    let mut session = MapSession::new(surface, &config);

    if let Some(position) = cli.location {
        if let Err(e) = session.locate_user(&FixedLocation(position)).await {
            log::warn!("Ignoring --location {position}: {e}");
        }
    }
    session.settle_layout().await;

    match command {
        Command::Route { start, end } => {
            plan_route(&mut session, &client, start, end).await?;
        }
        Command::Incidents { zoom } => explore_incidents(&mut session, &client, zoom).await,
        Command::Ping => {}
    }

    let surface = session.close();
    log::debug!("{} overlays left after close", surface.map().overlay_count());

    Ok(())
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String, dialoguer::Error> {
    match value {
        Some(value) => Ok(value),
        None => Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text(),
    }
}

#[allow(clippy::future_not_send)]
async fn plan_route(
    session: &mut MapSession<TerminalMap>,
    client: &ApiClient,
    start: Option<String>,
    end: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = prompt_if_missing(start, "Starting location")?;
    let end = prompt_if_missing(end, "Destination")?;

    let routes = match session.calculate_route(client, &start, &end).await {
        Ok(CalculationOutcome::Rendered { routes, .. }) => routes,
        Ok(CalculationOutcome::Failed(e)) => {
            log::debug!("Route calculation failed: {e}");
            return Ok(());
        }
        // Input errors were already shown through the panel.
        Ok(CalculationOutcome::Stale) | Err(_) => return Ok(()),
    };

    if routes < 2 {
        return Ok(());
    }

    loop {
        let entries = session.routes().layers().list_entries();
        let mut labels: Vec<String> = entries.iter().map(format_entry).collect();
        labels.push("Done".to_string());

        let idx = Select::new()
            .with_prompt("Show another route?")
            .items(&labels)
            .default(session.routes().selected().unwrap_or(0))
            .interact()?;

        if idx >= entries.len() {
            break;
        }
        session.select_route(idx);
    }

    Ok(())
}

#[allow(clippy::future_not_send)]
async fn explore_incidents(
    session: &mut MapSession<TerminalMap>,
    client: &ApiClient,
    zoom: Option<u8>,
) {
    let summary = match session.refresh_incidents(client).await {
        RefreshOutcome::Rendered(summary) => summary,
        RefreshOutcome::Failed(_) | RefreshOutcome::Stale => return,
    };
    let summary = zoom
        .and_then(|zoom| session.zoom_to(zoom))
        .unwrap_or(summary);

    let incidents = session.incidents();
    let viewport = session.surface().map().viewport();
    println!(
        "{} incidents loaded; at zoom {} around {}: {} clusters, {} single markers{}",
        incidents.len(),
        viewport.zoom,
        viewport.center,
        summary.clusters,
        summary.singles,
        if summary.fallback { " (unclustered)" } else { "" },
    );

    let histogram = severity_histogram(incidents);
    for (level, count) in SeverityLevel::all().iter().zip(histogram) {
        println!("  severity {}: {count}", level.value());
    }
}
