use anyhow::{Context, bail};
use chrono::Timelike;
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};
use weather_core::{
    ClientFetcher, Config, FetchController, FetchState, FilePreferenceStore, PreferenceStore,
    Units, WeatherFetcher, WeatherQuery,
    preferences::{load_last_city, save_last_city},
    provider::client_from_config,
};

use crate::render::{Layout, render_report};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the API key, units and region qualifier.
    ///
    /// Prompts interactively unless any flag is given.
    Configure {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        units: Option<String>,

        /// Country code appended to every query, e.g. "US". Empty clears it.
        #[arg(long)]
        region: Option<String>,
    },

    /// Show current weather for a city, or for the last searched city.
    Show {
        /// City name; omitted means "the city searched last time".
        city: Option<String>,

        /// Print the decoded report as JSON.
        #[arg(long)]
        json: bool,

        #[arg(long, value_enum, default_value_t = Layout::Full)]
        layout: Layout,
    },

    /// Print the last searched city.
    Last,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key, units, region } => configure(api_key, units, region),
            Command::Show { city, json, layout } => show(city, json, layout).await,
            Command::Last => {
                let store = FilePreferenceStore::open_default()?;
                match load_last_city(&store) {
                    Some(city) => println!("{city}"),
                    None => println!("No city searched yet"),
                }
                Ok(())
            }
        }
    }
}

fn configure(
    api_key: Option<String>,
    units: Option<String>,
    region: Option<String>,
) -> anyhow::Result<()> {
    // Read the file directly so an environment key is never written back.
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    if api_key.is_none() && units.is_none() && region.is_none() {
        prompt_config(&mut config)?;
    } else {
        apply_flags(&mut config, api_key, units, region)?;
    }

    config.api_key()?;
    config.save_to(&path)?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// Only the flags that were given change the config.
fn apply_flags(
    config: &mut Config,
    api_key: Option<String>,
    units: Option<String>,
    region: Option<String>,
) -> anyhow::Result<()> {
    if let Some(key) = api_key {
        config.set_api_key(key);
    }
    if let Some(units) = units {
        config.api.units = Units::try_from(units.as_str())?;
    }
    if let Some(region) = region {
        config.set_region(Some(region));
    }
    Ok(())
}

fn prompt_config(config: &mut Config) -> anyhow::Result<()> {
    let key = Password::new("OpenWeather API key (blank keeps the current one):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        config.set_api_key(key);
    }

    let choices = Units::all().to_vec();
    let cursor = choices.iter().position(|u| *u == config.api.units).unwrap_or(0);
    config.api.units = Select::new("Units:", choices)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Failed to read units")?;

    let region = Text::new("Region qualifier (blank for none):")
        .with_initial_value(config.region().unwrap_or_default())
        .prompt()
        .context("Failed to read region")?;
    config.set_region(Some(region));

    Ok(())
}

async fn show(city: Option<String>, json: bool, layout: Layout) -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = client_from_config(&config)?;
    let preferences: Arc<dyn PreferenceStore> = Arc::new(FilePreferenceStore::open_default()?);

    let controller = start_lookup(
        Arc::new(ClientFetcher::new(client)),
        preferences,
        config.region.clone(),
        city,
    )?;

    present(controller.subscribe(), config.api.units, json, layout).await
}

/// Remembers and submits `city`, or restores the last one when none is given.
///
/// Blank input is rejected before anything is saved.
fn start_lookup(
    fetcher: Arc<dyn WeatherFetcher>,
    preferences: Arc<dyn PreferenceStore>,
    region: Option<String>,
    city: Option<String>,
) -> anyhow::Result<FetchController> {
    let query = city.as_deref().map(WeatherQuery::new).transpose()?;

    let controller = FetchController::new(fetcher, Arc::clone(&preferences)).with_region(region);

    match query {
        Some(query) => {
            save_last_city(preferences.as_ref(), query.as_str());
            controller.submit(&query);
        }
        None => {
            controller.initialize();
        }
    }

    Ok(controller)
}

/// Renders each state until the controller settles.
async fn present(
    mut states: watch::Receiver<FetchState>,
    units: Units,
    json: bool,
    layout: Layout,
) -> anyhow::Result<()> {
    loop {
        let state = states.borrow_and_update().clone();
        debug!(state = state.name(), "rendering state");

        match state {
            FetchState::Initial => {
                println!("Enter a city to get the weather");
                return Ok(());
            }
            FetchState::Loading => eprintln!("Loading weather..."),
            FetchState::Success(report) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    let hour = chrono::Local::now().hour();
                    println!("{}", render_report(&report, units, layout, hour));
                }
                return Ok(());
            }
            FetchState::Failed(message) => {
                warn!(%message, "weather lookup failed");
                bail!("No forecast data");
            }
        }

        states
            .changed()
            .await
            .context("Weather lookup was cancelled")?;
    }
}
