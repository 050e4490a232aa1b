use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use weather_core::{
    Config, DirIconSource, IconSet, Recommender, UpdatePipeline, WeatherProvider,
    provider_from_config, recommender_from_config,
};

use crate::app;

/// Top-level CLI struct. Without a subcommand the dashboard window opens.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Desktop weather dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API keys and the icon directory in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            None => launch().await,
        }
    }
}

async fn launch() -> anyhow::Result<()> {
    let config = Config::load()?;
    let credentials = config.credentials()?;

    let provider: Arc<dyn WeatherProvider> =
        Arc::from(provider_from_config(&credentials, &config.openweather)?);
    let recommender: Arc<dyn Recommender> =
        Arc::from(recommender_from_config(&credentials, &config.recommendation)?);

    let icons_dir = config.icons_dir()?;
    let icons = IconSet::load(&DirIconSource::new(&icons_dir));
    info!(dir = %icons_dir.display(), loaded = icons.len(), "icons loaded");

    let (pipeline, view) = UpdatePipeline::new(provider, recommender, config.display.sun_times);

    app::run(app::Startup {
        pipeline: Arc::new(pipeline),
        view,
        icons,
        default_city: config.display.default_city.clone(),
        runtime: tokio::runtime::Handle::current(),
    })
}

/// Prompt for a secret; blank input keeps `current`.
fn prompt_key(label: &str, current: Option<String>) -> anyhow::Result<Option<String>> {
    let mut prompt = Password::new(label)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked);
    if current.is_some() {
        prompt = prompt.with_help_message("Leave blank to keep the current key");
    }
    let entered = prompt
        .prompt()
        .with_context(|| format!("Failed to read {label}"))?;

    Ok(keep_or_replace(current, entered))
}

fn keep_or_replace(current: Option<String>, entered: String) -> Option<String> {
    let entered = entered.trim();
    if entered.is_empty() { current } else { Some(entered.to_string()) }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load_file()?;

    config.openweather.api_key =
        prompt_key("OpenWeather API key:", config.openweather.api_key.take())?;
    config.openweather.air_quality_api_key = prompt_key(
        "OpenWeather air-quality API key (blank = same key):",
        config.openweather.air_quality_api_key.take(),
    )?;
    config.recommendation.api_key =
        prompt_key("Gemini API key:", config.recommendation.api_key.take())?;

    let icons_dir = config.icons_dir()?;
    let dir = Text::new("Icon directory:")
        .with_default(&icons_dir.display().to_string())
        .prompt()
        .context("Failed to read icon directory")?;
    config.assets.icons_dir = Some(PathBuf::from(dir.trim()));

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
