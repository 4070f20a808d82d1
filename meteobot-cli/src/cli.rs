use anyhow::Result;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};
use meteobot_core::{
    ArcGisGeocoder, Config, ForecastPeriod, Geocoder, Language, LocationPoint, ProviderId,
    ProviderSet, WeatherCache, WeatherResolver, render::location_failure_message,
};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteobot", version, about = "Weather for any locality, cached per provider")]
pub struct Cli {
    /// Log filter, e.g. "debug" or "meteobot_core=trace". Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweathermap" or "meteomatics".
        provider: String,
    },

    /// Show weather for a place.
    Show {
        /// Place name, e.g. "Odesa".
        place: String,

        /// Provider to ask; defaults to the configured one.
        #[arg(long)]
        provider: Option<String>,

        /// current, today or five-days.
        #[arg(long, default_value = "current")]
        period: ForecastPeriod,

        /// Message language: ua or en.
        #[arg(long)]
        lang: Option<Language>,

        /// Print the message with its <b> markup.
        #[arg(long)]
        html: bool,
    },

    /// List providers and whether they are configured.
    Providers,

    /// Show where the weather cache lives and how many records it holds.
    Cache,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show {
                place,
                provider,
                period,
                lang,
                html,
            } => show(&place, provider, period, lang, html).await,
            Command::Providers => providers(),
            Command::Cache => cache().await,
        }
    }
}

/// Config file values with environment overrides applied. Never saved back.
fn runtime_config() -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

fn configure(provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    match id {
        ProviderId::OpenWeatherMap => {
            let api_key = Password::new("OpenWeatherMap API key:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()?;
            config.upsert_provider_api_key(id, api_key.trim().to_string());
        }
        ProviderId::Meteomatics => {
            let username = Text::new("Meteomatics username:").prompt()?;
            let password = Password::new("Meteomatics password:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()?;
            config.upsert_provider_login(id, username.trim().to_string(), password);
        }
    }

    if config.default_provider_id().ok() != Some(id) {
        let make_default = Confirm::new(&format!("Use {} by default?", id.display_name()))
            .with_default(false)
            .prompt()?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save()?;
    println!(
        "Saved {} credentials to {}",
        id.display_name(),
        Config::config_file_path()?.display()
    );

    Ok(())
}

async fn show(
    place: &str,
    provider: Option<String>,
    period: ForecastPeriod,
    lang: Option<Language>,
    html: bool,
) -> Result<()> {
    let config = runtime_config()?;
    let language = lang.unwrap_or(config.language);

    // Unknown names are passed through so the resolver can report them.
    let provider_name = match provider {
        Some(name) => name,
        None => config.default_provider_id()?.as_str().to_string(),
    };

    let geocoder = ArcGisGeocoder::from_config(&config)?;

    let point = match geocoder.candidates(place).await {
        Ok(candidates) => pick_location(candidates)?,
        Err(err) => {
            println!("{}", plain(&location_failure_message(&err, language), html));
            return Ok(());
        }
    };
    debug!(location = %point.location, address = %point.address, "location selected");

    let cache_path = config.cache_file_path()?;
    let resolver = WeatherResolver::new(
        WeatherCache::open(&cache_path)?,
        ProviderSet::from_config(&config)?,
        language,
    );

    let text = resolver
        .compile_weather_output(&point.location, &provider_name, period, &point.address)
        .await;
    println!("{}", plain(&text, html));

    Ok(())
}

fn pick_location(mut candidates: Vec<LocationPoint>) -> Result<LocationPoint> {
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    let addresses: Vec<String> = candidates.iter().map(|c| c.address.clone()).collect();
    let choice = Select::new("Several places match, pick one:", addresses).raw_prompt()?;

    Ok(candidates.swap_remove(choice.index))
}

fn providers() -> Result<()> {
    let config = runtime_config()?;
    let default = config.default_provider_id().ok();

    for id in ProviderId::all() {
        let status = if config.is_provider_configured(*id) {
            "configured"
        } else {
            "not configured"
        };
        let marker = if default == Some(*id) { " (default)" } else { "" };
        println!("{:<16}{status}{marker}", id.as_str());
    }

    Ok(())
}

async fn cache() -> Result<()> {
    let config = runtime_config()?;
    let path = config.cache_file_path()?;
    let cache = WeatherCache::open(&path)?;

    println!("Cache file: {}", path.display());
    println!("Records:    {}", cache.len().await?);

    Ok(())
}

/// Strip the chat markup unless it was asked for.
fn plain(text: &str, html: bool) -> String {
    if html {
        text.to_string()
    } else {
        text.replace("<b>", "").replace("</b>", "")
    }
}
