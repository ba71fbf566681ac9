use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use inquire::{CustomType, Password, PasswordDisplayMode, Text};
use wherecast_core::{
    Config, Coordinate, CurrentWeather, LocationResolver, TemperatureUnit, WeatherObservation,
    WeatherResolutionController, client_from_config, fetch_weather_at,
    location::event_channel,
    weather::request::{DEFAULT_BASE_URL, WeatherRequestBuilder},
};

use crate::location::TerminalLocationProvider;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wherecast", version, about = "Current weather for where you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, service URL, fallback and device locations.
    Configure,

    /// Show current weather for your location.
    #[command(allow_negative_numbers = true)]
    Show {
        /// Device latitude; overrides the configured device location.
        #[arg(long, requires = "long")]
        lat: Option<f64>,

        /// Device longitude; overrides the configured device location.
        #[arg(long, requires = "lat")]
        long: Option<f64>,

        /// Never ask for location permission; an undecided permission falls back silently.
        #[arg(long)]
        no_prompt: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show weather at a chosen coordinate.
    #[command(allow_negative_numbers = true)]
    At {
        latitude: f64,
        longitude: f64,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Temperature unit to display; defaults to `units.display` from the config.
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Celsius => TemperatureUnit::Celsius,
            UnitArg::Fahrenheit => TemperatureUnit::Fahrenheit,
            UnitArg::Kelvin => TemperatureUnit::Kelvin,
        }
    }
}

impl OutputArgs {
    fn unit(&self, config: &Config) -> TemperatureUnit {
        self.unit.map(Into::into).unwrap_or(config.units.display)
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, long, no_prompt, output } => {
                let device = match (lat, long) {
                    (Some(lat), Some(long)) => Some(Coordinate::new(lat, long)?),
                    _ => None,
                };
                show(device, !no_prompt, &output).await
            }
            Command::At { latitude, longitude, output } => {
                at(Coordinate::new(latitude, longitude)?, &output).await
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("Weather service API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    let current_base = config.base_url().to_string();
    let base_url = Text::new("Weather service URL:").with_default(&current_base).prompt()?;
    WeatherRequestBuilder::new(&base_url, api_key.as_str())
        .context("The weather service URL is not usable")?;

    let latitude = CustomType::<f64>::new("Fallback latitude:")
        .with_default(config.fallback.latitude())
        .with_error_message("Please enter a number")
        .prompt()?;
    let longitude = CustomType::<f64>::new("Fallback longitude:")
        .with_default(config.fallback.longitude())
        .with_error_message("Please enter a number")
        .prompt()?;
    let fallback = Coordinate::new(latitude, longitude)?;

    let current_device = config
        .location
        .device
        .map(|c| format!("{},{}", c.latitude(), c.longitude()))
        .unwrap_or_default();
    let device = Text::new("Device location as `lat,long` (empty if unknown):")
        .with_default(&current_device)
        .prompt()?;

    config.set_api_key(api_key);
    config.base_url = (base_url != DEFAULT_BASE_URL).then_some(base_url);
    config.fallback = fallback;
    config.location.device = parse_coordinate(&device)?;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(device: Option<Coordinate>, prompt: bool, output: &OutputArgs) -> Result<()> {
    let mut config = Config::load()?;
    let client = client_from_config(&config)?;

    let (tx, rx) = event_channel();
    let provider =
        TerminalLocationProvider::new(config.location.permission, device.or(config.location.device), tx)
            .interactive(prompt);
    let resolver =
        LocationResolver::new(provider, rx, config.fallback).with_timeouts(config.timeouts.resolver());
    let mut controller = WeatherResolutionController::new(resolver, client);

    let result = controller.resolve_current_weather().await;

    let decided = controller.resolver().provider().permission();
    if decided != config.location.permission {
        config.location.permission = decided;
        config.save()?;
    }

    let current = match result {
        Ok(current) => current,
        Err(err) => {
            eprintln!("{}", err.alert());
            return Err(err.into());
        }
    };

    if let Some(alert) = current.alert() {
        eprintln!("{alert}");
    }

    let unit = output.unit(&config);
    if output.json {
        print_json(&current.observation, Some(&current), unit)
    } else {
        print_current(&current, unit);
        Ok(())
    }
}

async fn at(coordinate: Coordinate, output: &OutputArgs) -> Result<()> {
    let config = Config::load()?;
    let client = client_from_config(&config)?;

    let observation = match fetch_weather_at(&client, coordinate).await {
        Ok(observation) => observation,
        Err(err) => {
            eprintln!("{}", err.alert());
            return Err(err.into());
        }
    };

    let unit = output.unit(&config);
    if output.json {
        print_json(&observation, None, unit)
    } else {
        println!("Selected location: {coordinate}");
        print_observation(&observation, unit);
        Ok(())
    }
}

fn print_current(current: &CurrentWeather, unit: TemperatureUnit) {
    println!(
        "Current location ({}): {}",
        current.location.source, current.location.coordinate
    );
    print_observation(&current.observation, unit);
}

fn print_observation(observation: &WeatherObservation, unit: TemperatureUnit) {
    println!("{}", observation.headline(unit));
    let observed = match observation.observed_at() {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M %Z").to_string(),
        None => format!("unix time {}", observation.observed_epoch()),
    };
    println!("Observed at {observed} ({})", observation.icon());
}

fn print_json(
    observation: &WeatherObservation,
    current: Option<&CurrentWeather>,
    unit: TemperatureUnit,
) -> Result<()> {
    let value = serde_json::json!({
        "location": current.map(|c| c.location),
        "alert": current.and_then(CurrentWeather::alert),
        "temperature": {
            "value": observation.temperature().in_unit(unit),
            "unit": unit,
        },
        "observed_at": observation.observed_at(),
        "observation": observation,
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Parses `lat,long`; an empty string means no coordinate.
fn parse_coordinate(input: &str) -> Result<Option<Coordinate>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (lat, long) = input
        .split_once(',')
        .with_context(|| format!("Expected `lat,long`, got '{input}'"))?;

    let lat: f64 = lat.trim().parse().with_context(|| format!("Invalid latitude '{lat}'"))?;
    let long: f64 = long.trim().parse().with_context(|| format!("Invalid longitude '{long}'"))?;

    Ok(Some(Coordinate::new(lat, long)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show_with_negative_coordinates() {
        let cli = Cli::try_parse_from(["wherecast", "show", "--lat", "-33.86", "--long", "151.2", "--json"])
            .unwrap();

        match cli.command {
            Command::Show { lat, long, output, no_prompt } => {
                assert_eq!(lat, Some(-33.86));
                assert_eq!(long, Some(151.2));
                assert!(output.json);
                assert!(!no_prompt);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn show_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["wherecast", "show", "--lat", "10"]).is_err());
    }

    #[test]
    fn parses_at_with_unit() {
        let cli =
            Cli::try_parse_from(["wherecast", "at", "-12.5", "-77.0", "--unit", "kelvin"]).unwrap();

        match cli.command {
            Command::At { latitude, longitude, output } => {
                assert_eq!(latitude, -12.5);
                assert_eq!(longitude, -77.0);
                assert_eq!(output.unit(&Config::default()), TemperatureUnit::Kelvin);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unit_defaults_to_config_display_unit() {
        let output = OutputArgs { unit: None, json: false };
        assert_eq!(output.unit(&Config::default()), TemperatureUnit::Celsius);
    }

    #[test]
    fn parse_coordinate_accepts_pairs_and_empty() {
        assert_eq!(parse_coordinate("").unwrap(), None);
        assert_eq!(
            parse_coordinate(" 48.85 , 2.35 ").unwrap(),
            Some(Coordinate::new(48.85, 2.35).unwrap())
        );
    }

    #[test]
    fn parse_coordinate_rejects_garbage() {
        assert!(parse_coordinate("48.85").is_err());
        assert!(parse_coordinate("north,east").is_err());
        assert!(parse_coordinate("100,0").is_err());
    }
}
