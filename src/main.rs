//! grillwx CLI - query the weather layer from a shell
//!
//! A small front end over the weather service for poking the rig's cache:
//! current conditions, an hourly breakdown, or conditions at an arbitrary
//! instant. Configuration comes from the environment (DARKSKY_KEY,
//! LATITUDE, LONGITUDE, optional LOCAL_TIMEZONE).

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use grillwx::{DarkSkyClient, FileStore, TimeInput, WeatherConfig, WeatherService};

/// Weather acquisition and caching for the grill rig
#[derive(Parser, Debug)]
#[command(name = "grillwx")]
#[command(about = "Cached weather queries against the metered weather API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print current conditions
    Current,
    /// Print the hourly breakdown for a date or instant (default: now)
    ///
    /// TIME is either YYYY-MM-DD or an RFC 3339 instant with an explicit
    /// offset; a timestamp without offset information is rejected.
    Hourly {
        #[arg(value_name = "TIME")]
        time: Option<String>,
    },
    /// Print conditions at an instant or date
    At {
        #[arg(value_name = "TIME")]
        time: String,
    },
}

fn parse_input(time: Option<&str>) -> Result<TimeInput, Box<dyn std::error::Error>> {
    match time {
        None => Ok(TimeInput::Now),
        Some(s) => Ok(TimeInput::parse(s)?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = WeatherConfig::from_env()?;
    let fetcher = DarkSkyClient::new(&config)?;
    let store = FileStore::new().ok_or("cannot determine a cache directory for this platform")?;
    let service = WeatherService::new(&config, fetcher, store);

    match cli.command {
        Command::Current => {
            let raw = service.current().await?;
            match raw.temperature() {
                Some(t) => println!("{:.1}", t),
                None => println!("current conditions carry no temperature field"),
            }
        }
        Command::At { time } => {
            let input = parse_input(Some(&time))?;
            let raw = service.weather_at(input).await?;
            println!("{}", serde_json::to_string_pretty(&raw.currently)?);
        }
        Command::Hourly { time } => {
            let input = parse_input(time.as_deref())?;
            let table = service.hourly(input).await?;
            let temperatures = table.column("temperature");
            for (i, instant) in table.times.iter().enumerate() {
                let temp = temperatures
                    .and_then(|col| col.get(i))
                    .and_then(|v| v.as_f64());
                match temp {
                    Some(t) => println!("{}  {:.1}", instant.to_rfc3339(), t),
                    None => println!("{}  -", instant.to_rfc3339()),
                }
            }
        }
    }

    Ok(())
}
