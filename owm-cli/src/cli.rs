use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use owm_core::{
    ConnectOptions, ForecastKind, ForecastOpts, Location, QueryOpts, Secrets, Units,
    WeatherConnection,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "owm", version, about = "OpenWeatherMap connection CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Location flags shared by the query subcommands.
///
/// The first populated flag wins, in the order city, coordinates, city id,
/// zip. With none given, the call is a no-op printing null.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// City name, e.g. "London" or "London,GB".
    #[arg(long)]
    pub city: Option<String>,

    /// Latitude; must be paired with --lon.
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude; must be paired with --lat.
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,

    /// Numeric OpenWeatherMap city id.
    #[arg(long)]
    pub id: Option<u64>,

    /// Postal code, e.g. "94040,us".
    #[arg(long)]
    pub zip: Option<String>,
}

impl LocationArgs {
    fn resolve(&self) -> Option<Location> {
        if let Some(city) = &self.city {
            Some(Location::City(city.clone()))
        } else if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            Some(Location::Coordinates { lat, lon })
        } else if let Some(id) = self.id {
            Some(Location::CityId(id))
        } else {
            self.zip.clone().map(Location::Zip)
        }
    }
}

/// Display and caching flags shared by the query subcommands.
#[derive(Debug, Args)]
pub struct DisplayArgs {
    /// Measurement units: standard, metric or imperial.
    #[arg(long)]
    pub units: Option<String>,

    /// Language code, e.g. "en" or "de".
    #[arg(long)]
    pub lang: Option<String>,

    /// Cache lifetime for this call, in seconds.
    #[arg(long)]
    pub ttl: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap AppID used by later calls.
    Configure,

    /// Show current weather for a location.
    Current {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Show a weather forecast for a location.
    Forecast {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        display: DisplayArgs,

        /// Forecast kind: 3hr, daily, hourly or climate.
        #[arg(long, default_value = "3hr")]
        kind: String,

        /// Limit the number of returned entries.
        #[arg(long)]
        cnt: Option<u32>,
    },

    /// Print the CDN URL for a weather icon id.
    Icon {
        /// Icon id from a weather response, e.g. "10d".
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Current { location, display } => {
                let conn = WeatherConnection::connect(ConnectOptions::default())?;
                let opts = query_opts(&display)?;

                let body = conn.current(location.resolve(), opts).await?;
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(())
            }
            Command::Forecast { location, display, kind, cnt } => {
                let conn = WeatherConnection::connect(ConnectOptions::default())?;
                let QueryOpts { units, lang, ttl } = query_opts(&display)?;
                let opts = ForecastOpts {
                    kind: ForecastKind::try_from(kind.as_str())?,
                    cnt,
                    units,
                    lang,
                    ttl,
                };

                let body = conn.forecast(location.resolve(), opts).await?;
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(())
            }
            Command::Icon { id } => {
                println!("{}", WeatherConnection::icon_url(&id));
                Ok(())
            }
        }
    }
}

fn query_opts(display: &DisplayArgs) -> anyhow::Result<QueryOpts> {
    let units = display.units.as_deref().map(Units::try_from).transpose()?;

    Ok(QueryOpts {
        units,
        lang: display.lang.clone(),
        ttl: display.ttl.map(Duration::from_secs),
    })
}

fn configure() -> anyhow::Result<()> {
    let mut secrets = Secrets::load()?;

    let appid = inquire::Password::new("OpenWeatherMap AppID:")
        .without_confirmation()
        .prompt()
        .context("Failed to read AppID from prompt")?;

    secrets.appid = Some(appid);
    secrets.save()?;

    println!("Saved AppID to {}", Secrets::secrets_file_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_location() -> LocationArgs {
        LocationArgs { city: None, lat: None, lon: None, id: None, zip: None }
    }

    #[test]
    fn city_wins_over_other_selectors() {
        let args = LocationArgs {
            city: Some("London".to_string()),
            lat: Some(51.51),
            lon: Some(-0.13),
            id: Some(2643743),
            zip: Some("94040,us".to_string()),
        };

        assert_eq!(args.resolve(), Some(Location::City("London".to_string())));
    }

    #[test]
    fn coordinates_win_over_id_and_zip() {
        let args = LocationArgs {
            lat: Some(51.51),
            lon: Some(-0.13),
            id: Some(2643743),
            zip: Some("94040,us".to_string()),
            ..no_location()
        };

        assert_eq!(
            args.resolve(),
            Some(Location::Coordinates { lat: 51.51, lon: -0.13 })
        );
    }

    #[test]
    fn no_flags_resolve_to_no_selector() {
        assert_eq!(no_location().resolve(), None);
    }
}
