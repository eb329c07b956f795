use serde::{Deserialize, Serialize};

/// Measurement system applied to temperature and wind fields in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin / metres per second; the upstream default.
    #[default]
    Standard,
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Standard, Units::Metric, Units::Imperial]
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: standard, metric, imperial."
            )),
        }
    }
}

/// Caller-supplied identifier of a geographic location.
///
/// Exactly one way of naming the location per call, by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// City name, optionally suffixed with an ISO country code ("London,GB").
    City(String),
    /// Geographic point; latitude in [-90, 90], longitude in [-180, 180].
    /// Ranges are not validated here; the upstream rejects values outside
    /// them.
    Coordinates { lat: f64, lon: f64 },
    /// Numeric OpenWeatherMap city id.
    CityId(u64),
    /// Postal code, optionally suffixed with a country code ("94040,us").
    Zip(String),
}

impl Location {
    /// Query-string pairs selecting this location in an API request.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Location::City(q) => vec![("q", q.clone())],
            Location::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
            Location::CityId(id) => vec![("id", id.to_string())],
            Location::Zip(zip) => vec![("zip", zip.clone())],
        }
    }

    /// Stable token identifying this selector inside a cache key.
    pub(crate) fn cache_token(&self) -> String {
        match self {
            Location::City(q) => format!("q:{q}"),
            Location::Coordinates { lat, lon } => format!("lat:{lat},lon:{lon}"),
            Location::CityId(id) => format!("id:{id}"),
            Location::Zip(zip) => format!("zip:{zip}"),
        }
    }
}

/// Which forecast variant is requested.
///
/// The default kind is served from the standard host; the other three are
/// pro-tier endpoints on a separate host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ForecastKind {
    /// 3-hour step over 5 days; the free-tier default.
    #[default]
    ThreeHour,
    Daily,
    Hourly,
    /// 30-day climate forecast.
    Climate,
}

impl ForecastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastKind::ThreeHour => "3hr",
            ForecastKind::Daily => "daily",
            ForecastKind::Hourly => "hourly",
            ForecastKind::Climate => "climate",
        }
    }

    pub const fn all() -> &'static [ForecastKind] {
        &[
            ForecastKind::ThreeHour,
            ForecastKind::Daily,
            ForecastKind::Hourly,
            ForecastKind::Climate,
        ]
    }

    /// URL path segment after `/forecast/`; empty for the default kind.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ForecastKind::ThreeHour => "",
            ForecastKind::Daily => "daily",
            ForecastKind::Hourly => "hourly",
            ForecastKind::Climate => "climate",
        }
    }

    /// Daily, hourly and climate forecasts are served from the pro host.
    pub fn uses_pro_host(&self) -> bool {
        !matches!(self, ForecastKind::ThreeHour)
    }
}

impl std::fmt::Display for ForecastKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ForecastKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "3hr" => Ok(ForecastKind::ThreeHour),
            "daily" => Ok(ForecastKind::Daily),
            "hourly" => Ok(ForecastKind::Hourly),
            "climate" => Ok(ForecastKind::Climate),
            _ => Err(anyhow::anyhow!(
                "Unknown forecast kind '{value}'. Supported kinds: 3hr, daily, hourly, climate."
            )),
        }
    }
}
