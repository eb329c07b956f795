//! The OpenWeatherMap connection adapter.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheKey, MemoryCache, ResponseCache};
use crate::error::WeatherError;
use crate::model::{ForecastKind, Location, Units};
use crate::secrets::Secrets;

/// Standard host, serving current weather and the default forecast kind.
pub const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Pro-tier host, serving the daily, hourly and climate forecast kinds.
pub const PRO_URL: &str = "https://pro.openweathermap.org/data/2.5";

const ICON_HOST: &str = "https://openweathermap.org";

/// Options accepted by [`WeatherConnection::connect`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Explicit AppID; when absent (or empty) the secrets file is consulted.
    pub appid: Option<String>,
    /// Initial measurement units; defaults to [`Units::Standard`].
    pub units: Option<Units>,
    /// Initial language code; defaults to "en".
    pub lang: Option<String>,
    /// Override for the standard host, mainly for tests.
    pub base_url: Option<String>,
    /// Override for the pro host, mainly for tests.
    pub pro_url: Option<String>,
}

/// Per-call overrides for [`WeatherConnection::current`].
///
/// Absent fields fall back to the connection's current preferences; `ttl`
/// is handed to the cache layer as-is, `None` meaning its default policy.
#[derive(Debug, Clone, Default)]
pub struct QueryOpts {
    pub units: Option<Units>,
    pub lang: Option<String>,
    pub ttl: Option<Duration>,
}

/// Per-call overrides for [`WeatherConnection::forecast`].
#[derive(Debug, Clone, Default)]
pub struct ForecastOpts {
    pub kind: ForecastKind,
    /// Limits the number of returned entries when present.
    pub cnt: Option<u32>,
    pub units: Option<Units>,
    pub lang: Option<String>,
    pub ttl: Option<Duration>,
}

/// A reusable connection to the OpenWeatherMap API.
///
/// Owns its HTTP client and credential, plus two mutable display
/// preferences. One logical caller per instance: nothing here is locked, so
/// concurrent mutation of preferences is the caller's problem to serialize.
#[derive(Debug)]
pub struct WeatherConnection {
    appid: String,
    units: Units,
    lang: String,
    base_url: String,
    pro_url: String,
    http: Client,
    cache: Arc<dyn ResponseCache>,
}

impl WeatherConnection {
    /// Open a connection with an in-process [`MemoryCache`].
    ///
    /// The credential comes from `options.appid` or, failing that, the
    /// secrets file; with neither, construction fails with
    /// [`WeatherError::MissingCredential`].
    pub fn connect(options: ConnectOptions) -> Result<Self, WeatherError> {
        Self::connect_with_cache(options, Arc::new(MemoryCache::new()))
    }

    /// Open a connection delegating response caching to `cache`.
    pub fn connect_with_cache(
        options: ConnectOptions,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self, WeatherError> {
        let appid = match options.appid.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let secrets = Secrets::load().map_err(WeatherError::Secrets)?;
                appid_from_secrets(&secrets)?
            }
        };

        Ok(Self {
            appid,
            units: options.units.unwrap_or_default(),
            lang: options.lang.unwrap_or_else(|| "en".to_string()),
            base_url: options.base_url.unwrap_or_else(|| BASE_URL.to_string()),
            pro_url: options.pro_url.unwrap_or_else(|| PRO_URL.to_string()),
            http: Client::new(),
            cache,
        })
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Change the connection-level units; takes effect on the next call.
    /// Already-cached results are untouched.
    pub fn set_units(&mut self, units: Units) {
        self.units = units;
    }

    /// Change the connection-level language; takes effect on the next call.
    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    /// Drop the HTTP client and open a fresh one. Preferences and the
    /// credential are untouched.
    pub fn reset(&mut self) {
        self.http = Client::new();
    }

    /// Current weather for a location.
    ///
    /// `None` location is a no-op: null comes back and no request is made.
    /// The JSON body is returned verbatim, including upstream error payloads
    /// (a non-200 `cod` field); one GET on cache miss, zero on hit.
    pub async fn current(
        &self,
        location: Option<Location>,
        opts: QueryOpts,
    ) -> Result<Value, WeatherError> {
        let Some(location) = location else {
            debug!("current: no location selector given, returning null");
            return Ok(Value::Null);
        };

        let units = opts.units.unwrap_or(self.units);
        let lang = opts.lang.as_deref().unwrap_or(&self.lang);

        let url = format!("{}/weather", self.base_url);
        let key = CacheKey::new("current", &[&location.cache_token(), units.as_str(), lang]);

        let mut query = location.query_pairs();
        query.push(("appid", self.appid.clone()));
        query.push(("units", units.as_str().to_string()));
        query.push(("lang", lang.to_string()));

        self.fetch_cached(key, opts.ttl, url, query).await
    }

    /// Weather forecast for a location.
    ///
    /// `opts.kind` picks the host and path segment; `opts.cnt` caps the
    /// number of entries. Same selector, override, caching and passthrough
    /// contract as [`Self::current`].
    pub async fn forecast(
        &self,
        location: Option<Location>,
        opts: ForecastOpts,
    ) -> Result<Value, WeatherError> {
        let Some(location) = location else {
            debug!("forecast: no location selector given, returning null");
            return Ok(Value::Null);
        };

        let units = opts.units.unwrap_or(self.units);
        let lang = opts.lang.as_deref().unwrap_or(&self.lang);

        let host = if opts.kind.uses_pro_host() {
            &self.pro_url
        } else {
            &self.base_url
        };
        // The default kind leaves the segment empty; the upstream accepts
        // the resulting trailing slash.
        let url = format!("{host}/forecast/{}", opts.kind.path_segment());

        let cnt = opts.cnt.map(|n| n.to_string()).unwrap_or_default();
        let key = CacheKey::new(
            "forecast",
            &[
                opts.kind.as_str(),
                &location.cache_token(),
                units.as_str(),
                lang,
                &cnt,
            ],
        );

        let mut query = location.query_pairs();
        query.push(("appid", self.appid.clone()));
        query.push(("units", units.as_str().to_string()));
        query.push(("lang", lang.to_string()));
        if let Some(n) = opts.cnt {
            query.push(("cnt", n.to_string()));
        }

        self.fetch_cached(key, opts.ttl, url, query).await
    }

    /// CDN URL for a weather icon id, e.g. "10d". Pure formatting, no I/O.
    pub fn icon_url(icon_id: &str) -> String {
        format!("{ICON_HOST}/img/wn/{icon_id}@2x.png")
    }

    async fn fetch_cached(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        url: String,
        query: Vec<(&'static str, String)>,
    ) -> Result<Value, WeatherError> {
        let http = self.http.clone();
        debug!(key = key.as_str(), "dispatching through response cache");

        self.cache
            .get_or_compute(
                key,
                ttl,
                Box::new(move || {
                    Box::pin(async move {
                        debug!(%url, "cache miss, querying upstream");
                        let res = http.get(&url).query(&query).send().await?;
                        // Upstream error payloads (non-200 `cod` bodies) pass
                        // through untouched; callers inspect the JSON.
                        Ok(res.json::<Value>().await?)
                    })
                }),
            )
            .await
    }
}

fn appid_from_secrets(secrets: &Secrets) -> Result<String, WeatherError> {
    secrets
        .appid()
        .map(str::to_owned)
        .ok_or(WeatherError::MissingCredential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_when_secrets_empty() {
        let err = appid_from_secrets(&Secrets::default()).unwrap_err();
        assert!(matches!(err, WeatherError::MissingCredential));
    }

    #[test]
    fn appid_resolves_from_secrets() {
        let secrets = Secrets { appid: Some("KEY".to_string()) };
        let appid = appid_from_secrets(&secrets).expect("appid must resolve");
        assert_eq!(appid, "KEY");
    }

    #[test]
    fn explicit_appid_skips_secrets() {
        let conn = WeatherConnection::connect(ConnectOptions {
            appid: Some("KEY".to_string()),
            ..ConnectOptions::default()
        })
        .expect("explicit AppID must be enough");

        assert_eq!(conn.units(), Units::Standard);
        assert_eq!(conn.lang(), "en");
    }

    #[test]
    fn setters_update_preferences() {
        let mut conn = WeatherConnection::connect(ConnectOptions {
            appid: Some("KEY".to_string()),
            ..ConnectOptions::default()
        })
        .expect("explicit AppID must be enough");

        conn.set_units(Units::Metric);
        conn.set_lang("de");

        assert_eq!(conn.units(), Units::Metric);
        assert_eq!(conn.lang(), "de");
    }

    #[test]
    fn icon_url_formats_cdn_template() {
        assert_eq!(
            WeatherConnection::icon_url("10d"),
            "https://openweathermap.org/img/wn/10d@2x.png"
        );
    }
}
