use url::Url;

use crate::model::Coordinate;

/// Default endpoint of the ClearSky weather service.
pub const DEFAULT_BASE_URL: &str = "https://cocoacasts.com/clearsky/";

/// Problems with the request configuration. These are configuration errors,
/// detected once when the builder is constructed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid weather service base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("weather service base URL '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("weather service API key is empty")]
    EmptyApiKey,

    #[error(transparent)]
    InvalidCoordinate(#[from] crate::model::InvalidCoordinate),
}

/// Builds request URLs of the form `{base}?api_key=..&lat=..&long=..`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequestBuilder {
    base_url: Url,
    api_key: String,
}

impl WeatherRequestBuilder {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, RequestError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RequestError::EmptyApiKey);
        }

        let base_url = Url::parse(base_url).map_err(|e| RequestError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RequestError::UnsupportedScheme(base_url.to_string()));
        }

        Ok(Self { base_url, api_key })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The request URL for `coordinate`. Latitude and longitude are written with
    /// the shortest representation that parses back to the same `f64`.
    pub fn build(&self, coordinate: Coordinate) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("lat", &coordinate.latitude().to_string())
            .append_pair("long", &coordinate.longitude().to_string());
        url
    }
}

/// One-shot form of [`WeatherRequestBuilder::build`].
pub fn build_request_url(
    latitude: f64,
    longitude: f64,
    api_key: &str,
    base_url: &str,
) -> Result<Url, RequestError> {
    let coordinate = Coordinate::new(latitude, longitude)?;
    Ok(WeatherRequestBuilder::new(base_url, api_key)?.build(coordinate))
}
