use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

use crate::{
    Config,
    model::{Coordinate, WeatherObservation},
    weather::{client::WeatherClient, decode::ResponseDecoder, request::WeatherRequestBuilder},
};

pub mod client;
pub mod decode;
pub mod request;

pub use decode::DecodeError;
pub use request::RequestError;

/// Why a weather fetch produced no observation. Callers that only care whether
/// data is available can treat every variant alike.
#[derive(Debug, thiserror::Error)]
pub enum WeatherFetchError {
    /// Connectivity, DNS, TLS or timeout failure.
    #[error("weather service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather service responded with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("weather service response could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

impl WeatherFetchError {
    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherFetchError::Transport(_) => "transport",
            WeatherFetchError::Http { .. } => "http",
            WeatherFetchError::Decode(_) => "decode",
        }
    }
}

/// Something that can produce current weather for a coordinate.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherObservation, WeatherFetchError>;
}

/// Construct the weather client described by `config`.
///
/// Fails when no API key is configured or the base URL is malformed.
pub fn client_from_config(config: &Config) -> anyhow::Result<WeatherClient> {
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for the weather service.\n\
                 Hint: run `wherecast configure` and enter your API key."
        )
    })?;

    let requests = WeatherRequestBuilder::new(config.base_url(), api_key).map_err(|e| {
        anyhow::anyhow!("{e}.\nHint: check `base_url` in {}", config_location())
    })?;

    let client = WeatherClient::with_timeout(requests, Duration::from_secs(config.timeouts.http_secs))?
        .with_decoder(ResponseDecoder::new(config.units.native));

    Ok(client)
}

fn config_location() -> String {
    Config::config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "the config file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = client_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("wherecast configure"));
    }

    #[test]
    fn client_from_config_errors_on_malformed_base_url() {
        let mut cfg = Config::default();
        cfg.api_key = Some("KEY".into());
        cfg.base_url = Some("::not a url::".into());

        let err = client_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("invalid weather service base URL"));
    }

    #[test]
    fn client_from_config_works_with_defaults_and_key() {
        let mut cfg = Config::default();
        cfg.api_key = Some("KEY".into());

        assert!(client_from_config(&cfg).is_ok());
    }

    #[tokio::test]
    async fn fetch_error_kinds_are_distinct() {
        // Nothing listens on port 1.
        let requests = WeatherRequestBuilder::new("http://127.0.0.1:1/clearsky/", "KEY").unwrap();
        let transport = WeatherClient::new(requests)
            .fetch(Coordinate::new(1.0, 2.0).unwrap())
            .await
            .unwrap_err();
        let http = WeatherFetchError::Http { status: 503, body: String::new() };
        let decode = WeatherFetchError::Decode(DecodeError::MissingField("latitude".into()));

        assert_eq!(transport.kind(), "transport");
        assert_eq!(http.kind(), "http");
        assert_eq!(decode.kind(), "decode");
    }
}
