use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::model::{Coordinate, WeatherObservation};

use super::{
    WeatherFetchError, WeatherSource,
    decode::ResponseDecoder,
    request::WeatherRequestBuilder,
};

/// HTTP client for the weather service. Performs exactly one round trip per
/// [`WeatherClient::fetch`]; nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    requests: WeatherRequestBuilder,
    decoder: ResponseDecoder,
}

impl WeatherClient {
    pub fn new(requests: WeatherRequestBuilder) -> Self {
        Self::with_http_client(requests, Client::new())
    }

    /// Client whose requests give up after `timeout`.
    pub fn with_timeout(
        requests: WeatherRequestBuilder,
        timeout: Duration,
    ) -> Result<Self, WeatherFetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(requests, http))
    }

    pub fn with_http_client(requests: WeatherRequestBuilder, http: Client) -> Self {
        Self { http, requests, decoder: ResponseDecoder::default() }
    }

    pub fn with_decoder(mut self, decoder: ResponseDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    #[instrument(skip(self), fields(lat = coordinate.latitude(), long = coordinate.longitude()))]
    pub async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherObservation, WeatherFetchError> {
        let url = self.requests.build(coordinate);
        debug!(host = url.host_str().unwrap_or_default(), "requesting current weather");

        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.bytes().await?;

        if !status.is_success() {
            let body = truncate_body(&String::from_utf8_lossy(&body));
            warn!(%status, %body, "weather service returned an error status");
            return Err(WeatherFetchError::Http { status: status.as_u16(), body });
        }

        let observation = self.decoder.decode(&body).inspect_err(|e| {
            warn!(error = %e, "weather service response could not be decoded");
        })?;

        if !observation.is_at(coordinate) {
            warn!(
                echoed_lat = observation.latitude(),
                echoed_long = observation.longitude(),
                "weather service echoed a different location than requested"
            );
        }

        Ok(observation)
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherObservation, WeatherFetchError> {
        WeatherClient::fetch(self, coordinate).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
