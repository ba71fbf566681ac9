use tracing::{error, info, instrument, warn};

use crate::{
    alert::Alert,
    location::{LocationNotice, LocationProvider, LocationResolver},
    model::{Coordinate, LocationResolution, WeatherObservation},
    weather::{WeatherFetchError, WeatherSource},
};

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("not authorized to request location")]
    LocationDenied,

    #[error("failed to request location")]
    LocationFailed,

    #[error("no weather data available: {0}")]
    NoWeatherData(#[source] WeatherFetchError),
}

impl ResolutionError {
    pub fn alert(&self) -> Alert {
        match self {
            ResolutionError::LocationDenied => Alert::NotAuthorizedToRequestLocation,
            ResolutionError::LocationFailed => Alert::FailedToRequestLocation,
            ResolutionError::NoWeatherData(_) => Alert::NoWeatherDataAvailable,
        }
    }
}

impl From<LocationNotice> for ResolutionError {
    fn from(notice: LocationNotice) -> Self {
        match notice {
            LocationNotice::NotAuthorized => ResolutionError::LocationDenied,
            LocationNotice::FailedToRequestLocation => ResolutionError::LocationFailed,
        }
    }
}

/// Weather for the resolved location.
#[derive(Debug)]
pub struct CurrentWeather {
    pub observation: WeatherObservation,
    pub location: LocationResolution,
    /// Set when the location fell back because of a denial or failure the
    /// user should hear about.
    pub warning: Option<ResolutionError>,
}

impl CurrentWeather {
    pub fn alert(&self) -> Option<Alert> {
        self.warning.as_ref().map(ResolutionError::alert)
    }
}

/// Sequences location resolution and the weather fetch. This is the only
/// entry point a front end needs.
#[derive(Debug)]
pub struct WeatherResolutionController<P, W> {
    resolver: LocationResolver<P>,
    weather: W,
}

impl<P: LocationProvider, W: WeatherSource> WeatherResolutionController<P, W> {
    pub fn new(resolver: LocationResolver<P>, weather: W) -> Self {
        Self { resolver, weather }
    }

    pub fn resolver(&self) -> &LocationResolver<P> {
        &self.resolver
    }

    /// Resolve the current location, then fetch weather for it.
    ///
    /// Location problems never fail the call: the fallback coordinate is used
    /// and the problem is reported in [`CurrentWeather::warning`]. A failed
    /// fetch is [`ResolutionError::NoWeatherData`] and replaces any location
    /// warning, so the caller has at most one thing to show.
    pub async fn resolve_current_weather(&mut self) -> Result<CurrentWeather, ResolutionError> {
        let outcome = self.resolver.resolve().await;
        let warning = outcome.notice.map(ResolutionError::from);

        match self.fetch(outcome.resolution.coordinate).await {
            Ok(observation) => {
                info!(source = %outcome.resolution.source, summary = observation.summary(), "current weather resolved");
                Ok(CurrentWeather { observation, location: outcome.resolution, warning })
            }
            Err(err) => {
                if let Some(superseded) = &warning {
                    warn!(%superseded, "location warning superseded by weather failure");
                }
                Err(err)
            }
        }
    }

    /// Weather for an arbitrary coordinate, bypassing location resolution.
    pub async fn weather_at(&self, coordinate: Coordinate) -> Result<WeatherObservation, ResolutionError> {
        self.fetch(coordinate).await
    }

    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherObservation, ResolutionError> {
        fetch_weather_at(&self.weather, coordinate).await
    }
}

/// Weather for a selected coordinate, for front ends that have no location
/// service at all. Fetch failures collapse into
/// [`ResolutionError::NoWeatherData`] as in a full cycle.
#[instrument(skip(weather))]
pub async fn fetch_weather_at<W: WeatherSource + ?Sized>(
    weather: &W,
    coordinate: Coordinate,
) -> Result<WeatherObservation, ResolutionError> {
    weather.fetch(coordinate).await.map_err(|e| {
        error!(kind = e.kind(), error = %e, "weather fetch failed");
        ResolutionError::NoWeatherData(e)
    })
}
