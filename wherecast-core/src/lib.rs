//! Core library for the `wherecast` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - The location resolver state machine and its platform abstraction
//! - The weather service request builder, response decoder and client
//! - The controller that sequences location resolution and weather fetching
//!
//! It is used by `wherecast-cli`, but can also back other front ends.

pub mod alert;
pub mod config;
pub mod controller;
pub mod location;
pub mod model;
pub mod weather;

pub use alert::Alert;
pub use config::Config;
pub use controller::{
    CurrentWeather, ResolutionError, WeatherResolutionController, fetch_weather_at,
};
pub use location::{
    LocationAuthorization, LocationEvent, LocationNotice, LocationProvider, LocationResolver,
};
pub use model::{
    Coordinate, Epoch, InvalidCoordinate, LocationResolution, LocationSource, Temperature,
    TemperatureUnit, WeatherObservation,
};
pub use weather::{
    DecodeError, RequestError, WeatherFetchError, WeatherSource, client::WeatherClient,
    client_from_config,
};
