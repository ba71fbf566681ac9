//! Location acquisition.
//!
//! The platform location service is modelled as a [`LocationProvider`] that
//! accepts requests, plus a stream of [`LocationEvent`]s delivered over a
//! channel. [`LocationResolver`] consumes both and settles on exactly one
//! coordinate per cycle.

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use tokio::sync::mpsc;

use crate::model::Coordinate;

pub mod resolver;

#[cfg(test)]
pub(crate) mod fake;

pub use resolver::{LocationResolver, ResolutionOutcome, ResolverState};

/// Location permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationAuthorization {
    #[default]
    Undetermined,
    #[serde(rename = "when_in_use")]
    WhenInUseGranted,
    #[serde(rename = "always")]
    AlwaysGranted,
    Denied,
    Restricted,
}

impl LocationAuthorization {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationAuthorization::Undetermined => "undetermined",
            LocationAuthorization::WhenInUseGranted => "when_in_use",
            LocationAuthorization::AlwaysGranted => "always",
            LocationAuthorization::Denied => "denied",
            LocationAuthorization::Restricted => "restricted",
        }
    }

    pub fn is_granted(&self) -> bool {
        AuthorizationPolicy::for_status(*self) == AuthorizationPolicy::Proceed
    }
}

impl fmt::Display for LocationAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resolver does once an authorization status is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    /// Request a location fix.
    Proceed,
    /// Use the fallback coordinate and tell the user location is not authorized.
    FallbackWithNotice,
    /// Use the fallback coordinate without telling the user.
    FallbackSilently,
}

impl AuthorizationPolicy {
    pub fn for_status(status: LocationAuthorization) -> Self {
        match status {
            LocationAuthorization::WhenInUseGranted | LocationAuthorization::AlwaysGranted => {
                AuthorizationPolicy::Proceed
            }
            LocationAuthorization::Denied | LocationAuthorization::Restricted => {
                AuthorizationPolicy::FallbackWithNotice
            }
            LocationAuthorization::Undetermined => AuthorizationPolicy::FallbackSilently,
        }
    }
}

/// Something the platform location service reports asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    AuthorizationChanged(LocationAuthorization),
    /// A batch of fixes, most relevant first. May be empty.
    LocationUpdate(Vec<Coordinate>),
    LocationFailed(String),
}

/// User-facing notices raised while resolving a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationNotice {
    NotAuthorized,
    FailedToRequestLocation,
}

/// Requests the resolver can make of the platform location service. Results
/// arrive later as [`LocationEvent`]s on the channel the provider was given.
///
/// Requests must return promptly. Anything that waits on the user or the
/// hardware belongs on another thread or task, so the resolver's timeouts
/// can run.
pub trait LocationProvider: Send {
    fn authorization_status(&self) -> LocationAuthorization;

    /// Ask the user for permission. Answered with
    /// [`LocationEvent::AuthorizationChanged`].
    fn request_authorization(&mut self);

    /// Ask for a single fix. Answered with [`LocationEvent::LocationUpdate`]
    /// or [`LocationEvent::LocationFailed`].
    fn request_location(&mut self);

    fn stop_updating_location(&mut self);
}

pub type LocationEventSender = mpsc::UnboundedSender<LocationEvent>;
pub type LocationEventReceiver = mpsc::UnboundedReceiver<LocationEvent>;

/// Channel connecting a provider (sender side) to a resolver (receiver side).
pub fn event_channel() -> (LocationEventSender, LocationEventReceiver) {
    mpsc::unbounded_channel()
}

/// How long the resolver waits at each suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverTimeouts {
    pub authorization: Duration,
    pub location_fix: Duration,
}

impl Default for ResolverTimeouts {
    fn default() -> Self {
        Self { authorization: Duration::from_secs(60), location_fix: Duration::from_secs(30) }
    }
}
