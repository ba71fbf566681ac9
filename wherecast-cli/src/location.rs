use inquire::Confirm;
use std::{
    sync::{Arc, Mutex, PoisonError},
    thread,
};
use tracing::{debug, warn};
use wherecast_core::{
    Coordinate, LocationAuthorization, LocationEvent, LocationProvider,
    location::LocationEventSender,
};

/// Asks the user for location permission. Blocks until answered.
pub type PermissionPrompt = fn() -> LocationAuthorization;

/// Location service for a terminal session.
///
/// Permission is a saved yes/no answer, asked for once. The "device fix" is a
/// coordinate given on the command line or stored in the config.
#[derive(Debug)]
pub struct TerminalLocationProvider {
    permission: Arc<Mutex<LocationAuthorization>>,
    device: Option<Coordinate>,
    events: LocationEventSender,
    interactive: bool,
    prompt: PermissionPrompt,
}

impl TerminalLocationProvider {
    pub fn new(
        permission: LocationAuthorization,
        device: Option<Coordinate>,
        events: LocationEventSender,
    ) -> Self {
        Self {
            permission: Arc::new(Mutex::new(permission)),
            device,
            events,
            interactive: true,
            prompt: confirm_permission,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    #[cfg(test)]
    fn with_prompt(mut self, prompt: PermissionPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Current permission, including any answer given during this session.
    pub fn permission(&self) -> LocationAuthorization {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: LocationEvent) {
        if self.events.send(event).is_err() {
            debug!("location resolver went away; dropping event");
        }
    }

    /// Runs the prompt on its own thread and reports the answer as an event,
    /// so the resolver's authorization timeout covers the time spent waiting
    /// for the user.
    fn ask_in_background(&self) {
        let permission = Arc::clone(&self.permission);
        let events = self.events.clone();
        let prompt = self.prompt;

        let spawned = thread::Builder::new().name("location-prompt".into()).spawn(move || {
            let answer = prompt();
            *permission.lock().unwrap_or_else(PoisonError::into_inner) = answer;
            if events.send(LocationEvent::AuthorizationChanged(answer)).is_err() {
                debug!(%answer, "permission answered after location resolution gave up");
            }
        });

        if let Err(e) = spawned {
            warn!(error = %e, "could not start location permission prompt");
            self.send(LocationEvent::AuthorizationChanged(LocationAuthorization::Undetermined));
        }
    }
}

fn confirm_permission() -> LocationAuthorization {
    let answer = Confirm::new("Allow wherecast to use your location?")
        .with_default(true)
        .with_help_message("Your answer is saved. Edit `location.permission` in the config file to change it.")
        .prompt();

    match answer {
        Ok(true) => LocationAuthorization::WhenInUseGranted,
        Ok(false) => LocationAuthorization::Denied,
        Err(e) => {
            debug!(error = %e, "location permission prompt unavailable");
            LocationAuthorization::Undetermined
        }
    }
}

impl LocationProvider for TerminalLocationProvider {
    fn authorization_status(&self) -> LocationAuthorization {
        self.permission()
    }

    fn request_authorization(&mut self) {
        let current = self.permission();

        // Only an undecided user is asked; otherwise the saved answer is reported again.
        if current == LocationAuthorization::Undetermined && self.interactive {
            self.ask_in_background();
        } else {
            self.send(LocationEvent::AuthorizationChanged(current));
        }
    }

    fn request_location(&mut self) {
        let event = match self.device {
            Some(coordinate) => LocationEvent::LocationUpdate(vec![coordinate]),
            None => LocationEvent::LocationFailed(
                "no device location available; pass --lat/--long or run `wherecast configure`"
                    .to_string(),
            ),
        };
        self.send(event);
    }

    fn stop_updating_location(&mut self) {
        debug!("location updates stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use wherecast_core::{
        LocationNotice, LocationResolution, LocationResolver,
        location::{ResolverTimeouts, event_channel},
    };

    fn grant() -> LocationAuthorization {
        LocationAuthorization::WhenInUseGranted
    }

    fn grant_after_two_seconds() -> LocationAuthorization {
        thread::sleep(Duration::from_secs(2));
        LocationAuthorization::WhenInUseGranted
    }

    fn short_timeouts() -> ResolverTimeouts {
        ResolverTimeouts {
            authorization: Duration::from_millis(100),
            location_fix: Duration::from_millis(100),
        }
    }

    #[test]
    fn saved_denial_is_reported_without_prompting() {
        let (tx, mut rx) = event_channel();
        let mut provider = TerminalLocationProvider::new(LocationAuthorization::Denied, None, tx);

        provider.request_authorization();

        assert_eq!(
            rx.try_recv().unwrap(),
            LocationEvent::AuthorizationChanged(LocationAuthorization::Denied)
        );
        assert_eq!(provider.permission(), LocationAuthorization::Denied);
    }

    #[test]
    fn non_interactive_undetermined_stays_undetermined() {
        let (tx, mut rx) = event_channel();
        let mut provider =
            TerminalLocationProvider::new(LocationAuthorization::Undetermined, None, tx)
                .interactive(false);

        provider.request_authorization();

        assert_eq!(
            rx.try_recv().unwrap(),
            LocationEvent::AuthorizationChanged(LocationAuthorization::Undetermined)
        );
    }

    #[tokio::test]
    async fn prompt_answer_arrives_as_an_event_and_is_remembered() {
        let (tx, mut rx) = event_channel();
        let mut provider =
            TerminalLocationProvider::new(LocationAuthorization::Undetermined, None, tx)
                .with_prompt(grant);

        provider.request_authorization();

        assert_eq!(
            rx.recv().await.unwrap(),
            LocationEvent::AuthorizationChanged(LocationAuthorization::WhenInUseGranted)
        );
        assert_eq!(provider.permission(), LocationAuthorization::WhenInUseGranted);
    }

    #[tokio::test]
    async fn granted_prompt_leads_to_the_device_fix() {
        let here = Coordinate::new(52.52, 13.405).unwrap();
        let fallback = Coordinate::new(23.11265, 72.583618).unwrap();
        let (tx, rx) = event_channel();
        let provider =
            TerminalLocationProvider::new(LocationAuthorization::Undetermined, Some(here), tx)
                .with_prompt(grant);
        let mut resolver = LocationResolver::new(provider, rx, fallback);

        let outcome = resolver.resolve().await;

        assert_eq!(outcome.resolution, LocationResolution::device(here));
        assert_eq!(outcome.notice, None);
    }

    #[tokio::test]
    async fn unanswered_prompt_times_out_to_fallback() {
        let here = Coordinate::new(52.52, 13.405).unwrap();
        let fallback = Coordinate::new(23.11265, 72.583618).unwrap();
        let (tx, rx) = event_channel();
        let provider =
            TerminalLocationProvider::new(LocationAuthorization::Undetermined, Some(here), tx)
                .with_prompt(grant_after_two_seconds);
        let mut resolver =
            LocationResolver::new(provider, rx, fallback).with_timeouts(short_timeouts());

        let started = Instant::now();
        let outcome = resolver.resolve().await;

        assert!(started.elapsed() < Duration::from_secs(1), "waited {:?}", started.elapsed());
        assert_eq!(outcome.resolution, LocationResolution::fallback(fallback));
        assert_eq!(outcome.notice, Some(LocationNotice::FailedToRequestLocation));
    }

    #[test]
    fn device_coordinate_is_delivered_as_update() {
        let (tx, mut rx) = event_channel();
        let here = Coordinate::new(52.52, 13.405).unwrap();
        let mut provider =
            TerminalLocationProvider::new(LocationAuthorization::AlwaysGranted, Some(here), tx);

        provider.request_location();

        assert_eq!(rx.try_recv().unwrap(), LocationEvent::LocationUpdate(vec![here]));
    }

    #[test]
    fn missing_device_coordinate_is_a_failure() {
        let (tx, mut rx) = event_channel();
        let mut provider =
            TerminalLocationProvider::new(LocationAuthorization::AlwaysGranted, None, tx);

        provider.request_location();

        assert!(matches!(rx.try_recv().unwrap(), LocationEvent::LocationFailed(_)));
    }
}
