//! Scripted location provider for tests.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use super::{
    LocationAuthorization, LocationEvent, LocationEventSender, LocationProvider, LocationResolver,
    event_channel,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Calls {
    pub authorization_requests: usize,
    pub location_requests: usize,
    pub stops: usize,
}

/// Replies to each request by sending the scripted events.
#[derive(Debug)]
pub(crate) struct FakeProvider {
    status: LocationAuthorization,
    tx: Option<LocationEventSender>,
    on_authorization: Vec<LocationEvent>,
    on_location: Vec<LocationEvent>,
    authorization_delay: Option<Duration>,
    calls: Arc<Mutex<Calls>>,
}

impl FakeProvider {
    pub fn new(status: LocationAuthorization) -> Self {
        Self {
            status,
            tx: None,
            on_authorization: Vec::new(),
            on_location: Vec::new(),
            authorization_delay: None,
            calls: Arc::default(),
        }
    }

    pub fn on_authorization(mut self, event: LocationEvent) -> Self {
        self.on_authorization.push(event);
        self
    }

    pub fn on_location(mut self, event: LocationEvent) -> Self {
        self.on_location.push(event);
        self
    }

    /// Deliver the authorization answer from a task that first sleeps for `delay`.
    pub fn answer_authorization_after(mut self, delay: Duration) -> Self {
        self.authorization_delay = Some(delay);
        self
    }

    pub fn with_sender(mut self, tx: LocationEventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }

    /// Drop the sending side, as if the platform service went away.
    pub fn close(&mut self) {
        self.tx = None;
    }

    fn send_all(&self, events: &[LocationEvent]) {
        if let Some(tx) = &self.tx {
            for event in events {
                let _ = tx.send(event.clone());
            }
        }
    }
}

impl LocationProvider for FakeProvider {
    fn authorization_status(&self) -> LocationAuthorization {
        self.status
    }

    fn request_authorization(&mut self) {
        self.calls.lock().unwrap().authorization_requests += 1;

        match (self.authorization_delay, &self.tx) {
            (Some(delay), Some(tx)) => {
                let tx = tx.clone();
                let events = self.on_authorization.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for event in events {
                        let _ = tx.send(event);
                    }
                });
            }
            _ => self.send_all(&self.on_authorization),
        }
    }

    fn request_location(&mut self) {
        self.calls.lock().unwrap().location_requests += 1;
        self.send_all(&self.on_location);
    }

    fn stop_updating_location(&mut self) {
        self.calls.lock().unwrap().stops += 1;
    }
}

/// A resolver over `provider` using the default fallback coordinate.
pub(crate) fn fake_resolver(
    provider: FakeProvider,
) -> (LocationResolver<FakeProvider>, Arc<Mutex<Calls>>) {
    let (tx, rx) = event_channel();
    let provider = provider.with_sender(tx);
    let calls = provider.calls();
    (LocationResolver::new(provider, rx, crate::config::default_fallback()), calls)
}
