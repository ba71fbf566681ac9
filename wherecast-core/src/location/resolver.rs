use tracing::{debug, info, warn};

use crate::model::{Coordinate, LocationResolution};

use super::{
    AuthorizationPolicy, LocationEvent, LocationEventReceiver, LocationNotice, LocationProvider,
    ResolverTimeouts,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolverState {
    NotRequested,
    AuthorizationPending,
    Resolving,
    Resolved(LocationResolution),
}

/// The result of one resolution cycle: always a usable coordinate, plus at
/// most one notice for the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionOutcome {
    pub resolution: LocationResolution,
    pub notice: Option<LocationNotice>,
}

/// One-shot location state machine.
///
/// `NotRequested -> AuthorizationPending -> Resolving -> Resolved`, with the
/// pending and resolving stages able to jump straight to a fallback
/// resolution. Once resolved, further events in the cycle are ignored. A new
/// cycle starts only on an explicit [`LocationResolver::request`].
#[derive(Debug)]
pub struct LocationResolver<P> {
    provider: P,
    events: LocationEventReceiver,
    fallback: Coordinate,
    timeouts: ResolverTimeouts,
    state: ResolverState,
    notice: Option<LocationNotice>,
}

impl<P: LocationProvider> LocationResolver<P> {
    pub fn new(provider: P, events: LocationEventReceiver, fallback: Coordinate) -> Self {
        Self {
            provider,
            events,
            fallback,
            timeouts: ResolverTimeouts::default(),
            state: ResolverState::NotRequested,
            notice: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: ResolverTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn fallback(&self) -> Coordinate {
        self.fallback
    }

    /// The outcome of the current cycle, once it has resolved.
    pub fn outcome(&self) -> Option<ResolutionOutcome> {
        match self.state {
            ResolverState::Resolved(resolution) => {
                Some(ResolutionOutcome { resolution, notice: self.notice })
            }
            _ => None,
        }
    }

    /// Start a resolution cycle. Returns `false` if one is already in flight.
    pub fn request(&mut self) -> bool {
        if matches!(self.state, ResolverState::AuthorizationPending | ResolverState::Resolving) {
            warn!(state = ?self.state, "location request already in flight");
            return false;
        }

        // Events still queued belong to the previous cycle.
        while let Ok(stale) = self.events.try_recv() {
            debug!(event = ?stale, "discarding stale location event");
        }
        self.notice = None;

        let status = self.provider.authorization_status();
        debug!(%status, "starting location resolution");

        match AuthorizationPolicy::for_status(status) {
            AuthorizationPolicy::Proceed => self.begin_fix(),
            AuthorizationPolicy::FallbackWithNotice | AuthorizationPolicy::FallbackSilently => {
                self.state = ResolverState::AuthorizationPending;
                self.provider.request_authorization();
            }
        }

        true
    }

    /// Feed one platform event into the state machine.
    pub fn handle_event(&mut self, event: LocationEvent) {
        match (self.state, event) {
            (ResolverState::Resolved(_), event) => {
                debug!(?event, "location already resolved; ignoring event");
            }
            (ResolverState::AuthorizationPending, LocationEvent::AuthorizationChanged(status)) => {
                debug!(%status, "location authorization changed");
                match AuthorizationPolicy::for_status(status) {
                    AuthorizationPolicy::Proceed => self.begin_fix(),
                    AuthorizationPolicy::FallbackWithNotice => {
                        self.settle_on_fallback(Some(LocationNotice::NotAuthorized))
                    }
                    AuthorizationPolicy::FallbackSilently => self.settle_on_fallback(None),
                }
            }
            (ResolverState::Resolving, LocationEvent::LocationUpdate(coordinates)) => {
                match coordinates.first() {
                    Some(&first) => self.settle(LocationResolution::device(first), None),
                    None => {
                        debug!("location update carried no coordinates");
                        self.settle_on_fallback(None)
                    }
                }
            }
            (
                ResolverState::Resolving | ResolverState::AuthorizationPending,
                LocationEvent::LocationFailed(reason),
            ) => self.fail(&reason),
            (state, event) => {
                debug!(?state, ?event, "unexpected location event; ignoring");
            }
        }
    }

    /// Run a full cycle: request, then wait for events until resolved.
    ///
    /// Waiting longer than the configured timeout at either stage, or losing
    /// the event channel, resolves to the fallback with a failure notice.
    pub async fn resolve(&mut self) -> ResolutionOutcome {
        self.request();

        loop {
            let wait = match self.state {
                ResolverState::Resolved(resolution) => {
                    return ResolutionOutcome { resolution, notice: self.notice };
                }
                ResolverState::AuthorizationPending => self.timeouts.authorization,
                ResolverState::Resolving => self.timeouts.location_fix,
                ResolverState::NotRequested => {
                    self.request();
                    continue;
                }
            };

            match tokio::time::timeout(wait, self.events.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) => self.fail("location event channel closed"),
                Err(_) => self.fail(&format!("no answer from location service within {wait:?}")),
            }
        }
    }

    fn begin_fix(&mut self) {
        self.state = ResolverState::Resolving;
        self.provider.request_location();
    }

    fn fail(&mut self, reason: &str) {
        warn!(reason, "failed to request location; using fallback");
        self.settle_on_fallback(Some(LocationNotice::FailedToRequestLocation));
    }

    fn settle_on_fallback(&mut self, notice: Option<LocationNotice>) {
        self.settle(LocationResolution::fallback(self.fallback), notice);
    }

    fn settle(&mut self, resolution: LocationResolution, notice: Option<LocationNotice>) {
        if self.state == ResolverState::Resolving {
            self.provider.stop_updating_location();
        }

        info!(
            source = %resolution.source,
            coordinate = %resolution.coordinate,
            ?notice,
            "location resolved"
        );

        self.notice = notice;
        self.state = ResolverState::Resolved(resolution);
    }
}
