use std::{fmt::Display, future::Future, pin::Pin};

use chrono::{DateTime, Duration, TimeZone, Utc};
use sikap_data_management::{DataManager, RecordId};
use sikap_lib::{
    location_fix::{Coordinate, LocationFix},
    sikap_summary::{DistanceUnit, SikapSummary},
};

use crate::{
    location::{AuthorizationStatus, LocationRequest, LocationService},
    SikapConfig, SikapError,
};

/// The single write attempt of a finished session.
pub type SaveFuture = Pin<Box<dyn Future<Output = Result<RecordId, SikapError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Tracking,
    Reviewing,
    Saved,
    Discarded,
}

/// The answer to the end-of-session prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndChoice {
    /// Finish and keep the sikap for review.
    End,
    /// Finish and throw the sikap away.
    Discard,
    /// Keep tracking.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndPrompt {
    pub title: &'static str,
    pub message: &'static str,
    pub choices: [EndChoice; 3],
}

impl Default for EndPrompt {
    fn default() -> Self {
        Self {
            title: "Ending Sikap",
            message: "Are you sure?",
            choices: [EndChoice::Continue, EndChoice::End, EndChoice::Discard],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    LowAccuracy,
    Stale,
    NotTracking,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// The fix joined the route. `segment` is the path from the previous fix, if there was one.
    Accepted { segment: Option<(LocationFix, LocationFix)> },
    Rejected(RejectReason),
}

/// Quality gate every incoming fix has to pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixFilter {
    pub max_horizontal_accuracy: f64,
    pub max_age: Duration,
}

impl FixFilter {
    pub fn check(&self, fix: &LocationFix, now: DateTime<Utc>) -> Result<(), RejectReason> {
        // Negative accuracy means the platform has no valid coordinate
        if !(fix.horizontal_accuracy >= 0. && fix.horizontal_accuracy < self.max_horizontal_accuracy) {
            return Err(RejectReason::LowAccuracy);
        }
        if fix.age_at(now) >= self.max_age {
            return Err(RejectReason::Stale);
        }
        Ok(())
    }
}

impl From<&SikapConfig> for FixFilter {
    fn from(config: &SikapConfig) -> Self {
        Self {
            max_horizontal_accuracy: config.max_horizontal_accuracy,
            // Out of range ages only come from hand built configs, parsing rejects them
            max_age: Duration::try_seconds(config.max_fix_age_secs.max(0)).unwrap_or(Duration::MAX),
        }
    }
}

/// Owns one tracking session: the accepted route, the distance walked and the
/// lifecycle `Idle -> Tracking -> Reviewing -> Saved | Discarded`.
pub struct SessionController<L: LocationService> {
    location: L,
    filter: FixFilter,
    request: LocationRequest,
    unit: DistanceUnit,
    state: SessionState,
    updating: bool,
    route: Vec<LocationFix>,
    distance: f64,
    /// Snapshot taken when the end prompt is shown, kept only if the user ends.
    pending_end: Option<SikapSummary>,
    summary: Option<SikapSummary>,
}

impl<L: LocationService> SessionController<L> {
    pub fn new(location: L, config: &SikapConfig) -> Self {
        Self {
            location,
            filter: FixFilter::from(config),
            request: LocationRequest::fitness(config.distance_filter_meters),
            unit: config.distance_unit,
            state: SessionState::Idle,
            updating: false,
            route: Vec::new(),
            distance: 0.,
            pending_end: None,
            summary: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn route(&self) -> &[LocationFix] {
        &self.route
    }

    /// Meters walked so far.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    pub fn summary(&self) -> Option<&SikapSummary> {
        self.summary.as_ref()
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn current_location(&self) -> Option<Coordinate> {
        self.location.current_location()
    }

    /// Starts updates when access is granted, asks for it when undecided.
    /// Denied and restricted access are dead ends for the session.
    pub fn check_authorization(&mut self) -> Result<bool, SikapError> {
        match self.location.authorization_status() {
            AuthorizationStatus::NotDetermined => {
                self.location.request_authorization();
                Ok(false)
            }
            AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways => {
                if self.state == SessionState::Tracking && self.pending_end.is_none() && !self.updating {
                    self.location.start_updates(&self.request);
                    self.updating = true;
                    tracing::info!("Location updates started");
                }
                Ok(true)
            }
            AuthorizationStatus::Restricted => {
                self.stop_updates();
                Err(SikapError::Restricted)
            }
            AuthorizationStatus::Denied => {
                self.stop_updates();
                Err(SikapError::PermissionDenied)
            }
        }
    }

    pub fn on_authorization_changed(&mut self, status: AuthorizationStatus) -> Result<bool, SikapError> {
        tracing::debug!("Authorization changed to {:?}", status);
        self.check_authorization()
    }

    /// Clears the route and distance and begins tracking.
    pub fn start_session(&mut self) -> Result<(), SikapError> {
        if self.state == SessionState::Reviewing {
            return Err(SikapError::InvalidTransition { from: self.state, action: "start a session" });
        }

        self.stop_updates();
        self.route.clear();
        self.distance = 0.;
        self.pending_end = None;
        self.summary = None;
        self.state = SessionState::Tracking;
        tracing::info!("Sikap started");

        self.check_authorization().map(|_| ())
    }

    pub fn on_fix_received(&mut self, fix: LocationFix, now: DateTime<Utc>) -> FixOutcome {
        if self.state != SessionState::Tracking || self.pending_end.is_some() {
            return FixOutcome::Rejected(RejectReason::NotTracking);
        }
        if let Err(reason) = self.filter.check(&fix, now) {
            tracing::trace!("Dropped fix {:?}: {:?}", fix.coordinate, reason);
            return FixOutcome::Rejected(reason);
        }

        let segment = self.route.last().map(|last| {
            self.distance += last.distance_to(&fix);
            (last.clone(), fix.clone())
        });
        self.route.push(fix);

        FixOutcome::Accepted { segment }
    }

    /// Stops updates and freezes the summary at the current distance.
    /// Nothing else changes until `resolve_end` is called.
    pub fn end_session<Tz: TimeZone>(&mut self, user: &str, now: &DateTime<Tz>) -> Result<EndPrompt, SikapError>
    where
        Tz::Offset: Display,
    {
        if self.state != SessionState::Tracking || self.pending_end.is_some() {
            return Err(SikapError::InvalidTransition { from: self.state, action: "end the session" });
        }

        self.stop_updates();
        self.pending_end = Some(SikapSummary::new(user, now, self.distance, self.unit));
        Ok(EndPrompt::default())
    }

    pub fn resolve_end(&mut self, choice: EndChoice) -> Result<SessionState, SikapError> {
        let Some(summary) = self.pending_end.take() else {
            return Err(SikapError::InvalidTransition { from: self.state, action: "resolve the end prompt" });
        };

        match choice {
            EndChoice::End => {
                tracing::info!("Sikap ended: {}", summary.details_line());
                self.summary = Some(summary);
                self.state = SessionState::Reviewing;
            }
            EndChoice::Discard => {
                tracing::info!("Sikap discarded");
                self.state = SessionState::Discarded;
            }
            EndChoice::Continue => {
                self.check_authorization()?;
            }
        }

        Ok(self.state)
    }

    /// Hands the summary to the store. The returned future is meant to be
    /// spawned: the session is considered saved as soon as this returns.
    pub fn save_session(&mut self, data_manager: &DataManager) -> Result<SaveFuture, SikapError> {
        if self.state != SessionState::Reviewing {
            return Err(SikapError::InvalidTransition { from: self.state, action: "save" });
        }
        let summary = self.summary.take()
            .ok_or(SikapError::InvalidTransition { from: self.state, action: "save" })?;
        self.state = SessionState::Saved;

        let data_manager = data_manager.clone();
        Ok(Box::pin(async move { persist_summary(&data_manager, &summary).await }))
    }

    pub fn stop_updates(&mut self) {
        if self.updating {
            self.location.stop_updates();
            self.updating = false;
            tracing::info!("Location updates stopped");
        }
    }
}

/// One write attempt, no retries. Failures are logged and returned.
pub async fn persist_summary(data_manager: &DataManager, summary: &SikapSummary) -> Result<RecordId, SikapError> {
    if summary.user().is_empty() {
        tracing::error!("Not saving sikap: no signed in user");
        return Err(SikapError::NotSignedIn);
    }

    match data_manager.save_sikap(summary).await {
        Ok(id) => {
            tracing::info!("Sikap saved successfully");
            Ok(id)
        }
        Err(err) => {
            tracing::error!("Failed to save sikap: {err}");
            Err(err.into())
        }
    }
}
