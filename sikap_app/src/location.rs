use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use sikap_lib::location_fix::{Coordinate, LocationFix};
use tokio::{
    sync::{mpsc::UnboundedSender, watch},
    task::JoinHandle,
};

use crate::AppEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::AuthorizedWhenInUse | Self::AuthorizedAlways)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Fitness,
}

/// How the platform should deliver location updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    pub background_updates: bool,
    pub pauses_automatically: bool,
    pub activity: ActivityType,
    pub distance_filter_meters: f64,
}

impl LocationRequest {
    pub fn fitness(distance_filter_meters: f64) -> Self {
        Self {
            background_updates: true,
            pauses_automatically: false,
            activity: ActivityType::Fitness,
            distance_filter_meters,
        }
    }
}

/// Handle a location service uses to push events onto the app's event loop.
#[derive(Clone)]
pub struct LocationSink {
    tx: UnboundedSender<AppEvent>,
}

impl LocationSink {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the app has gone away.
    pub fn fixes_received(&self, fixes: Vec<LocationFix>) -> bool {
        self.tx.send(AppEvent::FixesReceived(fixes)).is_ok()
    }

    pub fn authorization_changed(&self, status: AuthorizationStatus) -> bool {
        self.tx.send(AppEvent::AuthorizationChanged(status)).is_ok()
    }
}

/// The platform location framework.
pub trait LocationService: Send {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for access. The answer arrives through the sink.
    fn request_authorization(&mut self);

    fn subscribe(&mut self, sink: LocationSink);

    fn start_updates(&mut self, request: &LocationRequest);

    fn stop_updates(&mut self);

    /// Most recent position known to the platform, if any.
    fn current_location(&self) -> Option<Coordinate>;
}

/// Plays back a recorded track as if it were live.
///
/// Each fix is re-stamped with the time it is delivered. Fixes closer than the
/// request's distance filter to the previously delivered one are skipped, the
/// way a platform service would. Stopping and starting again resumes where the
/// playback left off.
pub struct ReplayLocationService {
    fixes: Arc<Vec<LocationFix>>,
    cursor: Arc<Mutex<usize>>,
    last_position: Arc<Mutex<Option<Coordinate>>>,
    status: AuthorizationStatus,
    status_on_request: AuthorizationStatus,
    interval: Duration,
    sink: Option<LocationSink>,
    task: Option<JoinHandle<()>>,
    finished_tx: Arc<watch::Sender<bool>>,
}

/// Lets the caller wait for a replay to run out of fixes.
#[derive(Clone)]
pub struct ReplayHandle {
    finished_rx: watch::Receiver<bool>,
}

impl ReplayHandle {
    pub async fn finished(&mut self) {
        // Only fails if the service was dropped, which also means no more fixes
        let _ = self.finished_rx.wait_for(|finished| *finished).await;
    }
}

impl ReplayLocationService {
    pub fn new(fixes: Vec<LocationFix>, status: AuthorizationStatus, interval: Duration) -> (Self, ReplayHandle) {
        let (finished_tx, finished_rx) = watch::channel(false);
        let service = Self {
            fixes: Arc::new(fixes),
            cursor: Arc::new(Mutex::new(0)),
            last_position: Arc::new(Mutex::new(None)),
            status,
            status_on_request: AuthorizationStatus::AuthorizedWhenInUse,
            interval,
            sink: None,
            task: None,
            finished_tx: Arc::new(finished_tx),
        };
        (service, ReplayHandle { finished_rx })
    }

    /// What the simulated user answers when asked for access.
    pub fn answer_authorization_with(mut self, status: AuthorizationStatus) -> Self {
        self.status_on_request = status;
        self
    }

    pub fn is_updating(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl LocationService for ReplayLocationService {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_authorization(&mut self) {
        if self.status != AuthorizationStatus::NotDetermined {
            return;
        }
        self.status = self.status_on_request;
        tracing::debug!("Authorization answered with {:?}", self.status);
        if let Some(sink) = &self.sink {
            sink.authorization_changed(self.status);
        }
    }

    fn subscribe(&mut self, sink: LocationSink) {
        self.sink = Some(sink);
    }

    fn start_updates(&mut self, request: &LocationRequest) {
        if !self.status.is_authorized() {
            tracing::warn!("Not authorized to start location updates");
            return;
        }
        let Some(sink) = self.sink.clone() else {
            tracing::warn!("Location updates started without a subscriber");
            return;
        };
        self.stop_updates();

        let fixes = self.fixes.clone();
        let cursor = self.cursor.clone();
        let last_position = self.last_position.clone();
        let finished_tx = self.finished_tx.clone();
        let interval = self.interval;
        let distance_filter = request.distance_filter_meters;

        tracing::debug!("Replaying location updates every {:?}", interval);
        self.task = Some(tokio::spawn(async move {
            loop {
                let next = {
                    let Ok(mut cursor) = cursor.lock() else { break };
                    let next = fixes.get(*cursor).cloned();
                    *cursor += 1;
                    next
                };
                let Some(fix) = next else { break };

                let previous = last_position.lock().ok().and_then(|last| *last);
                if previous.is_some_and(|previous| previous.distance_to(&fix.coordinate) < distance_filter) {
                    continue;
                }

                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }

                if let Ok(mut last) = last_position.lock() {
                    *last = Some(fix.coordinate);
                }
                if !sink.fixes_received(vec![fix.restamped(Utc::now())]) {
                    return;
                }
            }
            finished_tx.send_replace(true);
        }));
    }

    fn stop_updates(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn current_location(&self) -> Option<Coordinate> {
        self.last_position.lock().ok().and_then(|last| *last)
    }
}

impl Drop for ReplayLocationService {
    fn drop(&mut self) {
        self.stop_updates();
    }
}
