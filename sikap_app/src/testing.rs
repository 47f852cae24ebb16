use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use sikap_data_management::{DataManagerError, KeyPath, RecordId, SikapStore};
use sikap_lib::{location_fix::Coordinate, sikap_summary::SikapRecord};

use crate::location::{AuthorizationStatus, LocationRequest, LocationService, LocationSink};

/// A location service driven by hand. Counts what the app asks of it.
#[derive(Default)]
pub struct ManualLocation {
    pub status: AuthorizationStatus,
    pub status_on_request: Option<AuthorizationStatus>,
    pub current: Option<Coordinate>,
    pub sink: Option<LocationSink>,
    pub last_request: Option<LocationRequest>,
    pub starts: usize,
    pub stops: usize,
    pub authorization_requests: usize,
}

impl ManualLocation {
    pub fn authorized() -> Self {
        Self::with_status(AuthorizationStatus::AuthorizedWhenInUse)
    }

    pub fn with_status(status: AuthorizationStatus) -> Self {
        Self { status, ..Default::default() }
    }

    pub fn at(mut self, coordinate: Coordinate) -> Self {
        self.current = Some(coordinate);
        self
    }
}

impl LocationService for ManualLocation {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_authorization(&mut self) {
        self.authorization_requests += 1;
        if let Some(status) = self.status_on_request {
            self.status = status;
            if let Some(sink) = &self.sink {
                sink.authorization_changed(status);
            }
        }
    }

    fn subscribe(&mut self, sink: LocationSink) {
        self.sink = Some(sink);
    }

    fn start_updates(&mut self, request: &LocationRequest) {
        self.starts += 1;
        self.last_request = Some(*request);
    }

    fn stop_updates(&mut self) {
        self.stops += 1;
    }

    fn current_location(&self) -> Option<Coordinate> {
        self.current
    }
}

/// A store whose writes always fail.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl SikapStore for FailingStore {
    async fn push(&self, parent: &KeyPath, _record: &SikapRecord) -> Result<RecordId, DataManagerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DataManagerError::Database(format!("Failed to write under {parent}")))
    }

    async fn read_field(&self, _path: &KeyPath) -> Result<Option<String>, DataManagerError> {
        Ok(None)
    }

    async fn write_field(&self, path: &KeyPath, _value: &str) -> Result<(), DataManagerError> {
        Err(DataManagerError::Database(format!("Failed to write {path}")))
    }

    async fn list(&self, _parent: &KeyPath) -> Result<Vec<(RecordId, SikapRecord)>, DataManagerError> {
        Ok(Vec::new())
    }
}
