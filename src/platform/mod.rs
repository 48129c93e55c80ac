use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::subscription::SubscriptionPolicy;

pub mod sim;

/// One location sample as delivered by the platform. Immutable snapshot; the
/// controller only reads and formats it.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated horizontal accuracy radius in meters.
    pub accuracy: f32,
    /// Ground speed in m/s, absent when the fix carries none.
    pub speed: Option<f32>,
    /// Direction of travel in degrees, absent when the fix carries none.
    pub bearing: Option<f32>,
    /// Meters above the reference ellipsoid, absent when the fix carries none.
    pub altitude: Option<f64>,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

/// Grant status per permission granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PermissionCheck {
    pub fine: bool,
    pub coarse: bool,
}

impl PermissionCheck {
    pub fn any(&self) -> bool {
        self.fine || self.coarse
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location provider unavailable")]
    Unavailable,
    #[error("security violation: {0}")]
    Security(String),
    #[error("no cached location: {0}")]
    LastKnown(String),
}

#[allow(async_fn_in_trait)]
pub trait PermissionApi {
    /// Current grant status, re-queried from the platform every time. The
    /// controller never infers a grant without going through this.
    fn check(&self) -> PermissionCheck;

    /// Whether the platform wants an explanatory prompt shown before
    /// re-requesting a previously denied permission.
    fn should_show_rationale(&self) -> bool;

    /// Request both granularities in one batch and wait for the user's
    /// response.
    async fn request(&self) -> PermissionCheck;
}

#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    /// Open a streaming subscription under the given policy. Dropping the
    /// returned stream releases the subscription.
    fn request_updates(&self, policy: &SubscriptionPolicy)
        -> Result<ReadingStream, ProviderError>;

    /// Most recent cached reading, if the platform holds one.
    async fn last_known(&self) -> Result<Option<Reading>, ProviderError>;
}

/// Live subscription handle. Readings arrive on a channel fed by a platform
/// task; dropping the handle aborts the feeder.
pub struct ReadingStream {
    readings: mpsc::Receiver<Reading>,
    feeder: JoinHandle<()>,
}

impl ReadingStream {
    pub fn new(readings: mpsc::Receiver<Reading>, feeder: JoinHandle<()>) -> Self {
        Self { readings, feeder }
    }

    /// Next reading in platform delivery order, or `None` once the feeder is
    /// gone.
    pub async fn recv(&mut self) -> Option<Reading> {
        self.readings.recv().await
    }
}

impl Drop for ReadingStream {
    fn drop(&mut self) {
        self.feeder.abort();
    }
}
