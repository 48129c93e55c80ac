use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::display::{self, DisplayModel};
use crate::permission::{PermissionEvent, PermissionState};
use crate::platform::{LocationProvider, PermissionApi, ProviderError, Reading};
use crate::subscription::{Subscription, SubscriptionPolicy};

/// Foreground transitions delivered by the host shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Resume,
    Pause,
    Destroy,
}

enum Wake {
    Lifecycle(Option<LifecycleEvent>),
    Reading(Option<Reading>),
}

/// Owns the permission state, the location subscription and the display
/// channel. Everything the platform delivers lands on this one task.
pub struct Controller<P> {
    platform: P,
    display: watch::Sender<DisplayModel>,
    policy: SubscriptionPolicy,
    permission: PermissionState,
    subscription: Subscription,
    request_flow_ran: bool,
}

impl<P: PermissionApi + LocationProvider> Controller<P> {
    pub fn new(platform: P, display: watch::Sender<DisplayModel>) -> Self {
        Self {
            platform,
            display,
            policy: SubscriptionPolicy::default(),
            permission: PermissionState::Unknown,
            subscription: Subscription::new(),
            request_flow_ran: false,
        }
    }

    /// Event loop over lifecycle transitions and subscription readings.
    /// Returns after a `Destroy` event or once the lifecycle channel closes.
    pub async fn run(mut self, mut lifecycle: mpsc::Receiver<LifecycleEvent>) -> anyhow::Result<()> {
        loop {
            let wake = tokio::select! {
                event = lifecycle.recv() => Wake::Lifecycle(event),
                reading = self.subscription.next_reading() => Wake::Reading(reading),
            };

            match wake {
                Wake::Lifecycle(Some(LifecycleEvent::Resume)) => self.on_resume().await,
                Wake::Lifecycle(Some(LifecycleEvent::Pause)) => {
                    info!("paused, releasing location updates");
                    self.subscription.stop();
                }
                Wake::Lifecycle(Some(LifecycleEvent::Destroy)) | Wake::Lifecycle(None) => {
                    self.subscription.stop();
                    break;
                }
                Wake::Reading(Some(reading)) => self.on_reading(&reading),
                Wake::Reading(None) => {
                    warn!("location provider closed the update stream");
                    self.subscription.stop();
                    self.set_status("Location provider unavailable");
                }
            }
        }

        Ok(())
    }

    /// Activation: check permission, walk the request flow if needed, then
    /// start updates. A denial that already came back from a request this
    /// session is terminal; no retry loop.
    async fn on_resume(&mut self) {
        let check = self.platform.check();
        self.permission = self.permission.apply(PermissionEvent::Checked(check));

        if self.permission.is_granted() {
            info!("location permissions already granted");
            self.start_updates().await;
            return;
        }

        if self.request_flow_ran {
            self.set_status("Permission denied - limited functionality");
            return;
        }
        self.request_flow_ran = true;

        if self.platform.should_show_rationale() {
            self.permission = self.permission.apply(PermissionEvent::RationaleRequired);
            info!("location access is needed to show coordinates and movement data");
            self.set_status("Location permission required");
        }

        self.permission = self.permission.apply(PermissionEvent::RequestLaunched);
        self.set_status("Requesting location permission...");
        let response = self.platform.request().await;
        self.permission = self.permission.apply(PermissionEvent::Response(response));

        if self.permission.is_granted() {
            info!(
                fine = response.fine,
                coarse = response.coarse,
                "location permission granted"
            );
            self.start_updates().await;
        } else {
            warn!("location permission denied");
            self.set_status("Permission denied - limited functionality");
        }
    }

    /// Open the subscription and opportunistically fetch the cached reading.
    /// Every failure here becomes a status string; none terminate the loop.
    async fn start_updates(&mut self) {
        if !self.platform.check().any() {
            self.set_status("Missing location permission");
            return;
        }

        match self.subscription.start(&self.platform, &self.policy) {
            Ok(()) => {
                info!("location updates started");
                self.set_status("Getting your location...");
            }
            Err(ProviderError::Security(reason)) => {
                // Permission can be revoked between the check and the call.
                error!("security violation starting location updates: {}", reason);
                self.set_status(&format!("Security error: {}", reason));
                return;
            }
            Err(err) => {
                error!("failed to start location updates: {}", err);
                self.set_status(&format!("Failed to start location updates: {}", err));
                return;
            }
        }

        match self.platform.last_known().await {
            Ok(Some(reading)) => self.on_reading(&reading),
            Ok(None) => self.set_status("Searching for GPS signal..."),
            Err(err) => {
                // Non-fatal; the streaming subscription stays up.
                warn!("last known location fetch failed: {}", err);
                self.set_status(&format!("Failed to get location: {}", err));
            }
        }
    }

    fn on_reading(&mut self, reading: &Reading) {
        debug!(
            latitude = reading.latitude,
            longitude = reading.longitude,
            accuracy = f64::from(reading.accuracy),
            speed = reading.speed.map(f64::from),
            bearing = reading.bearing.map(f64::from),
            altitude = reading.altitude,
            provider = %reading.provider,
            "location update"
        );

        self.display.send_modify(|model| {
            model.status = "Location updated".to_string();
            model.coordinates = display::format_coordinates(reading);
            model.movement = display::format_movement(reading);
            model.last_update = display::format_last_update();
        });
    }

    fn set_status(&self, status: &str) {
        self.display.send_modify(|model| model.status = status.to_string());
    }
}
