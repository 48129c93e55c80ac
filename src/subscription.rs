use std::time::Duration;

use tracing::debug;

use crate::platform::{LocationProvider, ProviderError, Reading, ReadingStream};

pub const UPDATE_INTERVAL: Duration = Duration::from_secs(10);
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_UPDATE_DELAY: Duration = Duration::from_secs(15);

/// Accuracy tier requested from the provider. Updates always run at high
/// accuracy; a coarse-only grant is not downgraded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
}

/// Update policy handed to the provider. Fixed at initialization, never
/// re-negotiated at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionPolicy {
    pub priority: Priority,
    pub interval: Duration,
    pub min_update_interval: Duration,
    pub max_update_delay: Duration,
}

impl Default for SubscriptionPolicy {
    fn default() -> Self {
        Self {
            priority: Priority::HighAccuracy,
            interval: UPDATE_INTERVAL,
            min_update_interval: MIN_UPDATE_INTERVAL,
            max_update_delay: MAX_UPDATE_DELAY,
        }
    }
}

/// Scoped handle for the provider subscription: acquired on resume, released
/// on pause, with destroy as a safety-net release.
///
/// `start` does not guard against double acquisition; callers confirm
/// permission first and start once per foreground period.
pub struct Subscription {
    stream: Option<ReadingStream>,
}

impl Subscription {
    pub fn new() -> Self {
        Self { stream: None }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn start<P: LocationProvider>(
        &mut self,
        provider: &P,
        policy: &SubscriptionPolicy,
    ) -> Result<(), ProviderError> {
        let stream = provider.request_updates(policy)?;
        self.stream = Some(stream);
        debug!("location subscription acquired");
        Ok(())
    }

    /// Release the provider stream. A no-op when never started.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("location subscription released");
        }
    }

    /// Next reading from the live stream. Pends forever while inactive so it
    /// can sit in a select loop; yields `None` if the provider drops the
    /// stream.
    pub async fn next_reading(&mut self) -> Option<Reading> {
        match self.stream.as_mut() {
            Some(stream) => stream.recv().await,
            None => std::future::pending().await,
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}
