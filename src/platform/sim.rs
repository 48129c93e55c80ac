use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tracing::debug;

use crate::platform::{
    LocationProvider, PermissionApi, PermissionCheck, ProviderError, Reading, ReadingStream,
};
use crate::subscription::SubscriptionPolicy;

const WALK_SPEED_MPS: f32 = 1.4;
const WALK_BEARING_DEG: f32 = 45.0;
const DEGREES_PER_METER: f64 = 1.0 / 111_320.0;

/// Simulated platform scenario, loaded from the `sim` config table.
#[derive(Clone, Debug, Deserialize)]
pub struct SimScenario {
    /// Grant state before any request: "fine", "coarse" or "none".
    pub initial_grant: String,
    /// Outcome of a batch permission request: "fine", "coarse" or "none".
    pub grant_result: String,
    /// Whether a rationale prompt is wanted before re-requesting.
    pub rationale: bool,
    /// Starting coordinates for the simulated walk.
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Whether fixes carry speed/bearing/altitude.
    pub movement: bool,
    /// Number of update intervals to withhold the first fix.
    pub fix_delay: u32,
    /// Pretend the platform already holds a cached fix at startup.
    pub cached_fix: bool,
    /// Fail the cached-location fetch.
    pub last_known_fails: bool,
    /// Revoke permission between the grant check and the subscription call.
    pub revoked: bool,
}

impl SimScenario {
    /// Fine permission pre-granted, fix available immediately.
    pub fn granted() -> Self {
        Self {
            initial_grant: "fine".to_string(),
            grant_result: "fine".to_string(),
            rationale: false,
            latitude: 37.4219983,
            longitude: -122.084,
            altitude: 12.0,
            movement: true,
            fix_delay: 0,
            cached_fix: false,
            last_known_fails: false,
            revoked: false,
        }
    }

    /// Nothing granted, and the batch request comes back empty.
    pub fn denied() -> Self {
        Self {
            initial_grant: "none".to_string(),
            grant_result: "none".to_string(),
            ..Self::granted()
        }
    }

    fn reading_at(&self, sequence: u32, interval: Duration) -> Reading {
        let travelled =
            f64::from(sequence) * f64::from(WALK_SPEED_MPS) * interval.as_secs_f64();
        let offset = travelled * DEGREES_PER_METER;

        Reading {
            latitude: self.latitude + offset,
            longitude: self.longitude + offset,
            accuracy: 5.0,
            speed: self.movement.then_some(WALK_SPEED_MPS),
            bearing: self.movement.then_some(WALK_BEARING_DEG),
            altitude: self.movement.then_some(self.altitude),
            provider: "sim".to_string(),
            timestamp: Utc::now(),
        }
    }
}

fn parse_grant(value: &str) -> PermissionCheck {
    match value {
        "fine" => PermissionCheck {
            fine: true,
            coarse: false,
        },
        "coarse" => PermissionCheck {
            fine: false,
            coarse: true,
        },
        _ => PermissionCheck::default(),
    }
}

/// Deterministic in-process stand-in for the host platform: permission
/// prompts resolve instantly to the scenario's outcome, and the location feed
/// is a steady north-east walk from the starting coordinates.
///
/// Clones share the same grant state, cache and counters.
#[derive(Clone)]
pub struct SimPlatform {
    scenario: SimScenario,
    granted: Arc<Mutex<PermissionCheck>>,
    last_fix: Arc<Mutex<Option<Reading>>>,
    update_requests: Arc<AtomicU32>,
    permission_requests: Arc<AtomicU32>,
}

impl SimPlatform {
    pub fn new(scenario: SimScenario) -> Self {
        let granted = parse_grant(&scenario.initial_grant);
        let cached = scenario
            .cached_fix
            .then(|| scenario.reading_at(0, Duration::ZERO));

        Self {
            scenario,
            granted: Arc::new(Mutex::new(granted)),
            last_fix: Arc::new(Mutex::new(cached)),
            update_requests: Arc::new(AtomicU32::new(0)),
            permission_requests: Arc::new(AtomicU32::new(0)),
        }
    }

    /// How many times a streaming subscription was opened.
    pub fn update_requests(&self) -> u32 {
        self.update_requests.load(Ordering::SeqCst)
    }

    /// How many batch permission requests were launched.
    pub fn permission_requests(&self) -> u32 {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

impl PermissionApi for SimPlatform {
    fn check(&self) -> PermissionCheck {
        *self.granted.lock().unwrap()
    }

    fn should_show_rationale(&self) -> bool {
        self.scenario.rationale && !self.check().any()
    }

    async fn request(&self) -> PermissionCheck {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);

        let response = parse_grant(&self.scenario.grant_result);
        *self.granted.lock().unwrap() = response;
        debug!(
            fine = response.fine,
            coarse = response.coarse,
            "simulated permission response"
        );
        response
    }
}

impl LocationProvider for SimPlatform {
    fn request_updates(
        &self,
        policy: &SubscriptionPolicy,
    ) -> Result<ReadingStream, ProviderError> {
        self.update_requests.fetch_add(1, Ordering::SeqCst);

        if self.scenario.revoked {
            return Err(ProviderError::Security(
                "location permission was revoked".to_string(),
            ));
        }
        if !self.check().any() {
            return Err(ProviderError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(8);
        let scenario = self.scenario.clone();
        let last_fix = Arc::clone(&self.last_fix);
        let interval = policy.interval;

        let feeder = tokio::spawn(async move {
            // First tick fires immediately, matching an instant first fix.
            let mut ticks = IntervalStream::new(tokio::time::interval(interval));
            let mut tick: u32 = 0;
            let mut sequence: u32 = 0;

            while ticks.next().await.is_some() {
                tick += 1;
                if tick <= scenario.fix_delay {
                    continue;
                }

                let reading = scenario.reading_at(sequence, interval);
                *last_fix.lock().unwrap() = Some(reading.clone());
                if tx.send(reading).await.is_err() {
                    break;
                }
                sequence += 1;
            }
        });

        Ok(ReadingStream::new(rx, feeder))
    }

    async fn last_known(&self) -> Result<Option<Reading>, ProviderError> {
        if self.scenario.last_known_fails {
            return Err(ProviderError::LastKnown(
                "provider cache unavailable".to_string(),
            ));
        }

        Ok(self.last_fix.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn delivers_readings_on_the_policy_interval() {
        let platform = SimPlatform::new(SimScenario::granted());
        let mut stream = platform
            .request_updates(&SubscriptionPolicy::default())
            .unwrap();

        let first = stream.recv().await.unwrap();
        assert_eq!(first.latitude, 37.4219983);
        assert_eq!(first.speed, Some(WALK_SPEED_MPS));

        let second = stream.recv().await.unwrap();
        assert!(second.latitude > first.latitude);
    }

    #[tokio::test(start_paused = true)]
    async fn movement_fields_absent_when_disabled() {
        let mut scenario = SimScenario::granted();
        scenario.movement = false;
        let platform = SimPlatform::new(scenario);

        let mut stream = platform
            .request_updates(&SubscriptionPolicy::default())
            .unwrap();
        let reading = stream.recv().await.unwrap();

        assert_eq!(reading.speed, None);
        assert_eq!(reading.bearing, None);
        assert_eq!(reading.altitude, None);
    }

    #[tokio::test]
    async fn refuses_updates_without_a_grant() {
        let platform = SimPlatform::new(SimScenario::denied());
        let result = platform.request_updates(&SubscriptionPolicy::default());
        assert!(matches!(result, Err(ProviderError::PermissionDenied)));
    }

    #[tokio::test]
    async fn revoked_scenario_raises_a_security_error() {
        let mut scenario = SimScenario::granted();
        scenario.revoked = true;
        let platform = SimPlatform::new(scenario);

        let result = platform.request_updates(&SubscriptionPolicy::default());
        assert!(matches!(result, Err(ProviderError::Security(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn last_known_tracks_the_latest_fix() {
        let platform = SimPlatform::new(SimScenario::granted());
        assert_eq!(platform.last_known().await.unwrap(), None);

        let mut stream = platform
            .request_updates(&SubscriptionPolicy::default())
            .unwrap();
        let reading = stream.recv().await.unwrap();

        assert_eq!(platform.last_known().await.unwrap(), Some(reading));
    }

    #[tokio::test]
    async fn cached_fix_is_available_before_any_stream() {
        let mut scenario = SimScenario::granted();
        scenario.cached_fix = true;
        let platform = SimPlatform::new(scenario);

        let cached = platform.last_known().await.unwrap().unwrap();
        assert_eq!(cached.latitude, 37.4219983);
    }

    #[tokio::test]
    async fn last_known_failure_scenario() {
        let mut scenario = SimScenario::granted();
        scenario.last_known_fails = true;
        let platform = SimPlatform::new(scenario);

        assert!(matches!(
            platform.last_known().await,
            Err(ProviderError::LastKnown(_))
        ));
    }

    #[tokio::test]
    async fn request_updates_the_grant_state() {
        let platform = SimPlatform::new(SimScenario {
            initial_grant: "none".to_string(),
            grant_result: "coarse".to_string(),
            ..SimScenario::granted()
        });

        assert!(!platform.check().any());
        let response = platform.request().await;
        assert!(response.coarse && !response.fine);
        assert!(platform.check().coarse);
        assert_eq!(platform.permission_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fix_delay_withholds_early_readings() {
        let mut scenario = SimScenario::granted();
        scenario.fix_delay = 2;
        let platform = SimPlatform::new(scenario);

        let mut stream = platform
            .request_updates(&SubscriptionPolicy::default())
            .unwrap();

        let started = tokio::time::Instant::now();
        stream.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(20));
    }
}
