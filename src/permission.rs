use crate::platform::PermissionCheck;

/// Which granularity the user granted. Fine is preferred when both are
/// granted; a coarse-only grant runs the same high-accuracy policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
    Fine,
    Coarse,
}

/// Permission lifecycle: `Unknown -> {Granted, Denied}` on the entry check,
/// `Denied -> RationaleShown -> Requested -> {Granted, Denied}` for the
/// request flow. Transitions happen only through [`PermissionState::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    /// No check performed yet this session.
    Unknown,
    Granted(Grant),
    /// Not granted. Re-enterable before a request; terminal once a batch
    /// request has come back empty, since the controller never retries.
    Denied,
    /// Explanatory prompt surfaced, request not yet launched.
    RationaleShown,
    /// Batch request in flight.
    Requested,
}

#[derive(Clone, Copy, Debug)]
pub enum PermissionEvent {
    /// Grant status read back from the platform.
    Checked(PermissionCheck),
    /// Platform asked for an explanatory prompt before re-requesting.
    RationaleRequired,
    /// Batch request for both granularities handed to the platform.
    RequestLaunched,
    /// User response to the batch request.
    Response(PermissionCheck),
}

impl PermissionState {
    /// Transition table. Events that make no sense in the current state
    /// leave it unchanged.
    pub fn apply(self, event: PermissionEvent) -> PermissionState {
        use PermissionEvent::*;
        use PermissionState::*;

        match (self, event) {
            (Unknown, Checked(check)) | (Granted(_), Checked(check)) | (Denied, Checked(check)) => {
                Self::from_check(check)
            }
            (Denied, RationaleRequired) => RationaleShown,
            (Denied, RequestLaunched) | (RationaleShown, RequestLaunched) => Requested,
            (Requested, Response(check)) => Self::from_check(check),
            (state, _) => state,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted(_))
    }

    fn from_check(check: PermissionCheck) -> PermissionState {
        if check.fine {
            PermissionState::Granted(Grant::Fine)
        } else if check.coarse {
            PermissionState::Granted(Grant::Coarse)
        } else {
            PermissionState::Denied
        }
    }
}
