//! Retry decision for rate-limited requests.

use std::time::Duration;

use crate::ApiStatus;

/// How to proceed after a 429 response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// A slot is free; the 429 was a race with another request finishing.
    Immediate,
    /// All slots are taken; wait for the earliest one to free up.
    Wait(Duration),
}

/// True when the snapshot shows unlimited or unoccupied capacity.
pub fn should_retry_immediately(status: &ApiStatus) -> bool {
    let occupied = status.slots_running.len() + status.slots_available_after.len();
    status.rate_limit == 0 || status.rate_limit as usize > occupied
}

/// Seconds until the earliest slot frees up, plus one second of slack.
///
/// An empty `slots_available_after` counts as a slot freeing up now.
pub fn wait_seconds(status: &ApiStatus) -> u64 {
    let earliest = status
        .slots_available_after
        .iter()
        .copied()
        .min()
        .unwrap_or(0)
        .max(0);
    earliest.unsigned_abs() + 1
}

pub fn decide(status: &ApiStatus) -> Backoff {
    if should_retry_immediately(status) {
        Backoff::Immediate
    } else {
        Backoff::Wait(Duration::from_secs(wait_seconds(status)))
    }
}
