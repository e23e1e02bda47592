//! Delay between a disconnect and the next connect attempt.

use crate::DEFAULT_RECONNECT_DELAY;

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::{Backoff, Constant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay after every disconnect.
    Fixed(Duration),
    /// Growing, jittered delay capped at `max`; reset after a successful connect.
    Exponential { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    /// Fresh backoff state. Never exhausts, so retries go on indefinitely.
    pub fn backoff(&self) -> Box<dyn Backoff + Send> {
        match *self {
            ReconnectPolicy::Fixed(delay) => Box::new(Constant::new(delay)),
            ReconnectPolicy::Exponential { initial, max } => Box::new(ExponentialBackoff {
                initial_interval: initial,
                current_interval: initial,
                max_interval: max,
                max_elapsed_time: None,
                ..Default::default()
            }),
        }
    }

    /// Delay used if a backoff ever reports exhaustion.
    pub(crate) fn fallback_delay(&self) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { max, .. } => max,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(DEFAULT_RECONNECT_DELAY)
    }
}
