use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use crate::ActionError;
use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionResponse;
use crate::Event;

pub const RATE_LIMITER_ACTION: &str = "rate_limiter";

/// What happens to an event arriving above the allowed rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimiterMode {
    /// Wait until the event fits the rate
    #[default]
    Block,
    /// Drop the event
    Drop,
}

/// Settings of the `rate_limiter` action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimiterActionConfig {
    pub events_per_second: u32,

    #[serde(default)]
    pub when_exceeds: RateLimiterMode,
}

impl RateLimiterActionConfig {
    pub fn validate(&self) -> ActionResult<()> {
        if self.events_per_second == 0 {
            return Err(ActionError::InvalidSettings {
                action: RATE_LIMITER_ACTION.to_string(),
                reason: "events_per_second must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Token bucket holding at most one second worth of permits.
///
/// The balance may go negative: a blocking acquire reserves its permit and
/// sleeps off the debt outside the lock.
#[derive(Debug)]
struct TokenBucket {
    permits_per_second: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    available: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    fn new(permits_per_second: u32) -> Self {
        Self {
            permits_per_second: f64::from(permits_per_second),
            state: Mutex::new(BucketState {
                available: 1.0,
                refilled_at: Instant::now(),
            }),
        }
    }

    fn refill(
        &self,
        state: &mut BucketState,
    ) {
        let now = Instant::now();
        let earned = now.duration_since(state.refilled_at).as_secs_f64() * self.permits_per_second;
        state.available = (state.available + earned).min(self.permits_per_second);
        state.refilled_at = now;
    }

    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.available >= 1.0 {
            state.available -= 1.0;
            true
        } else {
            false
        }
    }

    fn acquire(&self) {
        let wait = {
            let mut state = self.state.lock();
            self.refill(&mut state);
            state.available -= 1.0;
            if state.available >= 0.0 {
                Duration::ZERO
            } else {
                Duration::from_secs_f64(-state.available / self.permits_per_second)
            }
        };
        if !wait.is_zero() {
            trace!(?wait, "rate limit reached, waiting for a permit");
            sleep(wait);
        }
    }
}

/// Caps the rate of events forwarded across all groups.
#[derive(Debug)]
pub struct RateLimiterAction {
    mode: RateLimiterMode,
    bucket: TokenBucket,
}

impl RateLimiterAction {
    pub fn new(config: RateLimiterActionConfig) -> Self {
        Self {
            mode: config.when_exceeds,
            bucket: TokenBucket::new(config.events_per_second),
        }
    }
}

impl AggregateAction for RateLimiterAction {
    fn handle_event(
        &self,
        event: &Event,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        match self.mode {
            RateLimiterMode::Block => {
                self.bucket.acquire();
                Ok(AggregateActionResponse::from_event(event.clone()))
            }
            RateLimiterMode::Drop if self.bucket.try_acquire() => Ok(AggregateActionResponse::from_event(event.clone())),
            RateLimiterMode::Drop => Ok(AggregateActionResponse::null_event()),
        }
    }
}
