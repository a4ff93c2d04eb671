//! Order submission rate limiting
//!
//! Each session is either open or blocked until some instant. While open, the
//! timestamps of recent submission attempts are kept as evidence: once
//! `max_attempts` of them fall inside the trailing `window`, the next
//! [`RateLimiter::check`] blocks the session for `block_duration` and discards
//! the evidence.
//!
//! `check` never records an attempt. Callers check first, proceed only when
//! allowed, then call [`RateLimiter::record_attempt`] as part of the attempt, so
//! a rejected check does not consume a slot.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    clock::Clock,
    session::SessionId,
    storage::{Storage, StorageError, keys, read_json, write_json},
};

const MILLIS_PER_MINUTE: i64 = 60_000;

type Attempts = SmallVec<[i64; 4]>;
type AttemptLog = FxHashMap<SessionId, Attempts>;
type BlockLog = FxHashMap<SessionId, Timestamp>;

/// Errors from the rate limiter.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Reading or writing limiter state failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A block expiry could not be computed.
    #[error("block expiry is out of range")]
    Time(#[source] jiff::Error),
}

/// Thresholds and messages for the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Attempts allowed inside one window.
    pub max_attempts: usize,

    /// Trailing window attempts are counted over.
    pub window: SignedDuration,

    /// How long a session stays blocked.
    pub block_duration: SignedDuration,

    /// Shown while an existing block is still in force.
    pub blocked_message: String,

    /// Shown when a block is first imposed.
    pub too_frequent_message: String,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            window: SignedDuration::from_secs(20),
            block_duration: SignedDuration::from_mins(10),
            blocked_message: "Ordering is temporarily blocked on this device. Please wait before ordering again.".to_string(),
            too_frequent_message: "Orders are being placed too frequently. Please wait before ordering again.".to_string(),
        }
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// A submission may proceed.
    Allowed,

    /// Submission is refused.
    Blocked {
        /// Human-readable reason.
        message: String,

        /// Whole minutes until the block lifts, rounded up.
        wait_minutes: i64,
    },
}

impl RateLimitDecision {
    /// Whether submission may proceed.
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Persisted limiter state for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitState {
    /// Attempts are being counted.
    Open,

    /// Submissions are refused until the given instant.
    Blocked {
        /// When the block lifts.
        until: Timestamp,
    },
}

/// Per-session sliding-window limiter with a timed block.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    session: SessionId,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    /// Create a limiter for `session`.
    pub fn new(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        session: SessionId,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            storage,
            clock,
            session,
            policy,
        }
    }

    /// The configured policy.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Current persisted state, without evaluating or cleaning anything up.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Storage`] if the block state cannot be read.
    pub fn state(&self) -> Result<RateLimitState, RateLimitError> {
        Ok(self
            .load_blocks()?
            .get(&self.session)
            .map_or(RateLimitState::Open, |until| RateLimitState::Blocked {
                until: *until,
            }))
    }

    /// Decide whether a submission may proceed now.
    ///
    /// # Errors
    ///
    /// Returns a [`RateLimitError`] if limiter state cannot be read or written.
    pub fn check(&self) -> Result<RateLimitDecision, RateLimitError> {
        let now = self.clock.now();
        let mut blocks = self.load_blocks()?;

        if let Some(until) = blocks.get(&self.session).copied() {
            if until > now {
                return Ok(RateLimitDecision::Blocked {
                    message: self.policy.blocked_message.clone(),
                    wait_minutes: ceil_minutes(until.duration_since(now)),
                });
            }

            blocks.remove(&self.session);
            write_json(self.storage.as_ref(), keys::BLOCKED_UNTIL, &blocks)?;

            debug!(session = %self.session, "submission block expired");
        }

        let mut attempts = self.load_attempts()?;
        let recent = attempts
            .get(&self.session)
            .map_or(0, |log| self.in_window(log, now).count());

        if recent < self.policy.max_attempts {
            return Ok(RateLimitDecision::Allowed);
        }

        let until = now
            .checked_add(self.policy.block_duration)
            .map_err(RateLimitError::Time)?;

        blocks.insert(self.session.clone(), until);
        attempts.remove(&self.session);

        write_json(self.storage.as_ref(), keys::BLOCKED_UNTIL, &blocks)?;
        write_json(self.storage.as_ref(), keys::RATE_LIMIT_ATTEMPTS, &attempts)?;

        warn!(
            session = %self.session,
            attempts = recent,
            %until,
            "blocking order submission"
        );

        Ok(RateLimitDecision::Blocked {
            message: self.policy.too_frequent_message.clone(),
            wait_minutes: ceil_minutes(self.policy.block_duration),
        })
    }

    /// Record a submission attempt now, pruning attempts outside the window.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Storage`] if the attempt log cannot be read or written.
    pub fn record_attempt(&self) -> Result<(), RateLimitError> {
        let now = self.clock.now();
        let mut attempts = self.load_attempts()?;
        let log = attempts.entry(self.session.clone()).or_default();

        log.push(now.as_millisecond());

        let pruned: Attempts = self.in_window(log, now).collect();
        *log = pruned;

        write_json(self.storage.as_ref(), keys::RATE_LIMIT_ATTEMPTS, &attempts)?;

        Ok(())
    }

    fn in_window<'a>(
        &self,
        log: &'a [i64],
        now: Timestamp,
    ) -> impl Iterator<Item = i64> + 'a {
        let now = now.as_millisecond();
        let window = self.policy.window.as_millis();

        log.iter()
            .copied()
            .filter(move |at| i128::from(now - at) < window)
    }

    fn load_attempts(&self) -> Result<AttemptLog, RateLimitError> {
        Ok(read_json(self.storage.as_ref(), keys::RATE_LIMIT_ATTEMPTS)?.unwrap_or_default())
    }

    fn load_blocks(&self) -> Result<BlockLog, RateLimitError> {
        Ok(read_json(self.storage.as_ref(), keys::BLOCKED_UNTIL)?.unwrap_or_default())
    }
}

fn ceil_minutes(duration: SignedDuration) -> i64 {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);

    millis.saturating_add(MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE
}
