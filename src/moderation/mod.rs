/// Moderation
///
/// Restrict, ban and strike accounts. Every action runs in one transaction
/// covering the guard, the role update and the audit append.

mod service;
pub mod transition;

pub use service::{AccountLookup, ModerationOutcome, ModerationService, Paged, StrikeOutcome};
pub use transition::attempt_transition;

use chrono::{DateTime, Duration, Utc};

/// Reason recorded on the automatic restriction
pub const ESCALATION_REASON: &str = "three strikes";

/// Strike escalation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikePolicy {
    /// Trailing window, measured back from the time of each strike
    pub window: Duration,
    /// Strikes in the window, current one included, that trigger restriction
    pub threshold: i64,
}

impl Default for StrikePolicy {
    fn default() -> Self {
        Self {
            window: Duration::days(100),
            threshold: 3,
        }
    }
}

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
