use chrono::Duration;

use crate::command::DEFAULT_MAX_RETRIES;

/// Tunable business rules for the order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPolicy {
    /// How long after completion a return may be requested. The deadline
    /// itself is still inside the window.
    pub return_window: Duration,

    /// Re-runs allowed for a command that lost a concurrent update.
    pub max_command_retries: u32,
}

impl OrderPolicy {
    pub const DEFAULT_RETURN_WINDOW_DAYS: i64 = 7;
    pub const MAX_RETURN_WINDOW_DAYS: i64 = 3650;

    /// Sets the return window, clamped to `0..=MAX_RETURN_WINDOW_DAYS`.
    pub fn with_return_window_days(mut self, days: i64) -> Self {
        self.return_window = Duration::days(days.clamp(0, Self::MAX_RETURN_WINDOW_DAYS));
        self
    }

    pub fn with_max_command_retries(mut self, retries: u32) -> Self {
        self.max_command_retries = retries;
        self
    }
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            return_window: Duration::days(Self::DEFAULT_RETURN_WINDOW_DAYS),
            max_command_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
