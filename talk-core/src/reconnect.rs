//! Reconnect/backoff state machine for the operation poller.
//!
//! This module provides a pure, side-effect-free state machine that decides
//! what a poll-cycle outcome means for the session. It takes events as input
//! and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (re-authenticating, notifying the user, stopping the loop)
//! is performed by talk-client, not by this module.

/// Default number of consecutive failures tolerated before giving up.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Retry budget for the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Failures tolerated in a row; one more is fatal.
    pub max_consecutive_failures: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Health of the polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Polling normally (possibly after swallowed failures).
    Healthy,
    /// Token rejected, re-authentication in progress.
    Reauthenticating,
    /// Retry budget exhausted. Absorbing.
    Fatal,
}

/// How a failed cycle should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport status 400: the session token expired.
    AuthExpired,
    /// Any other transport, protocol or parse failure.
    Transient,
    /// The caller cancelled. Never counted.
    Cancelled,
}

/// Events fed into the state machine by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectEvent {
    /// A cycle returned a batch (possibly empty).
    CycleSucceeded,
    /// A cycle failed.
    CycleFailed {
        /// Classification of the failure.
        kind: FailureKind,
    },
    /// Re-authentication with the stored token succeeded.
    ReauthSucceeded,
    /// Re-authentication with the stored token failed.
    ReauthFailed,
}

/// Actions to be executed by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Open a fresh connection and replay the stored token.
    Reauthenticate,
    /// Keep polling on the normal cadence.
    Continue,
    /// Emit the single terminal notification and stop polling.
    NotifyFatal {
        /// Consecutive failures that exhausted the budget.
        failures: u32,
    },
}

/// Reconnect state - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectState {
    phase: Phase,
    consecutive_failures: u32,
    policy: ReconnectPolicy,
}

impl ReconnectState {
    /// Create a healthy state with the given retry budget.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            phase: Phase::Healthy,
            consecutive_failures: 0,
            policy,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Failures in a row since the last successful cycle.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Check whether the budget has been exhausted.
    pub fn is_fatal(&self) -> bool {
        self.phase == Phase::Fatal
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (talk-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: ReconnectEvent) -> (Self, Vec<ReconnectAction>) {
        match (self.phase, event) {
            (Phase::Fatal, _) => (self, vec![]),

            (_, ReconnectEvent::CycleSucceeded) | (_, ReconnectEvent::ReauthSucceeded) => (
                Self {
                    phase: Phase::Healthy,
                    consecutive_failures: 0,
                    ..self
                },
                vec![ReconnectAction::Continue],
            ),

            (
                _,
                ReconnectEvent::CycleFailed {
                    kind: FailureKind::AuthExpired,
                },
            ) => (
                Self {
                    phase: Phase::Reauthenticating,
                    ..self
                },
                vec![ReconnectAction::Reauthenticate],
            ),

            (
                _,
                ReconnectEvent::CycleFailed {
                    kind: FailureKind::Cancelled,
                },
            ) => (self, vec![ReconnectAction::Continue]),

            (
                _,
                ReconnectEvent::CycleFailed {
                    kind: FailureKind::Transient,
                },
            )
            | (_, ReconnectEvent::ReauthFailed) => self.record_failure(),
        }
    }

    fn record_failure(self) -> (Self, Vec<ReconnectAction>) {
        let failures = self.consecutive_failures.saturating_add(1);
        if failures > self.policy.max_consecutive_failures {
            (
                Self {
                    phase: Phase::Fatal,
                    consecutive_failures: failures,
                    ..self
                },
                vec![ReconnectAction::NotifyFatal { failures }],
            )
        } else {
            (
                Self {
                    phase: Phase::Healthy,
                    consecutive_failures: failures,
                    ..self
                },
                vec![ReconnectAction::Continue],
            )
        }
    }
}

impl Default for ReconnectState {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
