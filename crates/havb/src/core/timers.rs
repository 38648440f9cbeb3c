// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-stream timer bookkeeping.
//!
//! Timers are plain `Option<Instant>` deadlines owned by the stream state
//! they belong to; nothing here spawns threads or registers callbacks. The
//! engine polls `take_expired()` on each tick and feeds the returned kinds
//! back into the state machine as explicit events, and `next_deadline()`
//! tells the host how long it may sleep.

use std::time::{Duration, Instant};

use crate::config;

/// Timer kinds of a MILAN listener sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerTimer {
    /// Randomized pre-probe delay (TMR_DELAY).
    Delay,
    /// Probe response timeout (TMR_NO_RESP); driven by the inflight tracker.
    NoResp,
    /// Post-failure retry period (TMR_RETRY).
    Retry,
    /// SRP talker attribute grace period once settled (TMR_NO_TK).
    NoTalker,
    /// Unsolicited stream-info notification coalescing window.
    Notify,
}

/// Timer kinds of a MILAN talker stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkerTimer {
    /// PROBE_TX reception liveness window.
    ProbeWindow,
    /// SRP talker-attribute withdraw debounce.
    Withdraw,
    /// Unsolicited stream-info notification coalescing window.
    Notify,
}

/// Deadline set for one MILAN listener sink.
///
/// NoResp is not stored here: probe response timeouts come out of the
/// inflight tracker, which owns that deadline.
#[derive(Debug, Default)]
pub struct ListenerTimers {
    delay: Option<Instant>,
    retry: Option<Instant>,
    no_talker: Option<Instant>,
    notify: Option<Instant>,
}

impl ListenerTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: ListenerTimer, now: Instant, after: Duration) {
        match kind {
            ListenerTimer::Delay => self.delay = Some(now + after),
            ListenerTimer::Retry => self.retry = Some(now + after),
            ListenerTimer::NoTalker => self.no_talker = Some(now + after),
            ListenerTimer::Notify => self.notify = Some(now + after),
            ListenerTimer::NoResp => {}
        }
    }

    /// Arm the notify coalescing window only if it is not already running,
    /// so a burst of changes collapses into one notification.
    pub fn arm_notify(&mut self, now: Instant) {
        if self.notify.is_none() {
            self.notify = Some(now + Duration::from_millis(config::MILAN_LISTENER_NOTIFY_MS));
        }
    }

    pub fn stop(&mut self, kind: ListenerTimer) {
        match kind {
            ListenerTimer::Delay => self.delay = None,
            ListenerTimer::Retry => self.retry = None,
            ListenerTimer::NoTalker => self.no_talker = None,
            ListenerTimer::Notify => self.notify = None,
            ListenerTimer::NoResp => {}
        }
    }

    /// Stop every state-machine timer. The notify window survives: a
    /// pending notification must still fire after an unbind.
    pub fn stop_phase_timers(&mut self) {
        self.delay = None;
        self.retry = None;
        self.no_talker = None;
    }

    #[must_use]
    pub fn is_armed(&self, kind: ListenerTimer) -> bool {
        match kind {
            ListenerTimer::Delay => self.delay.is_some(),
            ListenerTimer::Retry => self.retry.is_some(),
            ListenerTimer::NoTalker => self.no_talker.is_some(),
            ListenerTimer::Notify => self.notify.is_some(),
            ListenerTimer::NoResp => false,
        }
    }

    /// Pop every expired timer, clearing it (single-shot).
    pub fn take_expired(&mut self, now: Instant, out: &mut Vec<ListenerTimer>) {
        if take_due(&mut self.delay, now) {
            out.push(ListenerTimer::Delay);
        }
        if take_due(&mut self.retry, now) {
            out.push(ListenerTimer::Retry);
        }
        if take_due(&mut self.no_talker, now) {
            out.push(ListenerTimer::NoTalker);
        }
        if take_due(&mut self.notify, now) {
            out.push(ListenerTimer::Notify);
        }
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(&[self.delay, self.retry, self.no_talker, self.notify])
    }
}

/// Deadline set for one MILAN talker stream.
#[derive(Debug, Default)]
pub struct TalkerTimers {
    probe_window: Option<Instant>,
    withdraw: Option<Instant>,
    notify: Option<Instant>,
}

impl TalkerTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TalkerTimer, now: Instant, after: Duration) {
        match kind {
            TalkerTimer::ProbeWindow => self.probe_window = Some(now + after),
            TalkerTimer::Withdraw => self.withdraw = Some(now + after),
            TalkerTimer::Notify => self.notify = Some(now + after),
        }
    }

    pub fn arm_notify(&mut self, now: Instant) {
        if self.notify.is_none() {
            self.notify = Some(now + Duration::from_millis(config::MILAN_TALKER_NOTIFY_MS));
        }
    }

    pub fn stop(&mut self, kind: TalkerTimer) {
        match kind {
            TalkerTimer::ProbeWindow => self.probe_window = None,
            TalkerTimer::Withdraw => self.withdraw = None,
            TalkerTimer::Notify => self.notify = None,
        }
    }

    #[must_use]
    pub fn is_armed(&self, kind: TalkerTimer) -> bool {
        match kind {
            TalkerTimer::ProbeWindow => self.probe_window.is_some(),
            TalkerTimer::Withdraw => self.withdraw.is_some(),
            TalkerTimer::Notify => self.notify.is_some(),
        }
    }

    pub fn take_expired(&mut self, now: Instant, out: &mut Vec<TalkerTimer>) {
        if take_due(&mut self.probe_window, now) {
            out.push(TalkerTimer::ProbeWindow);
        }
        if take_due(&mut self.withdraw, now) {
            out.push(TalkerTimer::Withdraw);
        }
        if take_due(&mut self.notify, now) {
            out.push(TalkerTimer::Notify);
        }
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(&[self.probe_window, self.withdraw, self.notify])
    }
}

fn take_due(slot: &mut Option<Instant>, now: Instant) -> bool {
    match slot {
        Some(deadline) if *deadline <= now => {
            *slot = None;
            true
        }
        _ => false,
    }
}

fn earliest(slots: &[Option<Instant>]) -> Option<Instant> {
    slots.iter().flatten().copied().min()
}

/// Randomized probe delay in [TMR_DELAY_MIN, TMR_DELAY_MAX].
///
/// Seeded from wall-clock sub-millisecond bits so sinks on different
/// devices bound to the same talker do not probe in lockstep.
#[must_use]
pub fn probe_delay() -> Duration {
    let span = config::MILAN_TMR_DELAY_MAX_MS - config::MILAN_TMR_DELAY_MIN_MS;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(config::MILAN_TMR_DELAY_MIN_MS + u64::from(nanos) % (span + 1))
}
