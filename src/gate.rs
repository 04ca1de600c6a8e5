// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Render throttling and mutual exclusion.
//!
//! The gate decides, per incoming attempt, whether to render now, later, or not at all. It owns
//! no timers itself: the caller asks for [`RenderGate::deadline`] and calls
//! [`RenderGate::fire_pending`] once that instant passes.
//!
//! Partial attempts are disposable: a newer snapshot replaces a scheduled one, and a snapshot that
//! comes due while a render is in flight is dropped. Final attempts are never dropped; one that
//! arrives during a render waits for it to finish.

use std::time::Duration;

use tokio::time::Instant;

/// Minimum spacing between the starts of two partial renders.
pub const THROTTLE_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<T> {
    /// Start the render now; call [`RenderGate::begin`] first.
    Run(T),
    /// Stored until the returned deadline.
    Scheduled { deadline: Instant },
    /// A render is in flight; the partial attempt is dropped.
    Skipped,
    /// A render is in flight; the final attempt runs when [`RenderGate::finish`] is called.
    Deferred,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    deadline: Instant,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct RenderGate<T> {
    interval: Duration,
    last_started: Option<Instant>,
    pending: Option<Pending<T>>,
    in_flight: bool,
    deferred_final: Option<T>,
}

impl<T> Default for RenderGate<T> {
    fn default() -> Self {
        Self::with_interval(THROTTLE_INTERVAL)
    }
}

impl<T> RenderGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, last_started: None, pending: None, in_flight: false, deferred_final: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_deferred_final(&self) -> bool {
        self.deferred_final.is_some()
    }

    /// When the scheduled partial attempt comes due, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Drops the scheduled partial attempt, if any.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn offer_partial(&mut self, payload: T, now: Instant) -> GateDecision<T> {
        self.cancel_pending();

        let due_at = self.last_started.map(|started| started + self.interval);
        match due_at {
            Some(deadline) if deadline > now => {
                self.pending = Some(Pending { deadline, payload });
                GateDecision::Scheduled { deadline }
            }
            _ if self.in_flight => GateDecision::Skipped,
            _ => GateDecision::Run(payload),
        }
    }

    /// Takes the scheduled partial attempt once its deadline has passed.
    ///
    /// Returns `None` when nothing is due, or when a render is in flight (the attempt is then
    /// dropped, not rescheduled).
    pub fn fire_pending(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().map_or(true, |pending| pending.deadline > now) {
            return None;
        }
        let pending = self.pending.take()?;
        if self.in_flight {
            return None;
        }
        Some(pending.payload)
    }

    pub fn offer_final(&mut self, payload: T) -> GateDecision<T> {
        self.cancel_pending();

        if self.in_flight {
            self.deferred_final = Some(payload);
            return GateDecision::Deferred;
        }
        GateDecision::Run(payload)
    }

    pub fn begin(&mut self, now: Instant) {
        debug_assert!(!self.in_flight, "renders must not overlap");
        self.in_flight = true;
        self.last_started = Some(now);
    }

    /// Marks the in-flight render as done and hands back a final attempt that was waiting on it.
    pub fn finish(&mut self) -> Option<T> {
        self.in_flight = false;
        self.deferred_final.take()
    }

    /// Drops every queued attempt. A render already in flight still has to be finished.
    pub fn clear_queued(&mut self) -> (bool, Option<T>) {
        (self.cancel_pending(), self.deferred_final.take())
    }
}
