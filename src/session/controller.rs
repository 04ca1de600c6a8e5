// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::{pending, Future};
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use super::{
    DiagramState, FinalInput, PartialInput, RenderReport, RenderStatus, SessionEvent,
    SessionOptions, SessionSnapshot, ToolResult, ViewCommand,
};
use crate::engine::RenderEngine;
use crate::gate::{GateDecision, RenderGate};
use crate::pipeline::{
    AttemptOutcome, CommittedVisual, Partiality, RenderAttempt, RenderPipeline, VisualError,
};
use crate::theme::{resolve_theme, Theme, ThemeSignals};
use crate::view::{
    bounding_size, InteractionSurface, Presentation, SettleState, Size, ViewportSettle,
    FRAME_INTERVAL,
};

/// Consecutive silent partial failures after which a warning is logged (once per streak).
pub const SILENT_FAILURE_WARN_AFTER: u32 = 10;

type AttemptFuture = Pin<Box<dyn Future<Output = AttemptOutcome> + Send>>;
type Waiter = oneshot::Sender<RenderReport>;

struct InFlight {
    future: AttemptFuture,
    theme: Theme,
    waiters: Vec<Waiter>,
    /// Torn down while running; the outcome is thrown away.
    orphaned: bool,
}

struct Settling {
    settle: ViewportSettle,
    frames: Interval,
}

pub struct SessionController<E> {
    pipeline: RenderPipeline<E>,
    events: mpsc::Receiver<SessionEvent>,
    gate: RenderGate<RenderAttempt>,
    visual: CommittedVisual,
    state: Option<DiagramState>,
    agent_theme: Option<Theme>,
    user_theme: Option<Theme>,
    host_dark: bool,
    streaming: bool,
    surface: InteractionSurface,
    viewport: Option<Size>,
    settling: Option<Settling>,
    in_flight: Option<InFlight>,
    final_waiters: Vec<Waiter>,
    silent_failures: u32,
}

async fn next_outcome(in_flight: &mut Option<InFlight>) -> AttemptOutcome {
    match in_flight {
        Some(in_flight) => in_flight.future.as_mut().await,
        None => pending().await,
    }
}

async fn next_frame(settling: &mut Option<Settling>) -> Instant {
    match settling {
        Some(settling) => settling.frames.tick().await,
        None => pending().await,
    }
}

fn answer(waiters: Vec<Waiter>, report: &RenderReport) {
    for waiter in waiters {
        let _ = waiter.send(report.clone());
    }
}

impl<E: RenderEngine> SessionController<E> {
    pub(crate) fn new(
        pipeline: RenderPipeline<E>,
        events: mpsc::Receiver<SessionEvent>,
        options: SessionOptions,
    ) -> Self {
        Self {
            pipeline,
            events,
            gate: RenderGate::with_interval(options.throttle_interval),
            visual: CommittedVisual::default(),
            state: None,
            agent_theme: None,
            user_theme: None,
            host_dark: options.host_dark,
            streaming: false,
            surface: InteractionSurface::default(),
            viewport: None,
            settling: None,
            in_flight: None,
            final_waiters: Vec::new(),
            silent_failures: 0,
        }
    }

    /// Handles events until every [`super::SessionHandle`] is dropped.
    pub async fn run(mut self) {
        loop {
            let deadline = self.gate.deadline();
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                outcome = next_outcome(&mut self.in_flight) => self.complete(outcome),
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire_pending();
                }
                now = next_frame(&mut self.settling) => self.sample_viewport(now),
            }
        }

        // Let a running attempt finish so its engine artifacts are disposed.
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.future.await;
        }
        tracing::debug!("session controller stopped");
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::PartialInput(input) => self.on_partial(input),
            SessionEvent::FinalInput { input, done } => self.on_final(input, done),
            SessionEvent::ToolResult(result) => self.on_tool_result(result),
            SessionEvent::Teardown => self.teardown(),
            SessionEvent::View(command) => self.on_view(command),
            SessionEvent::HostContext { dark_mode } => {
                // Applies from the next final input on.
                self.host_dark = dark_mode;
            }
            SessionEvent::UserTheme(theme) => self.on_user_theme(theme),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn on_partial(&mut self, input: PartialInput) {
        if input.mermaid.trim().is_empty() {
            return;
        }
        self.streaming = true;

        // A streamed theme is only a preview; nothing is recorded until the final input. Without
        // one, keep the palette of the diagram already on screen.
        let recorded = self.state.as_ref().map(|state| state.theme);
        let theme = resolve_theme(ThemeSignals {
            user: self.user_theme,
            agent: input.theme.or(recorded),
            host_dark: self.host_dark,
        });
        let now = Instant::now();
        match self.gate.offer_partial(RenderAttempt::partial(input.mermaid, theme), now) {
            GateDecision::Run(attempt) => self.start(attempt, now),
            GateDecision::Scheduled { deadline } => {
                let due_in_ms = deadline.duration_since(now).as_millis() as u64;
                tracing::trace!(due_in_ms, "partial render scheduled");
            }
            GateDecision::Skipped | GateDecision::Deferred => {
                tracing::trace!("partial render skipped; another render is in flight");
            }
        }
    }

    fn on_final(&mut self, input: FinalInput, done: Option<Waiter>) {
        let theme = resolve_theme(ThemeSignals {
            user: self.user_theme,
            agent: input.theme,
            host_dark: self.host_dark,
        });
        if let Err(err) = input.validate() {
            if let Some(done) = done {
                let _ = done.send(RenderReport {
                    status: RenderStatus::Failed,
                    theme,
                    render_id: None,
                    error: Some(VisualError { message: err.to_string(), position: None }),
                });
            }
            return;
        }

        self.streaming = false;
        self.agent_theme = input.theme;
        self.state = Some(DiagramState {
            mermaid: input.mermaid.clone(),
            theme,
            title: input.title,
            checkpoint_id: None,
        });
        self.final_waiters.extend(done);
        self.offer_final(RenderAttempt::complete(input.mermaid, theme));
    }

    fn offer_final(&mut self, attempt: RenderAttempt) {
        match self.gate.offer_final(attempt) {
            GateDecision::Run(attempt) => self.start(attempt, Instant::now()),
            GateDecision::Deferred => {
                tracing::debug!("final render deferred until the current one finishes");
            }
            GateDecision::Scheduled { .. } | GateDecision::Skipped => {}
        }
    }

    fn on_tool_result(&mut self, result: ToolResult) {
        let Some(state) = self.state.as_mut() else {
            tracing::debug!(checkpoint_id = %result.checkpoint_id, "tool result without a diagram");
            return;
        };
        if let Some(echoed) = result.theme.filter(|echoed| *echoed != state.theme) {
            tracing::debug!(%echoed, kept = %state.theme, "ignoring echoed theme");
        }
        state.checkpoint_id = Some(result.checkpoint_id);
    }

    fn on_user_theme(&mut self, theme: Option<Theme>) {
        self.user_theme = theme;
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let resolved = resolve_theme(ThemeSignals {
            user: theme,
            agent: self.agent_theme,
            host_dark: self.host_dark,
        });
        if resolved == state.theme {
            return;
        }
        state.theme = resolved;
        let attempt = RenderAttempt::complete(state.mermaid.clone(), resolved);
        self.offer_final(attempt);
    }

    fn start(&mut self, attempt: RenderAttempt, now: Instant) {
        self.gate.begin(now);
        let waiters = match attempt.partiality {
            Partiality::Partial => Vec::new(),
            Partiality::Final => std::mem::take(&mut self.final_waiters),
        };
        let theme = attempt.theme;
        let future = Box::pin(self.pipeline.attempt(attempt));
        self.in_flight = Some(InFlight { future, theme, waiters, orphaned: false });
    }

    fn complete(&mut self, outcome: AttemptOutcome) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        if in_flight.orphaned {
            tracing::debug!("discarding render of a torn-down surface");
        } else {
            self.track_silent_failures(&outcome);
            let report = match &outcome {
                AttemptOutcome::Committed(graphic) => RenderReport {
                    status: RenderStatus::Committed,
                    theme: in_flight.theme,
                    render_id: Some(graphic.render_id.clone()),
                    error: None,
                },
                AttemptOutcome::Rejected { error, .. } => RenderReport {
                    status: RenderStatus::Failed,
                    theme: in_flight.theme,
                    render_id: None,
                    error: Some(error.clone()),
                },
            };
            self.visual.apply(outcome);
            answer(in_flight.waiters, &report);
        }

        if let Some(next) = self.gate.finish() {
            self.start(next, Instant::now());
        }
    }

    fn track_silent_failures(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Rejected { surfaced: false, error } => {
                self.silent_failures += 1;
                if self.silent_failures == SILENT_FAILURE_WARN_AFTER {
                    tracing::warn!(
                        failures = self.silent_failures,
                        reason = %error.message,
                        "partial renders keep failing; the engine may be broken for this input"
                    );
                }
            }
            AttemptOutcome::Committed(_) => self.silent_failures = 0,
            AttemptOutcome::Rejected { surfaced: true, .. } => {}
        }
    }

    fn fire_pending(&mut self) {
        let now = Instant::now();
        match self.gate.fire_pending(now) {
            Some(attempt) => self.start(attempt, now),
            None => tracing::trace!("scheduled partial dropped; a render is in flight"),
        }
    }

    fn teardown(&mut self) {
        let (cancelled, deferred) = self.gate.clear_queued();
        tracing::debug!(cancelled, deferred = deferred.is_some(), "surface torn down");

        let theme = self.state.as_ref().map_or(Theme::Default, |state| state.theme);
        let report = RenderReport::torn_down(theme);
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.orphaned = true;
            answer(std::mem::take(&mut in_flight.waiters), &report);
        }
        answer(std::mem::take(&mut self.final_waiters), &report);

        self.visual = CommittedVisual::default();
        self.state = None;
        self.agent_theme = None;
        self.user_theme = None;
        self.streaming = false;
        self.surface = InteractionSurface::default();
        self.viewport = None;
        self.settling = None;
        self.silent_failures = 0;
    }

    fn on_view(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Pan { dx, dy } => {
                self.surface.pan(dx, dy);
            }
            ViewCommand::Wheel { delta_y } => {
                self.surface.wheel(delta_y);
            }
            ViewCommand::Fit { viewport } => {
                self.viewport = Some(viewport);
                self.fit(viewport);
            }
            ViewCommand::Viewport(size) => self.viewport = Some(size),
            ViewCommand::Presentation(presentation) => self.set_presentation(presentation),
        }
    }

    fn set_presentation(&mut self, presentation: Presentation) {
        if !self.surface.set_presentation(presentation) {
            return;
        }
        self.settling = match presentation {
            Presentation::Expanded => {
                let now = Instant::now();
                let mut frames = interval_at(now + FRAME_INTERVAL, FRAME_INTERVAL);
                frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
                let settle = ViewportSettle::new(now, self.viewport);
                Some(Settling { settle, frames })
            }
            Presentation::Inline => None,
        };
    }

    fn sample_viewport(&mut self, now: Instant) {
        let Some(settling) = self.settling.as_mut() else {
            return;
        };
        match settling.settle.sample(self.viewport, now) {
            SettleState::Waiting => {}
            SettleState::Settled(viewport) => {
                self.settling = None;
                tracing::debug!(
                    width = viewport.width,
                    height = viewport.height,
                    "viewport settled"
                );
                self.fit(viewport);
            }
            SettleState::Abandoned => {
                self.settling = None;
                tracing::debug!("no viewport size reported; skipping auto-fit");
            }
        }
    }

    fn fit(&mut self, viewport: Size) {
        let Some(svg) = self.visual.svg() else {
            return;
        };
        if self.surface.fit(viewport, |transform| bounding_size(svg, transform)).is_none() {
            tracing::debug!("fit skipped; graphic or viewport has no usable size");
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            svg: self.visual.svg().map(str::to_owned),
            render_id: self.visual.graphic().map(|graphic| graphic.render_id.clone()),
            error: self.visual.error().cloned(),
            streaming: self.streaming,
            rendering: self.in_flight.as_ref().is_some_and(|in_flight| !in_flight.orphaned),
            presentation: self.surface.presentation(),
            inline: self.surface.transform(Presentation::Inline),
            expanded: self.surface.transform(Presentation::Expanded),
            viewport: self.viewport,
            user_theme: self.user_theme,
            host_dark: self.host_dark,
            silent_failures: self.silent_failures,
        }
    }
}
