// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The session controller: one live diagram surface.
//!
//! A controller task owns the diagram state, the committed visual, the render gate and the view
//! transforms. Everything else talks to it through a [`SessionHandle`], which turns calls into
//! events on a channel. Events are handled one at a time, so state changes between two engine
//! calls are atomic as far as the rest of the crate can tell.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::engine::{EngineConfig, RenderEngine};
use crate::gate::THROTTLE_INTERVAL;
use crate::pipeline::{RenderPipeline, VisualError};
use crate::theme::Theme;
use crate::view::{Presentation, Size, ViewTransform};

mod controller;

pub use controller::{SessionController, SILENT_FAILURE_WARN_AFTER};

const EVENT_QUEUE_DEPTH: usize = 256;

/// What the diagram should show, as last submitted by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramState {
    pub mermaid: String,
    pub theme: Theme,
    pub title: Option<String>,
    /// Set by the tool-result notification that follows a submission.
    pub checkpoint_id: Option<String>,
}

/// A snapshot of tool arguments that are still streaming in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialInput {
    pub mermaid: String,
    pub theme: Option<Theme>,
}

/// The complete arguments of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalInput {
    pub mermaid: String,
    pub theme: Option<Theme>,
    pub title: Option<String>,
}

impl FinalInput {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.mermaid.trim().is_empty() {
            return Err(SessionError::EmptyDiagram);
        }
        Ok(())
    }
}

/// Metadata echoed back once the host has recorded a tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub checkpoint_id: String,
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewCommand {
    Pan { dx: f64, dy: f64 },
    Wheel { delta_y: f64 },
    Fit { viewport: Size },
    Viewport(Size),
    Presentation(Presentation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Committed,
    Failed,
    /// The surface was torn down before the render finished.
    TornDown,
}

/// How a final submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub status: RenderStatus,
    pub theme: Theme,
    pub render_id: Option<String>,
    pub error: Option<VisualError>,
}

impl RenderReport {
    pub(crate) fn torn_down(theme: Theme) -> Self {
        Self { status: RenderStatus::TornDown, theme, render_id: None, error: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: Option<DiagramState>,
    pub svg: Option<String>,
    pub render_id: Option<String>,
    pub error: Option<VisualError>,
    pub streaming: bool,
    pub rendering: bool,
    pub presentation: Presentation,
    pub inline: ViewTransform,
    pub expanded: ViewTransform,
    pub viewport: Option<Size>,
    pub user_theme: Option<Theme>,
    pub host_dark: bool,
    /// Consecutive partial attempts that failed without being shown.
    pub silent_failures: u32,
}

#[derive(Debug)]
pub(crate) enum SessionEvent {
    PartialInput(PartialInput),
    FinalInput { input: FinalInput, done: Option<oneshot::Sender<RenderReport>> },
    ToolResult(ToolResult),
    Teardown,
    View(ViewCommand),
    HostContext { dark_mode: bool },
    UserTheme(Option<Theme>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("mermaid text must not be empty")]
    EmptyDiagram,
    #[error("session controller has stopped")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub engine_config: EngineConfig,
    pub throttle_interval: Duration,
    pub host_dark: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            engine_config: EngineConfig::default(),
            throttle_interval: THROTTLE_INTERVAL,
            host_dark: false,
        }
    }
}

/// Cloneable front-end of a running [`SessionController`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
}

/// Starts a controller task on the current tokio runtime.
pub fn spawn_session<E: RenderEngine>(engine: Arc<E>, options: SessionOptions) -> SessionHandle {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let pipeline = RenderPipeline::new(engine, options.engine_config);
    let controller = SessionController::new(pipeline, rx, options);
    tokio::spawn(controller.run());
    SessionHandle { events: tx }
}

impl SessionHandle {
    async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events.send(event).await.map_err(|_| SessionError::Closed)
    }

    /// Hands a streamed snapshot to the controller. Returns once it is queued, not rendered.
    pub async fn partial(&self, input: PartialInput) -> Result<(), SessionError> {
        self.send(SessionEvent::PartialInput(input)).await
    }

    /// Submits complete input and waits until it has been rendered (or has failed).
    pub async fn submit(&self, input: FinalInput) -> Result<RenderReport, SessionError> {
        input.validate()?;
        let (done, report) = oneshot::channel();
        self.send(SessionEvent::FinalInput { input, done: Some(done) }).await?;
        report.await.map_err(|_| SessionError::Closed)
    }

    pub async fn tool_result(&self, result: ToolResult) -> Result<(), SessionError> {
        self.send(SessionEvent::ToolResult(result)).await
    }

    pub async fn teardown(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Teardown).await
    }

    /// Applies a view command and returns the resulting snapshot.
    pub async fn view(&self, command: ViewCommand) -> Result<SessionSnapshot, SessionError> {
        self.send(SessionEvent::View(command)).await?;
        self.snapshot().await
    }

    pub async fn host_context(&self, dark_mode: bool) -> Result<(), SessionError> {
        self.send(SessionEvent::HostContext { dark_mode }).await
    }

    pub async fn user_theme(&self, theme: Option<Theme>) -> Result<(), SessionError> {
        self.send(SessionEvent::UserTheme(theme)).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, snapshot) = oneshot::channel();
        self.send(SessionEvent::Snapshot(reply)).await?;
        snapshot.await.map_err(|_| SessionError::Closed)
    }
}
