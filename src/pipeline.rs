// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Repair, validate, render, then commit or discard.
//!
//! [`RenderPipeline::attempt`] produces a future that talks to the engine and resolves to an
//! [`AttemptOutcome`]. Nothing visible changes until the outcome is applied to a
//! [`CommittedVisual`], so a failed attempt can never leave a half-updated view behind.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, Graphic, RenderEngine, RenderFailure, SyntaxPosition};
use crate::repair::{repair_grouping_collisions, repair_partial};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Partiality {
    /// A streamed snapshot of input that is still being written.
    Partial,
    /// The complete input of a tool call.
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderAttempt {
    pub text: String,
    pub theme: Theme,
    pub partiality: Partiality,
}

impl RenderAttempt {
    pub fn partial(text: impl Into<String>, theme: Theme) -> Self {
        Self { text: text.into(), theme, partiality: Partiality::Partial }
    }

    pub fn complete(text: impl Into<String>, theme: Theme) -> Self {
        Self { text: text.into(), theme, partiality: Partiality::Final }
    }

    pub fn is_partial(&self) -> bool {
        self.partiality == Partiality::Partial
    }
}

/// A failure shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VisualError {
    pub message: String,
    pub position: Option<SyntaxPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Committed(Graphic),
    /// `surfaced` is set for failed final attempts only; partial failures stay silent.
    Rejected { error: VisualError, surfaced: bool },
}

/// What applying an outcome did to the visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitEffect {
    Committed,
    ErrorSurfaced,
    Unchanged,
}

/// The last good graphic and the error of the latest final attempt, if it failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommittedVisual {
    graphic: Option<Graphic>,
    error: Option<VisualError>,
}

impl CommittedVisual {
    pub fn graphic(&self) -> Option<&Graphic> {
        self.graphic.as_ref()
    }

    pub fn svg(&self) -> Option<&str> {
        self.graphic.as_ref().map(|graphic| graphic.svg.as_str())
    }

    pub fn error(&self) -> Option<&VisualError> {
        self.error.as_ref()
    }

    /// Success replaces the graphic and clears the error. A surfaced failure records its error
    /// and keeps the graphic. A silent failure changes nothing.
    pub fn apply(&mut self, outcome: AttemptOutcome) -> CommitEffect {
        match outcome {
            AttemptOutcome::Committed(graphic) => {
                self.graphic = Some(graphic);
                self.error = None;
                CommitEffect::Committed
            }
            AttemptOutcome::Rejected { error, surfaced: true } => {
                self.error = Some(error);
                CommitEffect::ErrorSurfaced
            }
            AttemptOutcome::Rejected { surfaced: false, .. } => CommitEffect::Unchanged,
        }
    }
}

/// Runs the repair passes that apply to `text`.
///
/// Partial text goes through the prefix repair first; the subgraph collision pass runs always.
pub fn prepare(text: &str, partiality: Partiality) -> String {
    let repaired = match partiality {
        Partiality::Partial => Cow::Owned(repair_partial(text)),
        Partiality::Final => Cow::Borrowed(text),
    };
    repair_grouping_collisions(&repaired).into_owned()
}

pub struct RenderPipeline<E> {
    engine: Arc<E>,
    base_config: EngineConfig,
    renders: u64,
}

impl<E: RenderEngine> RenderPipeline<E> {
    pub fn new(engine: Arc<E>, base_config: EngineConfig) -> Self {
        Self { engine, base_config, renders: 0 }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn base_config(&self) -> EngineConfig {
        self.base_config
    }

    /// Builds the future for one attempt. The future owns everything it needs, so the caller can
    /// keep handling events while it runs.
    pub fn attempt(
        &mut self,
        attempt: RenderAttempt,
    ) -> impl Future<Output = AttemptOutcome> + Send + 'static {
        self.renders += 1;
        let render_id = format!("nereid-live-{}", self.renders);
        let engine = Arc::clone(&self.engine);
        let config = self.base_config.with_theme(attempt.theme);

        async move { run_attempt(&*engine, config, render_id, attempt).await }
    }
}

async fn discard<E: RenderEngine>(engine: &E, artifact: Option<E::Artifact>) {
    if let Some(artifact) = artifact {
        engine.dispose(artifact).await;
    }
}

async fn run_attempt<E: RenderEngine>(
    engine: &E,
    config: EngineConfig,
    render_id: String,
    attempt: RenderAttempt,
) -> AttemptOutcome {
    let partial = attempt.is_partial();
    let text = prepare(&attempt.text, attempt.partiality);

    if partial {
        if let Err(failure) = engine.validate(&config, &text).await {
            tracing::debug!(
                %render_id,
                reason = %failure.reason,
                "partial snapshot does not parse yet"
            );
            let RenderFailure { reason, position, artifact } = failure;
            discard(engine, artifact).await;
            return AttemptOutcome::Rejected {
                error: VisualError { message: reason, position },
                surfaced: false,
            };
        }
    }

    match engine.render(&config, &render_id, &text).await {
        Ok(graphic) => {
            tracing::debug!(%render_id, partial, bytes = graphic.svg.len(), "render succeeded");
            AttemptOutcome::Committed(graphic)
        }
        Err(RenderFailure { reason, position, artifact }) => {
            discard(engine, artifact).await;
            if partial {
                tracing::debug!(%render_id, %reason, "partial render failed");
            } else {
                tracing::warn!(%render_id, %reason, "final render failed");
            }
            AttemptOutcome::Rejected {
                error: VisualError { message: reason, position },
                surfaced: !partial,
            }
        }
    }
}
