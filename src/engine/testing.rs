// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scriptable in-memory engine for pipeline and controller tests.
//!
//! Text containing `%%invalid` fails validation and rendering; text containing `%%boom` passes
//! validation but fails rendering. Every failed render leaves an artifact that must be disposed.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use super::{EngineConfig, Graphic, RenderEngine, RenderFailure};
use crate::theme::Theme;

pub(crate) const INVALID_MARKER: &str = "%%invalid";
pub(crate) const BOOM_MARKER: &str = "%%boom";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineCall {
    Validate { text: String, theme: Theme },
    Render { render_id: String, text: String, theme: Theme },
    Dispose { artifact: u64 },
}

#[derive(Debug, Default)]
struct MemoryState {
    calls: Vec<EngineCall>,
    live_artifacts: BTreeSet<u64>,
    next_artifact: u64,
    rendered: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryEngine {
    state: Mutex<MemoryState>,
    render_delay: Option<Duration>,
    hold: Option<Arc<Semaphore>>,
}

impl MemoryEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every render sleeps for `delay` before completing.
    pub(crate) fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = Some(delay);
        self
    }

    /// Every render waits for a permit released through [`MemoryEngine::release`].
    pub(crate) fn held(mut self) -> Self {
        self.hold = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub(crate) fn release(&self, renders: usize) {
        if let Some(hold) = &self.hold {
            hold.add_permits(renders);
        }
    }

    pub(crate) fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().expect("engine state").calls.clone()
    }

    /// Texts of renders that succeeded, in completion order.
    pub(crate) fn rendered_texts(&self) -> Vec<String> {
        self.state.lock().expect("engine state").rendered.clone()
    }

    pub(crate) fn render_calls(&self) -> usize {
        self.calls().iter().filter(|call| matches!(call, EngineCall::Render { .. })).count()
    }

    pub(crate) fn live_artifacts(&self) -> usize {
        self.state.lock().expect("engine state").live_artifacts.len()
    }

    fn record(&self, call: EngineCall) {
        self.state.lock().expect("engine state").calls.push(call);
    }

    fn leak_artifact(&self) -> u64 {
        let mut state = self.state.lock().expect("engine state");
        let artifact = state.next_artifact;
        state.next_artifact += 1;
        state.live_artifacts.insert(artifact);
        artifact
    }
}

pub(crate) fn fake_svg(render_id: &str, theme: Theme, text: &str) -> String {
    let last = text.lines().last().unwrap_or_default().replace('<', "&lt;");
    format!(
        "<svg id=\"{render_id}\" xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 800 600\"><g class=\"theme-{theme}\"><text>{last}</text></g></svg>"
    )
}

impl RenderEngine for MemoryEngine {
    type Artifact = u64;

    async fn validate(&self, config: &EngineConfig, text: &str) -> Result<(), RenderFailure<u64>> {
        self.record(EngineCall::Validate { text: text.to_owned(), theme: config.theme });
        if text.contains(INVALID_MARKER) {
            return Err(RenderFailure::new("Parse error on line 2:\nunexpected marker"));
        }
        Ok(())
    }

    async fn render(
        &self,
        config: &EngineConfig,
        render_id: &str,
        text: &str,
    ) -> Result<Graphic, RenderFailure<u64>> {
        self.record(EngineCall::Render {
            render_id: render_id.to_owned(),
            text: text.to_owned(),
            theme: config.theme,
        });

        if let Some(hold) = &self.hold {
            if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = self.render_delay {
            tokio::time::sleep(delay).await;
        }

        if text.contains(INVALID_MARKER) || text.contains(BOOM_MARKER) {
            let artifact = self.leak_artifact();
            return Err(RenderFailure::new("Parse error on line 2:\n--^\nrender failed")
                .with_artifact(artifact));
        }

        self.state.lock().expect("engine state").rendered.push(text.to_owned());
        Ok(Graphic {
            render_id: render_id.to_owned(),
            svg: fake_svg(render_id, config.theme, text),
        })
    }

    async fn dispose(&self, artifact: u64) {
        self.record(EngineCall::Dispose { artifact });
        self.state.lock().expect("engine state").live_artifacts.remove(&artifact);
    }
}
