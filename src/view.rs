// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pan/zoom/fit arithmetic over the committed graphic.
//!
//! The inline and expanded presentations each keep their own transform. Transforms only change
//! through pan/zoom gestures or an explicit fit; switching presentation never resets them.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
pub const WHEEL_ZOOM_IN: f64 = 1.1;
/// Share of the viewport a fitted graphic occupies.
pub const FIT_MARGIN: f64 = 0.92;

/// Unchanged frames required before a resizing viewport counts as settled.
pub const SETTLE_FRAMES: u32 = 3;
pub const SETTLE_TIMEOUT: Duration = Duration::from_millis(600);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_positive(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewTransform {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self { scale: 1.0, pan_x: 0.0, pan_y: 0.0 };
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// Embedded in the host conversation.
    #[default]
    Inline,
    /// Fullscreen.
    Expanded,
}

/// Scale and offset that make `graphic` fit centred inside `viewport`.
pub fn fit_transform(graphic: Size, viewport: Size) -> Option<ViewTransform> {
    if !graphic.is_positive() || !viewport.is_positive() {
        return None;
    }
    let scale =
        (viewport.width / graphic.width).min(viewport.height / graphic.height) * FIT_MARGIN;
    Some(ViewTransform {
        scale,
        pan_x: (viewport.width - graphic.width * scale) / 2.0,
        pan_y: (viewport.height - graphic.height * scale) / 2.0,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionSurface {
    inline: ViewTransform,
    expanded: ViewTransform,
    presentation: Presentation,
}

impl InteractionSurface {
    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    /// Returns whether the presentation changed.
    pub fn set_presentation(&mut self, presentation: Presentation) -> bool {
        let changed = self.presentation != presentation;
        self.presentation = presentation;
        changed
    }

    pub fn transform(&self, presentation: Presentation) -> ViewTransform {
        match presentation {
            Presentation::Inline => self.inline,
            Presentation::Expanded => self.expanded,
        }
    }

    pub fn active(&self) -> ViewTransform {
        self.transform(self.presentation)
    }

    fn active_mut(&mut self) -> &mut ViewTransform {
        match self.presentation {
            Presentation::Inline => &mut self.inline,
            Presentation::Expanded => &mut self.expanded,
        }
    }

    /// Adds a drag delta to the offset; no clamping.
    pub fn pan(&mut self, dx: f64, dy: f64) -> ViewTransform {
        let transform = self.active_mut();
        transform.pan_x += dx;
        transform.pan_y += dy;
        *transform
    }

    /// One wheel notch: positive `delta_y` zooms out, negative zooms in.
    pub fn wheel(&mut self, delta_y: f64) -> ViewTransform {
        let transform = self.active_mut();
        let factor = if delta_y > 0.0 {
            WHEEL_ZOOM_OUT
        } else if delta_y < 0.0 {
            WHEEL_ZOOM_IN
        } else {
            return *transform;
        };
        transform.scale = (transform.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        *transform
    }

    /// Calls `measure` with the active transform set to identity, then restores it.
    pub fn measure_unscaled<R>(&mut self, measure: impl FnOnce(&ViewTransform) -> R) -> R {
        let saved = std::mem::replace(self.active_mut(), ViewTransform::IDENTITY);
        let measured = measure(&ViewTransform::IDENTITY);
        *self.active_mut() = saved;
        measured
    }

    /// Fits the graphic measured by `measure` into `viewport` on the active presentation.
    ///
    /// Leaves the transform untouched and returns `None` when either size is degenerate.
    pub fn fit(
        &mut self,
        viewport: Size,
        measure: impl FnOnce(&ViewTransform) -> Option<Size>,
    ) -> Option<ViewTransform> {
        let natural = self.measure_unscaled(measure)?;
        let fitted = fit_transform(natural, viewport)?;
        *self.active_mut() = fitted;
        Some(fitted)
    }
}

fn svg_root_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("valid svg root regex"))
}

fn svg_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\s(viewBox|width|height)\s*=\s*["']([^"']*)["']"#)
            .expect("valid svg attribute regex")
    })
}

fn parse_length(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed);
    number.parse::<f64>().ok()
}

/// The unscaled size of an SVG document, from its root `viewBox` or `width`/`height`.
pub fn svg_natural_size(svg: &str) -> Option<Size> {
    let root = svg_root_re().find(svg)?.as_str();

    let mut width = None;
    let mut height = None;
    for captures in svg_attr_re().captures_iter(root) {
        let value = &captures[2];
        match &captures[1] {
            "viewBox" => {
                let parts = value
                    .split(|ch: char| ch.is_whitespace() || ch == ',')
                    .filter(|part| !part.is_empty())
                    .map(str::parse::<f64>)
                    .collect::<Result<Vec<_>, _>>()
                    .ok()?;
                if let [_, _, w, h] = parts[..] {
                    let size = Size::new(w, h);
                    if size.is_positive() {
                        return Some(size);
                    }
                }
            }
            "width" => width = parse_length(value),
            "height" => height = parse_length(value),
            _ => {}
        }
    }

    let size = Size::new(width?, height?);
    size.is_positive().then_some(size)
}

/// Bounding box of `svg` drawn under `transform`.
pub fn bounding_size(svg: &str, transform: &ViewTransform) -> Option<Size> {
    svg_natural_size(svg)
        .map(|size| Size::new(size.width * transform.scale, size.height * transform.scale))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettleState {
    Waiting,
    Settled(Size),
    /// Timed out with no viewport size known at all.
    Abandoned,
}

/// Waits for the host to finish resizing the viewport after a presentation change.
///
/// Sizes equal to the baseline (the viewport known before the change) do not count until some
/// other size has been reported; the host may not have started resizing yet.
#[derive(Debug, Clone)]
pub struct ViewportSettle {
    started: Instant,
    timeout: Duration,
    baseline: Option<Size>,
    resized: bool,
    last: Option<Size>,
    stable_frames: u32,
}

impl ViewportSettle {
    pub fn new(now: Instant, baseline: Option<Size>) -> Self {
        Self {
            started: now,
            timeout: SETTLE_TIMEOUT,
            baseline,
            resized: false,
            last: None,
            stable_frames: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Feeds the viewport size observed on one frame.
    pub fn sample(&mut self, viewport: Option<Size>, now: Instant) -> SettleState {
        if let Some(size) = viewport {
            if self.resized || Some(size) != self.baseline {
                self.resized = true;
                if self.last == Some(size) {
                    self.stable_frames += 1;
                } else {
                    self.last = Some(size);
                    self.stable_frames = 0;
                }
            }
        }

        let timed_out = now.duration_since(self.started) >= self.timeout;
        match self.last {
            Some(size) if self.stable_frames >= SETTLE_FRAMES => SettleState::Settled(size),
            Some(size) if timed_out => SettleState::Settled(size),
            None if timed_out => match viewport.or(self.baseline) {
                Some(size) => SettleState::Settled(size),
                None => SettleState::Abandoned,
            },
            _ => SettleState::Waiting,
        }
    }
}
