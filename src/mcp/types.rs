// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pipeline::VisualError;
use crate::theme::Theme;
use crate::view::{Presentation, Size, ViewTransform};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramStreamParams {
    /// Mermaid text received so far; may end mid-token.
    pub mermaid: String,
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramStreamResponse {
    pub queued: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DiagramRenderParams {
    pub mermaid: String,
    pub theme: Option<Theme>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum McpRenderStatus {
    Committed,
    Failed,
    TornDown,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramRenderResponse {
    pub status: McpRenderStatus,
    pub theme: Theme,
    pub render_id: Option<String>,
    pub checkpoint_id: Option<String>,
    pub error: Option<VisualError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct McpDiagramState {
    pub mermaid: String,
    pub theme: Theme,
    pub title: Option<String>,
    pub checkpoint_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct McpViewState {
    pub presentation: Presentation,
    pub inline: ViewTransform,
    pub expanded: ViewTransform,
    pub viewport: Option<Size>,
    pub user_theme: Option<Theme>,
    pub host_dark: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramReadResponse {
    pub diagram: Option<McpDiagramState>,
    pub render_id: Option<String>,
    pub svg: Option<String>,
    pub error: Option<VisualError>,
    pub streaming: bool,
    pub rendering: bool,
    pub silent_failures: u32,
    pub view: McpViewState,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DiagramExportParams {
    /// File stem under the export folder; omit to only return the SVG.
    pub name: Option<String>,
    /// Also return the SVG as a `data:image/svg+xml;base64,` URI.
    #[serde(default)]
    pub data_uri: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramExportResponse {
    pub render_id: String,
    pub svg: String,
    pub original_bytes: u64,
    pub optimized_bytes: u64,
    pub path: Option<String>,
    pub data_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagramCloseResponse {
    pub closed: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ViewPanParams {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ViewZoomParams {
    /// Wheel delta: positive zooms out, negative zooms in, zero does nothing.
    pub delta_y: f64,
    /// Number of wheel notches (default 1).
    pub steps: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ViewFitParams {
    /// Viewport width; defaults to the last reported viewport.
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ViewViewportParams {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ViewPresentationParams {
    pub presentation: Presentation,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ViewResponse {
    pub view: McpViewState,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HostContextParams {
    pub dark_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HostContextResponse {
    pub dark_mode: bool,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ThemeSelectParams {
    /// Omit to clear the selection.
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThemeSelectResponse {
    pub user_theme: Option<Theme>,
    /// Theme of the diagram on screen after the selection.
    pub diagram_theme: Option<Theme>,
}
