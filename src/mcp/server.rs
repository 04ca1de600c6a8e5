// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};

use crate::optimize::{optimize_svg, OptimizeError};
use crate::session::{
    FinalInput, PartialInput, RenderReport, RenderStatus, SessionError, SessionHandle,
    SessionSnapshot, ToolResult, ViewCommand,
};
use crate::store::{ExportFolder, StoreError};
use crate::view::Size;

use super::types::*;

#[derive(Clone)]
pub struct NereidLiveMcp {
    session: SessionHandle,
    export_folder: Option<Arc<ExportFolder>>,
    checkpoints: Arc<AtomicU64>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl NereidLiveMcp {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            export_folder: None,
            checkpoints: Arc::new(AtomicU64::new(0)),
            tool_router: Self::tool_router(),
        }
    }

    pub fn with_export_folder(mut self, export_folder: ExportFolder) -> Self {
        self.export_folder = Some(Arc::new(export_folder));
        self
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    fn next_checkpoint_id(&self) -> String {
        let next = self.checkpoints.fetch_add(1, Ordering::Relaxed) + 1;
        format!("ckpt-{next:04}")
    }

    /// Feed a partial Mermaid snapshot while the diagram is still being written; renders are
    /// throttled and broken snapshots never replace the last good picture.
    #[tool(name = "diagram.stream")]
    async fn diagram_stream(
        &self,
        params: Parameters<DiagramStreamParams>,
    ) -> Result<Json<DiagramStreamResponse>, ErrorData> {
        let DiagramStreamParams { mermaid, theme } = params.0;
        let queued = !mermaid.trim().is_empty();
        self.session.partial(PartialInput { mermaid, theme }).await.map_err(map_session_error)?;
        Ok(Json(DiagramStreamResponse { queued }))
    }

    /// Render complete Mermaid text and wait for the result; a failed render keeps the previous
    /// picture and reports the error (with line/column when known).
    #[tool(name = "diagram.render")]
    async fn diagram_render(
        &self,
        params: Parameters<DiagramRenderParams>,
    ) -> Result<Json<DiagramRenderResponse>, ErrorData> {
        let DiagramRenderParams { mermaid, theme, title } = params.0;
        let report = self
            .session
            .submit(FinalInput { mermaid, theme, title })
            .await
            .map_err(map_session_error)?;

        let checkpoint_id = if report.status == RenderStatus::TornDown {
            None
        } else {
            let checkpoint_id = self.next_checkpoint_id();
            self.session
                .tool_result(ToolResult {
                    checkpoint_id: checkpoint_id.clone(),
                    theme: Some(report.theme),
                })
                .await
                .map_err(map_session_error)?;
            Some(checkpoint_id)
        };

        Ok(Json(render_response(report, checkpoint_id)))
    }

    /// Read the diagram state, the committed SVG, the visible error and both view transforms.
    #[tool(name = "diagram.read")]
    async fn diagram_read(&self) -> Result<Json<DiagramReadResponse>, ErrorData> {
        let snapshot = self.session.snapshot().await.map_err(map_session_error)?;
        Ok(Json(read_response(snapshot)))
    }

    /// Export the committed SVG with comments, whitespace and excess precision removed;
    /// optionally write it to the export folder as `<name>.svg`.
    #[tool(name = "diagram.export")]
    async fn diagram_export(
        &self,
        params: Parameters<DiagramExportParams>,
    ) -> Result<Json<DiagramExportResponse>, ErrorData> {
        let snapshot = self.session.snapshot().await.map_err(map_session_error)?;
        let (Some(render_id), Some(svg)) = (snapshot.render_id, snapshot.svg) else {
            return Err(ErrorData::resource_not_found("no rendered diagram to export", None));
        };

        let optimized = optimize_svg(&svg).map_err(|err| map_optimize_error(&render_id, err))?;

        let path = match params.0.name.as_deref() {
            None => None,
            Some(name) => {
                let export_folder = self.export_folder.as_ref().ok_or_else(|| {
                    ErrorData::invalid_request(
                        "no export folder configured (start the server with --export-dir)",
                        Some(serde_json::json!({ "name": name })),
                    )
                })?;
                let path = export_folder.write_svg(name, &optimized).map_err(map_store_error)?;
                tracing::info!(%render_id, path = %path.display(), "exported diagram");
                Some(path.display().to_string())
            }
        };

        let data_uri = params.0.data_uri.then(|| svg_data_uri(&optimized));
        Ok(Json(DiagramExportResponse {
            render_id,
            original_bytes: svg.len() as u64,
            optimized_bytes: optimized.len() as u64,
            svg: optimized,
            path,
            data_uri,
        }))
    }

    /// Tear down the displayed diagram: pending renders are cancelled and the next
    /// `diagram.render` starts a fresh surface.
    #[tool(name = "diagram.close")]
    async fn diagram_close(&self) -> Result<Json<DiagramCloseResponse>, ErrorData> {
        self.session.teardown().await.map_err(map_session_error)?;
        Ok(Json(DiagramCloseResponse { closed: true }))
    }

    /// Drag the active view by `(dx, dy)` pixels; panning is unbounded.
    #[tool(name = "view.pan")]
    async fn view_pan(
        &self,
        params: Parameters<ViewPanParams>,
    ) -> Result<Json<ViewResponse>, ErrorData> {
        let ViewPanParams { dx, dy } = params.0;
        if !dx.is_finite() || !dy.is_finite() {
            return Err(ErrorData::invalid_params(
                "pan deltas must be finite",
                Some(serde_json::json!({ "dx": dx.to_string(), "dy": dy.to_string() })),
            ));
        }
        let snapshot =
            self.session.view(ViewCommand::Pan { dx, dy }).await.map_err(map_session_error)?;
        Ok(Json(ViewResponse { view: view_state(&snapshot) }))
    }

    /// Zoom the active view by wheel notches (positive `delta_y` zooms out); scale stays within
    /// 0.1..=5.0.
    #[tool(name = "view.zoom")]
    async fn view_zoom(
        &self,
        params: Parameters<ViewZoomParams>,
    ) -> Result<Json<ViewResponse>, ErrorData> {
        let ViewZoomParams { delta_y, steps } = params.0;
        if !delta_y.is_finite() {
            return Err(ErrorData::invalid_params(
                "delta_y must be finite",
                Some(serde_json::json!({ "delta_y": delta_y.to_string() })),
            ));
        }
        let steps = steps.unwrap_or(1).min(MAX_ZOOM_STEPS);

        let mut snapshot = self.session.snapshot().await.map_err(map_session_error)?;
        for _ in 0..steps {
            snapshot =
                self.session.view(ViewCommand::Wheel { delta_y }).await.map_err(map_session_error)?;
        }
        Ok(Json(ViewResponse { view: view_state(&snapshot) }))
    }

    /// Fit the diagram into the viewport (defaults to the last reported one) on the active view.
    #[tool(name = "view.fit")]
    async fn view_fit(
        &self,
        params: Parameters<ViewFitParams>,
    ) -> Result<Json<ViewResponse>, ErrorData> {
        let snapshot = self.session.snapshot().await.map_err(map_session_error)?;
        if snapshot.svg.is_none() {
            return Err(ErrorData::resource_not_found("no rendered diagram to fit", None));
        }

        let viewport = match (params.0.width, params.0.height) {
            (Some(width), Some(height)) => checked_size(width, height)?,
            (None, None) => snapshot.viewport.ok_or_else(|| {
                ErrorData::invalid_params(
                    "no viewport reported yet; pass width and height",
                    None,
                )
            })?,
            (width, height) => {
                return Err(ErrorData::invalid_params(
                    "width and height must be given together",
                    Some(serde_json::json!({ "width": width, "height": height })),
                ));
            }
        };

        let snapshot =
            self.session.view(ViewCommand::Fit { viewport }).await.map_err(map_session_error)?;
        Ok(Json(ViewResponse { view: view_state(&snapshot) }))
    }

    /// Report the current viewport size; used by `view.fit` and by the auto-fit after expanding.
    #[tool(name = "view.viewport")]
    async fn view_viewport(
        &self,
        params: Parameters<ViewViewportParams>,
    ) -> Result<Json<ViewResponse>, ErrorData> {
        let size = checked_size(params.0.width, params.0.height)?;
        let snapshot =
            self.session.view(ViewCommand::Viewport(size)).await.map_err(map_session_error)?;
        Ok(Json(ViewResponse { view: view_state(&snapshot) }))
    }

    /// Switch between the inline and expanded presentation; each keeps its own transform, and
    /// expanding auto-fits once the viewport stops resizing.
    #[tool(name = "view.presentation")]
    async fn view_presentation(
        &self,
        params: Parameters<ViewPresentationParams>,
    ) -> Result<Json<ViewResponse>, ErrorData> {
        let snapshot = self
            .session
            .view(ViewCommand::Presentation(params.0.presentation))
            .await
            .map_err(map_session_error)?;
        Ok(Json(ViewResponse { view: view_state(&snapshot) }))
    }

    /// Report the host color scheme; dark mode selects the dark theme when neither the user nor
    /// the agent picked one. Applies from the next `diagram.render`.
    #[tool(name = "host.context")]
    async fn host_context(
        &self,
        params: Parameters<HostContextParams>,
    ) -> Result<Json<HostContextResponse>, ErrorData> {
        let dark_mode = params.0.dark_mode;
        self.session.host_context(dark_mode).await.map_err(map_session_error)?;
        Ok(Json(HostContextResponse { dark_mode }))
    }

    /// Select a theme on behalf of the user (overrides agent and host); omit `theme` to clear.
    #[tool(name = "theme.select")]
    async fn theme_select(
        &self,
        params: Parameters<ThemeSelectParams>,
    ) -> Result<Json<ThemeSelectResponse>, ErrorData> {
        self.session.user_theme(params.0.theme).await.map_err(map_session_error)?;
        let snapshot = self.session.snapshot().await.map_err(map_session_error)?;
        Ok(Json(ThemeSelectResponse {
            user_theme: snapshot.user_theme,
            diagram_theme: snapshot.state.map(|state| state.theme),
        }))
    }
}

#[tool_handler]
impl ServerHandler for NereidLiveMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Nereid Live Mermaid rendering server. Stream drafts with diagram.stream, commit with diagram.render, inspect with diagram.read, export with diagram.export, close with diagram.close. View: view.pan, view.zoom, view.fit, view.viewport, view.presentation. Theme: theme.select, host.context."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// Error mapping and response builders for the tool handlers.
include!("server/helpers.rs");

#[cfg(test)]
mod tests;
