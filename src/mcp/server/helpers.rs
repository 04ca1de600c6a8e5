// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// MCP server helper functions:
/// error mapping, snapshot-to-response conversion, and export encoding.
const MAX_ZOOM_STEPS: u32 = 50;

fn map_session_error(err: SessionError) -> ErrorData {
    match err {
        SessionError::EmptyDiagram => ErrorData::invalid_params(
            err.to_string(),
            Some(serde_json::json!({ "field": "mermaid" })),
        ),
        SessionError::Closed => ErrorData::internal_error(err.to_string(), None),
    }
}

fn map_optimize_error(render_id: &str, err: OptimizeError) -> ErrorData {
    tracing::warn!(%render_id, error = %err, "svg optimisation failed");
    ErrorData::internal_error(
        format!("cannot optimise rendered svg: {err}"),
        Some(serde_json::json!({ "render_id": render_id })),
    )
}

fn map_store_error(err: StoreError) -> ErrorData {
    tracing::warn!(error = %err, "export failed");
    match &err {
        StoreError::InvalidName { name, reason } => ErrorData::invalid_params(
            err.to_string(),
            Some(serde_json::json!({ "name": name, "reason": reason })),
        ),
        StoreError::SymlinkRefused { path } => ErrorData::invalid_request(
            err.to_string(),
            Some(serde_json::json!({ "path": path.display().to_string() })),
        ),
        StoreError::Io { path, .. } => ErrorData::internal_error(
            err.to_string(),
            Some(serde_json::json!({ "path": path.display().to_string() })),
        ),
    }
}

fn checked_size(width: f64, height: f64) -> Result<Size, ErrorData> {
    let size = Size::new(width, height);
    if !size.is_positive() {
        return Err(ErrorData::invalid_params(
            "viewport width and height must be positive and finite",
            Some(serde_json::json!({ "width": width.to_string(), "height": height.to_string() })),
        ));
    }
    Ok(size)
}

fn view_state(snapshot: &SessionSnapshot) -> McpViewState {
    McpViewState {
        presentation: snapshot.presentation,
        inline: snapshot.inline,
        expanded: snapshot.expanded,
        viewport: snapshot.viewport,
        user_theme: snapshot.user_theme,
        host_dark: snapshot.host_dark,
    }
}

fn read_response(snapshot: SessionSnapshot) -> DiagramReadResponse {
    let view = view_state(&snapshot);
    DiagramReadResponse {
        diagram: snapshot.state.map(|state| McpDiagramState {
            mermaid: state.mermaid,
            theme: state.theme,
            title: state.title,
            checkpoint_id: state.checkpoint_id,
        }),
        render_id: snapshot.render_id,
        svg: snapshot.svg,
        error: snapshot.error,
        streaming: snapshot.streaming,
        rendering: snapshot.rendering,
        silent_failures: snapshot.silent_failures,
        view,
    }
}

fn render_status(status: RenderStatus) -> McpRenderStatus {
    match status {
        RenderStatus::Committed => McpRenderStatus::Committed,
        RenderStatus::Failed => McpRenderStatus::Failed,
        RenderStatus::TornDown => McpRenderStatus::TornDown,
    }
}

fn render_response(report: RenderReport, checkpoint_id: Option<String>) -> DiagramRenderResponse {
    DiagramRenderResponse {
        status: render_status(report.status),
        theme: report.theme,
        render_id: report.render_id,
        checkpoint_id,
        error: report.error,
    }
}

fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", BASE64.encode(svg))
}
