// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;
use std::time::Duration;

use super::*;
use crate::engine::testing::{MemoryEngine, BOOM_MARKER};
use crate::session::{spawn_session, SessionOptions};
use crate::theme::Theme;
use crate::view::{Presentation, ViewTransform};

const GOOD: &str = "flowchart TD\nA[Start] --> B[Done]";

fn temp_export_dir(test_name: &str) -> std::path::PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};

    let mut dir = std::env::temp_dir();
    let pid = std::process::id();
    let nanos =
        SystemTime::now().duration_since(UNIX_EPOCH).expect("clock is monotonic").as_nanos();
    dir.push(format!("nereid-live-{test_name}-{pid}-{nanos}"));
    dir
}

fn server_with(options: SessionOptions) -> (Arc<MemoryEngine>, NereidLiveMcp) {
    let engine = Arc::new(MemoryEngine::new());
    let session = spawn_session(Arc::clone(&engine), options);
    (engine, NereidLiveMcp::new(session))
}

fn server() -> (Arc<MemoryEngine>, NereidLiveMcp) {
    server_with(SessionOptions::default())
}

fn render_params(mermaid: &str) -> Parameters<DiagramRenderParams> {
    Parameters(DiagramRenderParams { mermaid: mermaid.to_owned(), theme: None, title: None })
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn tools_advertise_descriptions_and_schemas() {
    let tools = NereidLiveMcp::tool_router().list_all();
    assert!(!tools.is_empty(), "expected at least one tool");

    let mut missing_description = Vec::new();
    let mut missing_output_schema = Vec::new();
    let mut non_object_input_schema = Vec::new();
    let mut non_object_output_schema = Vec::new();

    let mut seen_names = BTreeSet::new();

    for tool in tools {
        let name = tool.name.to_string();
        assert!(seen_names.insert(name.clone()), "duplicate tool name: {name}");

        let desc_missing =
            tool.description.as_deref().map(|desc| desc.trim().is_empty()).unwrap_or(true);
        if desc_missing {
            missing_description.push(name.clone());
        }

        if tool.input_schema.get("type").and_then(|v| v.as_str()) != Some("object") {
            non_object_input_schema.push(name.clone());
        }

        match tool.output_schema.as_ref() {
            None => missing_output_schema.push(name.clone()),
            Some(schema) => {
                if schema.get("type").and_then(|v| v.as_str()) != Some("object") {
                    non_object_output_schema.push(name.clone());
                }
            }
        }
    }

    assert!(missing_description.is_empty(), "tools missing description: {missing_description:?}");
    assert!(
        missing_output_schema.is_empty(),
        "tools missing output_schema: {missing_output_schema:?}"
    );
    assert!(
        non_object_input_schema.is_empty(),
        "tools with non-object input schema: {non_object_input_schema:?}"
    );
    assert!(
        non_object_output_schema.is_empty(),
        "tools with non-object output schema: {non_object_output_schema:?}"
    );

    let expected = [
        "diagram.close",
        "diagram.export",
        "diagram.read",
        "diagram.render",
        "diagram.stream",
        "host.context",
        "theme.select",
        "view.fit",
        "view.pan",
        "view.presentation",
        "view.viewport",
        "view.zoom",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect::<BTreeSet<_>>();
    assert_eq!(seen_names, expected);
}

#[tokio::test]
async fn render_commits_and_records_a_checkpoint() {
    let (_engine, server) = server();

    let Json(rendered) = server.diagram_render(render_params(GOOD)).await.expect("diagram.render");
    assert_eq!(rendered.status, McpRenderStatus::Committed);
    assert_eq!(rendered.theme, Theme::Default);
    assert_eq!(rendered.render_id.as_deref(), Some("nereid-live-1"));
    assert_eq!(rendered.checkpoint_id.as_deref(), Some("ckpt-0001"));
    assert!(rendered.error.is_none());

    let Json(read) = server.diagram_read().await.expect("diagram.read");
    let diagram = read.diagram.expect("diagram state");
    assert_eq!(diagram.mermaid, GOOD);
    assert_eq!(diagram.checkpoint_id.as_deref(), Some("ckpt-0001"));
    assert_eq!(read.render_id.as_deref(), Some("nereid-live-1"));
    assert!(read.svg.is_some());
    assert!(!read.streaming);

    let Json(second) = server.diagram_render(render_params(GOOD)).await.expect("diagram.render");
    assert_eq!(second.checkpoint_id.as_deref(), Some("ckpt-0002"));
}

#[tokio::test]
async fn render_rejects_empty_mermaid() {
    let (engine, server) = server();
    let err = match server.diagram_render(render_params("  \n\t")).await {
        Ok(_) => panic!("diagram.render should reject empty mermaid"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn failed_render_reports_the_error_and_keeps_the_picture() {
    let (_engine, server) = server();
    server.diagram_render(render_params(GOOD)).await.expect("diagram.render");
    let Json(before) = server.diagram_read().await.expect("diagram.read");

    let broken = format!("flowchart TD\n{BOOM_MARKER}\nA-->B");
    let Json(failed) = server.diagram_render(render_params(&broken)).await.expect("diagram.render");
    assert_eq!(failed.status, McpRenderStatus::Failed);
    let error = failed.error.expect("error");
    assert_eq!(error.position.map(|position| position.line), Some(2));

    let Json(after) = server.diagram_read().await.expect("diagram.read");
    assert_eq!(after.svg, before.svg);
    assert_eq!(after.error, Some(error));
}

#[tokio::test(start_paused = true)]
async fn streamed_drafts_render_without_recording_state() {
    let (engine, server) = server();

    let Json(queued) = server
        .diagram_stream(Parameters(DiagramStreamParams {
            mermaid: "flowchart TD\nA[Start] --> B[Do".to_owned(),
            theme: Some(Theme::Forest),
        }))
        .await
        .expect("diagram.stream");
    assert!(queued.queued);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let Json(read) = server.diagram_read().await.expect("diagram.read");
    assert!(read.streaming);
    assert!(read.diagram.is_none());
    assert!(read.svg.as_deref().is_some_and(|svg| svg.contains("theme-forest")));
    assert_eq!(engine.rendered_texts(), vec!["flowchart TD".to_owned()]);

    let Json(ignored) = server
        .diagram_stream(Parameters(DiagramStreamParams { mermaid: String::new(), theme: None }))
        .await
        .expect("diagram.stream");
    assert!(!ignored.queued);
}

#[tokio::test]
async fn export_requires_a_rendered_diagram() {
    let (_engine, server) = server();
    let err = match server.diagram_export(Parameters(DiagramExportParams::default())).await {
        Ok(_) => panic!("diagram.export should fail without a rendered diagram"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::RESOURCE_NOT_FOUND);
}

#[tokio::test]
async fn export_writes_optimised_svg_to_the_export_folder() {
    let dir = temp_export_dir("export");
    let (_engine, server) = server();
    let server = server.with_export_folder(ExportFolder::new(&dir));
    server.diagram_render(render_params(GOOD)).await.expect("diagram.render");

    let Json(exported) = server
        .diagram_export(Parameters(DiagramExportParams {
            name: Some("architecture".to_owned()),
            data_uri: true,
        }))
        .await
        .expect("diagram.export");

    let path = exported.path.expect("export path");
    assert!(path.ends_with("architecture.svg"), "{path}");
    let written = std::fs::read_to_string(&path).expect("read export");
    assert_eq!(written, exported.svg);
    assert!(written.starts_with("<svg id=\"nereid-live-1\""));
    assert!(exported.optimized_bytes <= exported.original_bytes);
    assert!(exported
        .data_uri
        .as_deref()
        .is_some_and(|uri| uri.starts_with("data:image/svg+xml;base64,")));

    let err = match server
        .diagram_export(Parameters(DiagramExportParams {
            name: Some("../escape".to_owned()),
            data_uri: false,
        }))
        .await
    {
        Ok(_) => panic!("diagram.export should reject an unsafe name"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn export_to_a_file_needs_an_export_folder() {
    let (_engine, server) = server();
    server.diagram_render(render_params(GOOD)).await.expect("diagram.render");

    let err = match server
        .diagram_export(Parameters(DiagramExportParams {
            name: Some("diagram".to_owned()),
            data_uri: false,
        }))
        .await
    {
        Ok(_) => panic!("diagram.export should need an export folder"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_REQUEST);

    let Json(inline) = server
        .diagram_export(Parameters(DiagramExportParams::default()))
        .await
        .expect("diagram.export");
    assert!(inline.path.is_none());
    assert!(inline.data_uri.is_none());
}

#[tokio::test]
async fn view_tools_drive_the_active_transform() {
    let (_engine, server) = server();

    let err = match server.view_fit(Parameters(ViewFitParams::default())).await {
        Ok(_) => panic!("view.fit should fail without a graphic"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::RESOURCE_NOT_FOUND);

    server.diagram_render(render_params(GOOD)).await.expect("diagram.render");

    let err = match server.view_fit(Parameters(ViewFitParams::default())).await {
        Ok(_) => panic!("view.fit should fail without a known viewport"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

    let err = match server
        .view_viewport(Parameters(ViewViewportParams { width: 0.0, height: 300.0 }))
        .await
    {
        Ok(_) => panic!("view.viewport should reject a degenerate size"),
        Err(err) => err,
    };
    assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

    let Json(view) = server
        .view_viewport(Parameters(ViewViewportParams { width: 400.0, height: 300.0 }))
        .await
        .expect("view.viewport");
    assert_eq!(view.view.viewport, Some(Size::new(400.0, 300.0)));

    let Json(zoomed) = server
        .view_zoom(Parameters(ViewZoomParams { delta_y: -1.0, steps: Some(2) }))
        .await
        .expect("view.zoom");
    assert!(approx(zoomed.view.inline.scale, 1.21), "{:?}", zoomed.view.inline);

    let Json(panned) = server
        .view_pan(Parameters(ViewPanParams { dx: 25.0, dy: -10.0 }))
        .await
        .expect("view.pan");
    assert_eq!((panned.view.inline.pan_x, panned.view.inline.pan_y), (25.0, -10.0));

    let Json(fitted) =
        server.view_fit(Parameters(ViewFitParams::default())).await.expect("view.fit");
    assert!(approx(fitted.view.inline.scale, 0.46), "{:?}", fitted.view.inline);
    assert!(approx(fitted.view.inline.pan_x, 16.0));
    assert!(approx(fitted.view.inline.pan_y, 12.0));

    let Json(expanded) = server
        .view_presentation(Parameters(ViewPresentationParams {
            presentation: Presentation::Expanded,
        }))
        .await
        .expect("view.presentation");
    assert_eq!(expanded.view.presentation, Presentation::Expanded);
    assert_eq!(expanded.view.expanded, ViewTransform::IDENTITY);
    assert!(approx(expanded.view.inline.scale, 0.46));
}

#[tokio::test]
async fn theme_selection_overrides_agent_and_host() {
    let (engine, server) =
        server_with(SessionOptions { host_dark: true, ..SessionOptions::default() });

    let Json(rendered) = server.diagram_render(render_params(GOOD)).await.expect("diagram.render");
    assert_eq!(rendered.theme, Theme::Dark);

    let Json(selected) = server
        .theme_select(Parameters(ThemeSelectParams { theme: Some(Theme::Neutral) }))
        .await
        .expect("theme.select");
    assert_eq!(selected.user_theme, Some(Theme::Neutral));
    assert_eq!(selected.diagram_theme, Some(Theme::Neutral));

    let Json(cleared) = server
        .theme_select(Parameters(ThemeSelectParams::default()))
        .await
        .expect("theme.select");
    assert_eq!(cleared.user_theme, None);
    assert_eq!(cleared.diagram_theme, Some(Theme::Dark));

    server
        .host_context(Parameters(HostContextParams { dark_mode: false }))
        .await
        .expect("host.context");
    let Json(light) = server.diagram_render(render_params(GOOD)).await.expect("diagram.render");
    assert_eq!(light.theme, Theme::Default);
    assert!(engine.render_calls() >= 3);
}

#[tokio::test]
async fn close_resets_the_surface() {
    let (_engine, server) = server();
    server.diagram_render(render_params(GOOD)).await.expect("diagram.render");

    let Json(closed) = server.diagram_close().await.expect("diagram.close");
    assert!(closed.closed);

    let Json(read) = server.diagram_read().await.expect("diagram.read");
    assert!(read.diagram.is_none());
    assert!(read.svg.is_none());
    assert_eq!(read.view.presentation, Presentation::Inline);

    let Json(again) = server.diagram_render(render_params(GOOD)).await.expect("diagram.render");
    assert_eq!(again.status, McpRenderStatus::Committed);
}
