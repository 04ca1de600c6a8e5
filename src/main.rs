// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nereid Live CLI entrypoint.
//!
//! By default this serves MCP over streamable HTTP at `http://127.0.0.1:<port>/mcp` until
//! interrupted.
//!
//! Use `--mcp` to run the MCP server over stdio instead (intended for tool integrations). Logs
//! always go to stderr.

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use nereid_live::engine::{CommandEngine, EngineConfig, SecurityLevel, DEFAULT_RENDERER_PROGRAM};
use nereid_live::mcp::NereidLiveMcp;
use nereid_live::session::{spawn_session, SessionOptions};
use nereid_live::store::{ExportFolder, WriteDurability};
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_MCP_HTTP_PORT: u16 = 27436;
const RENDERER_ENV: &str = "NEREID_LIVE_RENDERER";
const DEFAULT_LOG_FILTER: &str = "nereid_live=info";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--mcp-http-port <port>] [options]\n  {program} --mcp [options]\n\nOptions:\n  --renderer <program>        Mermaid CLI to render with (default: ${RENDERER_ENV} or {DEFAULT_RENDERER_PROGRAM})\n  --security-level <level>    strict | loose | antiscript | sandbox (default strict)\n  --dark                      start with the host dark-mode signal set\n  --export-dir <dir>          enable diagram.export to write <dir>/<name>.svg\n  --durable-writes            fsync exported files and their directory\n\nWithout --mcp, MCP is served over streamable HTTP at `http://127.0.0.1:<port>/mcp`.\n--mcp-http-port selects the port (0 = ephemeral; default {DEFAULT_MCP_HTTP_PORT}).\n\nSet RUST_LOG to change log verbosity (default {DEFAULT_LOG_FILTER}); logs go to stderr."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    mcp: bool,
    mcp_http_port: Option<u16>,
    renderer: Option<String>,
    security_level: Option<SecurityLevel>,
    dark: bool,
    export_dir: Option<String>,
    durable_writes: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mcp" => {
                if options.mcp {
                    return Err(());
                }
                options.mcp = true;
            }
            "--mcp-http-port" => {
                if options.mcp_http_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.mcp_http_port = Some(port);
            }
            "--renderer" => {
                if options.renderer.is_some() {
                    return Err(());
                }
                let program = args.next().ok_or(())?;
                if program.trim().is_empty() {
                    return Err(());
                }
                options.renderer = Some(program);
            }
            "--security-level" => {
                if options.security_level.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.security_level = Some(raw.parse().map_err(|_| ())?);
            }
            "--dark" => {
                if options.dark {
                    return Err(());
                }
                options.dark = true;
            }
            "--export-dir" => {
                if options.export_dir.is_some() {
                    return Err(());
                }
                options.export_dir = Some(args.next().ok_or(())?);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            _ => return Err(()),
        }
    }

    if options.mcp && options.mcp_http_port.is_some() {
        return Err(());
    }

    if options.durable_writes && options.export_dir.is_none() {
        return Err(());
    }

    Ok(options)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if let Err(err) =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init()
    {
        eprintln!("nereid-live: logging disabled: {err}");
    }
}

fn build_server(options: &CliOptions) -> NereidLiveMcp {
    let program = options
        .renderer
        .clone()
        .or_else(|| std::env::var(RENDERER_ENV).ok().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_RENDERER_PROGRAM.to_owned());
    let engine = Arc::new(CommandEngine::new(program));

    let engine_config = EngineConfig::default()
        .with_security_level(options.security_level.unwrap_or_default());
    let session = spawn_session(
        Arc::clone(&engine),
        SessionOptions { engine_config, host_dark: options.dark, ..SessionOptions::default() },
    );
    tracing::info!(
        renderer = engine.program(),
        security_level = %engine_config.security_level,
        host_dark = options.dark,
        "session started"
    );

    let mcp = NereidLiveMcp::new(session);
    match options.export_dir.as_deref() {
        Some(dir) => {
            let durability = if options.durable_writes {
                WriteDurability::Durable
            } else {
                WriteDurability::BestEffort
            };
            mcp.with_export_folder(ExportFolder::new(dir).with_durability(durability))
        }
        None => mcp,
    }
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "nereid-live".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_tracing();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        if options.mcp {
            runtime.block_on(async {
                let mcp = build_server(&options);
                tracing::info!("serving MCP over stdio");
                mcp.serve_stdio().await
            })?;
            return Ok(());
        }

        let mcp_http_port = options.mcp_http_port.unwrap_or(DEFAULT_MCP_HTTP_PORT);
        runtime.block_on(async move {
            let mcp = build_server(&options);
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", mcp_http_port)).await?;

            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..StreamableHttpServerConfig::default()
            };
            let shutdown_token = config.cancellation_token.clone();
            let server_shutdown = shutdown_token.clone();

            let session_manager = Arc::new(LocalSessionManager::default());
            let mcp_service =
                StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config);

            let router = Router::new().nest_service("/mcp", mcp_service);
            let addr = listener.local_addr()?;
            tracing::info!(%addr, "serving MCP over streamable HTTP at /mcp");
            let server_handle = tokio::spawn(async move {
                let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                    server_shutdown.cancelled().await;
                });
                if let Err(err) = serve.await {
                    tracing::error!(error = %err, "MCP HTTP server error");
                }
            });

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
            shutdown_token.cancel();
            let _ = server_handle.await;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("nereid-live: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, CliOptions};
    use nereid_live::engine::SecurityLevel;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(|value| (*value).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_mcp_flag() {
        let options = parse_options(args(&["--mcp"])).expect("parse options");
        assert!(options.mcp);
        assert_eq!(options.mcp_http_port, None);
    }

    #[test]
    fn parses_mcp_http_port() {
        let options = parse_options(args(&["--mcp-http-port", "1234"])).expect("parse options");
        assert_eq!(options.mcp_http_port, Some(1234));
        assert!(!options.mcp);
    }

    #[test]
    fn rejects_mcp_http_port_with_stdio_mcp_mode() {
        parse_options(args(&["--mcp", "--mcp-http-port", "0"])).unwrap_err();
    }

    #[test]
    fn parses_renderer_and_security_level() {
        let options = parse_options(args(&[
            "--renderer",
            "/opt/mermaid/bin/mmdc",
            "--security-level",
            "loose",
            "--mcp",
        ]))
        .expect("parse options");
        assert_eq!(options.renderer.as_deref(), Some("/opt/mermaid/bin/mmdc"));
        assert_eq!(options.security_level, Some(SecurityLevel::Loose));
        assert!(options.mcp);
    }

    #[test]
    fn rejects_unknown_security_level() {
        parse_options(args(&["--security-level", "paranoid"])).unwrap_err();
    }

    #[test]
    fn parses_export_options() {
        let options = parse_options(args(&["--durable-writes", "--export-dir", "out", "--dark"]))
            .expect("parse options");
        assert_eq!(options.export_dir.as_deref(), Some("out"));
        assert!(options.durable_writes);
        assert!(options.dark);
    }

    #[test]
    fn rejects_durable_writes_without_export_dir() {
        parse_options(args(&["--durable-writes"])).unwrap_err();
    }

    #[test]
    fn rejects_unknown_and_positional_args() {
        parse_options(args(&["--nope"])).unwrap_err();
        parse_options(args(&["some/dir"])).unwrap_err();
    }

    #[test]
    fn rejects_duplicate_flags() {
        parse_options(args(&["--mcp", "--mcp"])).unwrap_err();
        parse_options(args(&["--dark", "--dark"])).unwrap_err();
        parse_options(args(&["--renderer", "a", "--renderer", "b"])).unwrap_err();
        parse_options(args(&["--export-dir", "a", "--export-dir", "b"])).unwrap_err();
    }

    #[test]
    fn rejects_missing_values() {
        parse_options(args(&["--renderer"])).unwrap_err();
        parse_options(args(&["--renderer", "  "])).unwrap_err();
        parse_options(args(&["--export-dir"])).unwrap_err();
        parse_options(args(&["--mcp-http-port"])).unwrap_err();
    }
}
