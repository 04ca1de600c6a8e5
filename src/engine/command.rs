// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::process::Command;

use super::{EngineConfig, Graphic, RenderEngine, RenderFailure};

pub const DEFAULT_RENDERER_PROGRAM: &str = "mmdc";

/// Scratch files written for one engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    async fn remove(self) {
        for path in self.paths {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to remove scratch file"
                    );
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("cannot write renderer scratch file {path:?}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{message}")]
    Exit { status: ExitStatus, message: String },
    #[error("cannot read renderer output {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Renders through an external Mermaid CLI (`mmdc` compatible).
///
/// Each call writes the input and configuration to a scratch directory and asks the CLI for an
/// SVG. Those files are the artifacts of a failed call.
#[derive(Debug)]
pub struct CommandEngine {
    program: String,
    extra_args: Vec<String>,
    scratch_dir: PathBuf,
    next_call: AtomicU64,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>) -> Self {
        let scratch_dir =
            std::env::temp_dir().join(format!("nereid-live-render-{}", std::process::id()));
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            scratch_dir,
            next_call: AtomicU64::new(0),
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    async fn write_scratch(&self, path: &Path, contents: &[u8]) -> Result<(), CommandError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|source| CommandError::Scratch { path: path.to_path_buf(), source })
    }

    /// Runs the CLI once. `svg_id` becomes the root element id (`-I`), which Mermaid also uses to
    /// scope the ids and styles inside the SVG.
    async fn run(
        &self,
        config: &EngineConfig,
        label: &str,
        svg_id: Option<&str>,
        text: &str,
    ) -> Result<String, RenderFailure<ScratchFiles>> {
        tokio::fs::create_dir_all(&self.scratch_dir).await.map_err(|source| {
            RenderFailure::new(
                CommandError::Scratch { path: self.scratch_dir.clone(), source }.to_string(),
            )
        })?;

        let call = self.next_call.fetch_add(1, Ordering::Relaxed);
        let base = self.scratch_dir.join(format!("{label}-{call}"));
        let input = base.with_extension("mmd");
        let config_path = base.with_extension("config.json");
        let output = base.with_extension("svg");
        let files =
            ScratchFiles { paths: vec![input.clone(), config_path.clone(), output.clone()] };

        let fail = |err: CommandError, files: &ScratchFiles| {
            RenderFailure::new(err.to_string()).with_artifact(files.clone())
        };

        if let Err(err) = self.write_scratch(&input, text.as_bytes()).await {
            return Err(fail(err, &files));
        }
        let config_json = config.to_mermaid_json().to_string();
        if let Err(err) = self.write_scratch(&config_path, config_json.as_bytes()).await {
            return Err(fail(err, &files));
        }

        let mut command = Command::new(&self.program);
        command
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-c")
            .arg(&config_path)
            .arg("-t")
            .arg(config.theme.as_str())
            .arg("-q");
        if let Some(svg_id) = svg_id {
            command.arg("-I").arg(svg_id);
        }
        let result = command.args(&self.extra_args).kill_on_drop(true).output().await;

        let out = match result {
            Ok(out) => out,
            Err(source) => {
                let err = CommandError::Spawn { program: self.program.clone(), source };
                return Err(fail(err, &files));
            }
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_owned();
            let message = if stderr.is_empty() {
                format!("renderer exited with {}", out.status)
            } else {
                stderr
            };
            return Err(fail(CommandError::Exit { status: out.status, message }, &files));
        }

        let svg = match tokio::fs::read_to_string(&output).await {
            Ok(svg) => svg,
            Err(source) => return Err(fail(CommandError::Output { path: output, source }, &files)),
        };

        files.remove().await;
        Ok(svg)
    }
}

impl RenderEngine for CommandEngine {
    type Artifact = ScratchFiles;

    async fn validate(
        &self,
        config: &EngineConfig,
        text: &str,
    ) -> Result<(), RenderFailure<ScratchFiles>> {
        // The CLI has no parse-only mode; a render whose output is thrown away stands in.
        self.run(config, "validate", None, text).await.map(|_| ())
    }

    async fn render(
        &self,
        config: &EngineConfig,
        render_id: &str,
        text: &str,
    ) -> Result<Graphic, RenderFailure<ScratchFiles>> {
        let svg = self.run(config, render_id, Some(render_id), text).await?;
        Ok(Graphic { render_id: render_id.to_owned(), svg })
    }

    async fn dispose(&self, artifact: ScratchFiles) {
        artifact.remove().await;
    }
}
