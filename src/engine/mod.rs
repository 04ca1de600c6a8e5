// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The rendering engine seen from the pipeline.
//!
//! Layout and painting are delegated entirely to an engine: given Mermaid text it either produces
//! an SVG or fails with a (usually position-annotated) syntax error. An engine that fails part way
//! through may leave an artifact behind; it hands that artifact back with the failure so the
//! caller can dispose of it.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::theme::Theme;

mod command;
#[cfg(test)]
pub(crate) mod testing;

pub use command::{CommandEngine, CommandError, ScratchFiles, DEFAULT_RENDERER_PROGRAM};

/// Diagram kinds that get `useMaxWidth: false` in the engine configuration.
pub const DIAGRAM_KINDS: [&str; 17] = [
    "flowchart",
    "sequence",
    "gantt",
    "journey",
    "class",
    "state",
    "er",
    "pie",
    "gitGraph",
    "mindmap",
    "timeline",
    "requirement",
    "quadrantChart",
    "xyChart",
    "sankey",
    "block",
    "c4",
];

/// Sandboxing strictness passed to the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Strict,
    Loose,
    Antiscript,
    Sandbox,
}

impl SecurityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Loose => "loose",
            Self::Antiscript => "antiscript",
            Self::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown security level '{0}' (expected one of: strict, loose, antiscript, sandbox)")]
pub struct ParseSecurityLevelError(String);

impl FromStr for SecurityLevel {
    type Err = ParseSecurityLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Strict, Self::Loose, Self::Antiscript, Self::Sandbox]
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSecurityLevelError(s.to_owned()))
    }
}

/// Options handed to the engine for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub theme: Theme,
    pub security_level: SecurityLevel,
    /// Auto-shrink to container width. Always `false` for this crate; the view does its own fit.
    pub use_max_width: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { theme: Theme::Default, security_level: SecurityLevel::Strict, use_max_width: false }
    }
}

impl EngineConfig {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_security_level(mut self, security_level: SecurityLevel) -> Self {
        self.security_level = security_level;
        self
    }

    /// The Mermaid configuration object for these options.
    pub fn to_mermaid_json(&self) -> serde_json::Value {
        let mut config = serde_json::Map::new();
        config.insert("theme".to_owned(), self.theme.as_str().into());
        config.insert("securityLevel".to_owned(), self.security_level.as_str().into());
        for kind in DIAGRAM_KINDS {
            config
                .insert(kind.to_owned(), serde_json::json!({ "useMaxWidth": self.use_max_width }));
        }
        serde_json::Value::Object(config)
    }
}

/// Where in the input a syntax error was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyntaxPosition {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, when the engine points at one.
    pub column: Option<u32>,
}

fn error_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bon line (\d+)").expect("valid error line regex"))
}

impl SyntaxPosition {
    /// Extracts a position from a Mermaid-style message (`Parse error on line 3:` followed by the
    /// offending line and a `----^` caret line).
    pub fn find_in(message: &str) -> Option<Self> {
        let line = error_line_re().captures(message)?.get(1)?.as_str().parse().ok()?;
        let column = message
            .lines()
            .map(str::trim_end)
            .find(|candidate| {
                candidate.ends_with('^')
                    && candidate[..candidate.len() - 1].bytes().all(|b| b == b'-')
            })
            .and_then(|caret| u32::try_from(caret.len()).ok());
        Some(Self { line, column })
    }
}

/// A failed engine call.
#[derive(Debug)]
pub struct RenderFailure<A> {
    pub reason: String,
    pub position: Option<SyntaxPosition>,
    /// Anything the engine created before failing that still needs to be disposed.
    pub artifact: Option<A>,
}

impl<A> RenderFailure<A> {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let position = SyntaxPosition::find_in(&reason);
        Self { reason, position, artifact: None }
    }

    pub fn with_artifact(mut self, artifact: A) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// A successfully rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graphic {
    pub render_id: String,
    pub svg: String,
}

/// An opaque Mermaid rendering capability.
pub trait RenderEngine: Send + Sync + 'static {
    type Artifact: Send + 'static;

    /// Checks that `text` parses, without producing output.
    fn validate(
        &self,
        config: &EngineConfig,
        text: &str,
    ) -> impl Future<Output = Result<(), RenderFailure<Self::Artifact>>> + Send;

    /// Renders `text` into an SVG whose element ids are scoped by `render_id`.
    fn render(
        &self,
        config: &EngineConfig,
        render_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<Graphic, RenderFailure<Self::Artifact>>> + Send;

    /// Releases an artifact left behind by a failed call.
    fn dispose(&self, artifact: Self::Artifact) -> impl Future<Output = ()> + Send;
}
