// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mermaid palettes and the precedence rules for choosing one.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Neutral,
    Dark,
    Forest,
    Base,
}

impl Theme {
    pub const ALL: [Theme; 5] =
        [Theme::Default, Theme::Neutral, Theme::Dark, Theme::Forest, Theme::Base];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Neutral => "neutral",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Base => "base",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme '{0}' (expected one of: default, neutral, dark, forest, base)")]
pub struct ParseThemeError(String);

impl FromStr for Theme {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseThemeError(s.to_owned()))
    }
}

/// Everything that can influence the palette of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeSignals {
    /// Explicit selection made by the person looking at the diagram.
    pub user: Option<Theme>,
    /// Palette requested by the agent in its tool arguments.
    pub agent: Option<Theme>,
    /// Whether the host reports a dark color scheme.
    pub host_dark: bool,
}

/// Picks the palette: user selection, then agent request, then host dark mode, then default.
pub fn resolve_theme(signals: ThemeSignals) -> Theme {
    if let Some(theme) = signals.user {
        return theme;
    }
    if let Some(theme) = signals.agent {
        return theme;
    }
    if signals.host_dark {
        return Theme::Dark;
    }
    Theme::Default
}
