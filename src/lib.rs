// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nereid Live: streamed Mermaid rendering behind an MCP tool surface.
//!
//! Drafts arrive while the agent is still writing them. They are repaired into something
//! parseable, throttled, validated and rendered by an opaque engine, and only ever committed
//! whole: a failed attempt never replaces the last good picture.

pub mod engine;
pub mod gate;
pub mod mcp;
pub mod optimize;
pub mod pipeline;
pub mod repair;
pub mod session;
pub mod store;
pub mod theme;
pub mod view;
