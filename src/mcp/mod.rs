// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! Each tool call becomes one session event: streamed drafts, committed renders, view gestures
//! and theme signals. The tool layer itself holds no diagram state.

mod server;
mod types;

pub use server::NereidLiveMcp;
