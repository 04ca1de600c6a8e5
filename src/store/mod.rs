// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for exported diagrams.
//!
//! Exports are written atomically (temp file plus rename) so a reader never sees a half-written
//! SVG.

pub mod export_folder;

pub use export_folder::{ExportFolder, StoreError, WriteDurability};
