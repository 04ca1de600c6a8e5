// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Subgraph/member identifier collisions.
//!
//! Mermaid treats a subgraph whose id is reused as a node id inside the document as a cycle and
//! refuses to render. The pass below renames the node so the subgraph keeps its id.

use std::borrow::Cow;
use std::ops::Range;

/// Appended to a node identifier that collides with a subgraph identifier.
pub const GROUPING_SUFFIX: &str = "_svc";

const SHAPE_OPENERS: [char; 4] = ['[', '(', '{', '>'];

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Returns the identifier declared by a `subgraph` line, if any.
fn declared_grouping(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("subgraph")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let end = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Byte ranges of identifier tokens that sit outside label text.
///
/// Bracketed labels, quoted strings and `|edge labels|` are skipped.
fn structural_tokens(line: &str) -> Vec<Range<usize>> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut in_pipe = false;
    let mut token_start: Option<usize> = None;

    for (idx, ch) in line.char_indices() {
        let structural = depth == 0 && !in_quote && !in_pipe;
        if structural && is_ident_char(ch) {
            token_start.get_or_insert(idx);
            continue;
        }
        if let Some(start) = token_start.take() {
            tokens.push(start..idx);
        }

        match ch {
            '"' => in_quote = !in_quote,
            _ if in_quote => {}
            '|' if depth == 0 => in_pipe = !in_pipe,
            _ if in_pipe => {}
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(start) = token_start {
        tokens.push(start..line.len());
    }

    tokens
}

/// All identifiers declared by `subgraph` lines, in document order, without duplicates.
pub fn collect_grouping_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in text.split('\n') {
        if let Some(name) = declared_grouping(line) {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_owned());
            }
        }
    }
    names
}

/// Subgraph identifiers that are also used to define a node somewhere in the document.
pub fn find_grouping_collisions(text: &str) -> Vec<String> {
    let names = collect_grouping_names(text);
    if names.is_empty() {
        return Vec::new();
    }

    let mut collisions = Vec::new();
    for name in names {
        let collides = text.split('\n').filter(|line| declared_grouping(line).is_none()).any(
            |line| {
                structural_tokens(line).into_iter().any(|range| {
                    &line[range.clone()] == name
                        && line[range.end..].starts_with(SHAPE_OPENERS.as_slice())
                })
            },
        );
        if collides {
            collisions.push(name);
        }
    }
    collisions
}

/// Renames node identifiers that collide with subgraph identifiers.
///
/// Every structural occurrence of a colliding identifier gets [`GROUPING_SUFFIX`] appended,
/// except on the subgraph's own declaration line. Returns the input untouched when nothing
/// collides.
pub fn repair_grouping_collisions(text: &str) -> Cow<'_, str> {
    let collisions = find_grouping_collisions(text);
    if collisions.is_empty() {
        return Cow::Borrowed(text);
    }

    tracing::debug!(names = ?collisions, "renaming nodes that collide with subgraph ids");

    let mut out = String::with_capacity(text.len() + collisions.len() * 8);
    for (line_idx, line) in text.split('\n').enumerate() {
        if line_idx > 0 {
            out.push('\n');
        }

        let declared = declared_grouping(line);
        let mut cursor = 0;
        for range in structural_tokens(line) {
            let token = &line[range.clone()];
            if declared == Some(token) || !collisions.iter().any(|name| name == token) {
                continue;
            }
            out.push_str(&line[cursor..range.end]);
            out.push_str(GROUPING_SUFFIX);
            cursor = range.end;
        }
        out.push_str(&line[cursor..]);
    }

    Cow::Owned(out)
}
