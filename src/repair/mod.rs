// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Best-effort repair of incomplete Mermaid text.
//!
//! Streamed snapshots are prefixes of a larger document. The helpers here turn such a prefix into
//! text that is more likely to parse; they never claim the result is correct.

use std::sync::OnceLock;

use regex::Regex;
use smallvec::SmallVec;

mod grouping;

pub use grouping::{
    collect_grouping_names, find_grouping_collisions, repair_grouping_collisions, GROUPING_SUFFIX,
};

fn dangling_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^<>\n]*)?$").expect("valid dangling tag regex")
    })
}

fn dangling_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[A-Za-z0-9#]*$").expect("valid dangling entity regex"))
}

/// Repairs a streamed (partial) snapshot.
///
/// A single line is returned unchanged. Otherwise the final line is dropped, a trailing
/// unterminated tag or entity is stripped, and the brackets of the new final line are balanced.
pub fn repair_partial(text: &str) -> String {
    let Some(last_newline) = memchr::memrchr(b'\n', text.as_bytes()) else {
        return text.to_owned();
    };

    let kept = &text[..last_newline];
    let kept = kept.strip_suffix('\r').unwrap_or(kept);
    let kept = strip_dangling_tag(kept);
    let kept = strip_dangling_entity(kept);

    let (head, last_line) = match memchr::memrchr(b'\n', kept.as_bytes()) {
        Some(idx) => kept.split_at(idx + 1),
        None => ("", kept),
    };

    let mut out = String::with_capacity(kept.len() + 4);
    out.push_str(head);
    out.push_str(&balance_line(last_line));
    out
}

/// Removes an unterminated `<tag ...` fragment at the very end of `text`.
pub fn strip_dangling_tag(text: &str) -> &str {
    match dangling_tag_re().find(text) {
        Some(found) => &text[..found.start()],
        None => text,
    }
}

/// Removes an unterminated `&entity` fragment at the very end of `text`.
pub fn strip_dangling_entity(text: &str) -> &str {
    match dangling_entity_re().find(text) {
        Some(found) => &text[..found.start()],
        None => text,
    }
}

/// Appends the closers needed to balance `[]`, `()` and `{}` on a single line.
///
/// Closers that do not match the innermost open bracket are ignored.
pub fn balance_line(line: &str) -> String {
    let mut expected: SmallVec<[char; 8]> = SmallVec::new();

    for ch in line.chars() {
        match ch {
            '[' => expected.push(']'),
            '(' => expected.push(')'),
            '{' => expected.push('}'),
            ']' | ')' | '}' => {
                if expected.last() == Some(&ch) {
                    expected.pop();
                }
            }
            _ => {}
        }
    }

    if expected.is_empty() {
        return line.to_owned();
    }

    let mut out = String::with_capacity(line.len() + expected.len());
    out.push_str(line);
    out.extend(expected.iter().rev());
    out
}
