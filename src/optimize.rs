// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Size reduction for exported SVGs.
//!
//! Styling and element ids are kept as-is even where dropping them would save bytes; only
//! comments, the XML prolog, newline-separated inter-tag whitespace, and excess coordinate
//! precision are removed.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Decimal places kept for coordinates.
pub const COORDINATE_PRECISION: usize = 2;

const SVG_CLOSE: &str = "</svg>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OptimizeError {
    #[error("input is not an SVG document (no <svg> root element)")]
    NotSvg,
    #[error("SVG root element is never closed")]
    Unbalanced,
}

fn style_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<style\b[^>]*>.*?</style>").expect("valid style regex"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"))
}

fn inter_tag_newline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r">[ \t\r]*\n\s*<").expect("valid whitespace regex"))
}

fn geometry_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(\s(?:x|y|x1|x2|y1|y2|cx|cy|r|rx|ry|width|height|d|points|transform|viewBox)\s*=\s*")([^"]*)(")"#,
        )
        .expect("valid geometry attribute regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"-?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?").expect("valid number regex")
    })
}

fn round_number(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['.', 'e', 'E']) {
        return Cow::Borrowed(raw);
    }
    let Ok(value) = raw.parse::<f64>() else {
        return Cow::Borrowed(raw);
    };

    let mut text = format!("{value:.prec$}", prec = COORDINATE_PRECISION);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_owned();
    }

    if text.len() < raw.len() {
        Cow::Owned(text)
    } else {
        Cow::Borrowed(raw)
    }
}

fn round_geometry(markup: &str) -> Cow<'_, str> {
    geometry_attr_re().replace_all(markup, |caps: &Captures<'_>| {
        let value = number_re().replace_all(&caps[2], |num: &Captures<'_>| {
            round_number(&num[0]).into_owned()
        });
        format!("{}{}{}", &caps[1], value, &caps[3])
    })
}

/// Returns a smaller equivalent of `svg`.
pub fn optimize_svg(svg: &str) -> Result<String, OptimizeError> {
    let start = svg.find("<svg").ok_or(OptimizeError::NotSvg)?;
    let end = match svg.rfind(SVG_CLOSE) {
        Some(idx) if idx > start => idx + SVG_CLOSE.len(),
        _ => {
            let root_end = svg[start..].find('>').ok_or(OptimizeError::Unbalanced)? + start;
            if !svg[..root_end].ends_with('/') {
                return Err(OptimizeError::Unbalanced);
            }
            root_end + 1
        }
    };
    let document = &svg[start..end];

    let without_comments = comment_re().replace_all(document, "");
    let collapsed = inter_tag_newline_re().replace_all(&without_comments, "><");

    let mut out = String::with_capacity(collapsed.len());
    let mut cursor = 0;
    for style in style_block_re().find_iter(&collapsed) {
        out.push_str(&round_geometry(&collapsed[cursor..style.start()]));
        out.push_str(style.as_str());
        cursor = style.end();
    }
    out.push_str(&round_geometry(&collapsed[cursor..]));

    if out.len() > svg.len() {
        return Ok(svg.to_owned());
    }
    Ok(out)
}
