// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub const ALL: [Case; 3] = [Case::Small, Case::Medium, Case::Large];

    pub fn id(self) -> &'static str {
        match self {
            Case::Small => "small",
            Case::Medium => "medium",
            Case::Large => "large",
        }
    }

    pub fn nodes(self) -> usize {
        match self {
            Case::Small => 20,
            Case::Medium => 200,
            Case::Large => 2_000,
        }
    }
}

/// A flowchart with one subgraph per ten nodes; every subgraph also has a node of the same name,
/// so the grouping repair has work to do.
pub fn flowchart(case: Case) -> String {
    let nodes = case.nodes();
    let mut out = String::from("flowchart TD\n");
    for group in 0..nodes.div_ceil(10) {
        let _ = writeln!(out, "  subgraph Group{group}");
        let _ = writeln!(out, "    Group{group}[Group {group} Service]");
        for idx in group * 10..((group + 1) * 10).min(nodes) {
            let _ = writeln!(out, "    N{idx}(\"Step {idx} <b>label</b> &amp; more\")");
        }
        let _ = writeln!(out, "  end");
    }
    for idx in 1..nodes {
        let _ = writeln!(out, "  N{} -->|edge {idx}| N{idx}", idx - 1);
    }
    for group in 1..nodes.div_ceil(10) {
        let _ = writeln!(out, "  Group{} --> Group{group}", group - 1);
    }
    out
}

/// `count` prefixes of `text` at evenly spaced char boundaries, as a stream would deliver them.
pub fn prefixes(text: &str, count: usize) -> Vec<String> {
    let count = count.max(1);
    (1..=count)
        .map(|step| {
            let mut cut = text.len() * step / count;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text[..cut].to_owned()
        })
        .collect()
}

/// Mermaid-shaped SVG output: prolog, comments, indentation, long coordinates, a style block.
pub fn svg(case: Case) -> String {
    let nodes = case.nodes();
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<svg id=\"bench\" xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"-8.000000 -8.000000 {:.6} {:.6}\">",
        nodes as f64 * 13.333333,
        nodes as f64 * 7.777777
    );
    out.push_str(
        "  <style>#bench .node rect { stroke-width: 1.333333px; fill: #ECECFF; }</style>\n",
    );
    out.push_str("  <g class=\"root\">\n");
    for idx in 0..nodes {
        let x = idx as f64 * 13.333333 + 0.123456;
        let y = idx as f64 * 7.777777 - 0.987654;
        let _ = writeln!(out, "    <!-- node {idx} -->");
        let _ = writeln!(
            out,
            "    <g class=\"node\" id=\"flowchart-N{idx}-{idx}\" transform=\"translate({x:.6}, {y:.6})\">"
        );
        let _ = writeln!(
            out,
            "      <rect x=\"-40.123456\" y=\"-20.654321\" width=\"80.246912\" height=\"41.308642\"/>"
        );
        let _ = writeln!(out, "      <text><tspan>Step {idx}</tspan></text>");
        out.push_str("    </g>\n");
        if idx > 0 {
            let _ = writeln!(
                out,
                "    <path d=\"M{:.6},{:.6}L{x:.6},{y:.6}\" class=\"flowchart-link\"/>",
                x - 13.333333,
                y - 7.777777
            );
        }
    }
    out.push_str("  </g>\n</svg>\n");
    out
}
