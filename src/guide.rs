//! Splits guide text into titled steps for display.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const DEFAULT_TITLE: &str = "DevOps Setup Guide";

lazy_static! {
    // "Step N" with optional colon and bold/italic markup; case-sensitive
    static ref STEP_MARKER: Regex = Regex::new(r"\*\*?Step (\d+):?\*\*?|Step (\d+):?").unwrap();
    static ref GUIDE_TITLE: Regex = Regex::new(r"(?i)\*\*Guide:([^\n]*)").unwrap();
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GuideStep {
    pub number: u32,
    pub heading: String,
    pub details: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GuideOutline {
    pub title: String,
    pub intro: String,
    // empty when the guide is unstructured prose
    pub steps: Vec<GuideStep>,
}

pub fn split_steps(guide: &str) -> GuideOutline {
    let content = guide.trim();
    let markers: Vec<_> = STEP_MARKER.captures_iter(content).collect();

    let Some(first) = markers.first().and_then(|caps| caps.get(0)) else {
        return GuideOutline {
            title: title(content),
            intro: content.to_string(),
            steps: Vec::new(),
        };
    };

    let intro = strip_heading_residue(&content[..first.start()]).to_string();

    let steps = markers
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let marker = caps.get(0)?;
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(content.len(), |next| next.start());
            let number = caps
                .get(1)
                .or_else(|| caps.get(2))
                .and_then(|n| n.as_str().parse().ok())
                .unwrap_or(i as u32 + 1);

            let block = strip_heading_residue(&content[marker.end()..end]);
            let (first_line, rest) = block.split_once('\n').unwrap_or((block, ""));

            let heading = first_line
                .replace('*', "")
                .trim()
                .trim_start_matches([':', '-', '.'])
                .trim()
                .to_string();
            let heading = if heading.is_empty() {
                format!("Step {number}")
            } else {
                heading
            };

            Some(GuideStep {
                number,
                heading,
                details: rest
                    .split('\n')
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string(),
            })
        })
        .collect();

    GuideOutline {
        title: title(content),
        intro,
        steps,
    }
}

fn title(content: &str) -> String {
    GUIDE_TITLE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('*', "").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

// Markdown heading hashes before the next "Step" belong to that step, not this block
fn strip_heading_residue(segment: &str) -> &str {
    segment.trim_end().trim_end_matches('#').trim_end()
}
