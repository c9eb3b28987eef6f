//! Content heuristics: title extraction, type detection, filename slugs.

use super::model::PlanType;

/// Title used when the content offers nothing better.
pub const UNTITLED: &str = "Untitled Plan";

/// Longest title derived from content.
const MAX_DERIVED_TITLE_CHARS: usize = 80;

/// Longest slug used in generated filenames.
const MAX_SLUG_CHARS: usize = 50;

const RESEARCH_KEYWORDS: &[&str] = &[
    "research",
    "investigat",
    "analysis",
    "analyze",
    "findings",
    "explore",
    "survey",
    "compare",
    "question",
];

const IMPLEMENTATION_KEYWORDS: &[&str] = &[
    "implement",
    "step",
    "refactor",
    "build",
    "fix",
    "add ",
    "create",
    "migrate",
    "- [ ]",
    "todo",
];

/// Derive a human-readable title from markdown content.
///
/// Uses the first ATX heading outside code fences. Failing that, the first
/// non-empty line with list and quote markers stripped. Either is capped at
/// 80 chars. Falls back to [`UNTITLED`].
pub fn extract_title_from_content(content: &str) -> String {
    let mut in_fence = false;
    let mut first_line: Option<&str> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || trimmed.is_empty() {
            continue;
        }
        if let Some(heading) = atx_heading_text(trimmed) {
            return truncate_chars(heading, MAX_DERIVED_TITLE_CHARS);
        }
        if first_line.is_none() {
            first_line = Some(trimmed);
        }
    }

    first_line
        .map(|line| line.trim_start_matches(['-', '*', '+', '>', ' ']).trim())
        .filter(|line| !line.is_empty())
        .map(|line| truncate_chars(line, MAX_DERIVED_TITLE_CHARS))
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Guess the plan type from keyword frequency.
///
/// No hits at all yields [`PlanType::Custom`]; research wins only with
/// strictly more hits than implementation.
pub fn detect_plan_type(content: &str) -> PlanType {
    let lower = content.to_lowercase();
    let count = |keywords: &[&str]| -> usize {
        keywords.iter().map(|k| lower.matches(k).count()).sum()
    };

    let research = count(RESEARCH_KEYWORDS);
    let implementation = count(IMPLEMENTATION_KEYWORDS);

    match (research, implementation) {
        (0, 0) => PlanType::Custom,
        (r, i) if r > i => PlanType::Research,
        _ => PlanType::Implementation,
    }
}

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else become a
/// single `-`. Never empty.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_CHARS {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "plan".to_string()
    } else {
        slug.to_string()
    }
}

/// Text of an ATX heading line (`# Title`, `### Title ###`), if it is one.
fn atx_heading_text(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim_end();
    (!text.is_empty()).then_some(text)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}
