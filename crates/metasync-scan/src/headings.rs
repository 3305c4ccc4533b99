//! ATX heading extraction and `required_sections` matching.

use metasync_kernel::HeadingMatchMode;
use regex::Regex;
use std::sync::OnceLock;

fn atx_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ {0,3}#{1,6}(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$")
            .expect("heading regex must compile")
    })
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").expect("fence regex must compile"))
}

/// Heading texts in document order, skipping fenced code blocks.
pub fn extract_headings(markdown: &str) -> Vec<String> {
    let mut headings = Vec::new();
    // (fence char, fence length) of the open block
    let mut open_fence: Option<(char, usize)> = None;

    for line in markdown.lines() {
        if let Some(caps) = fence_re().captures(line) {
            let fence = &caps[1];
            let ch = fence.chars().next().unwrap_or('`');
            match open_fence {
                None => {
                    open_fence = Some((ch, fence.len()));
                    continue;
                }
                Some((open_ch, open_len))
                    if open_ch == ch
                        && fence.len() >= open_len
                        && line[caps.get(0).map_or(0, |m| m.end())..].trim().is_empty() =>
                {
                    open_fence = None;
                    continue;
                }
                Some(_) => continue,
            }
        }
        if open_fence.is_some() {
            continue;
        }
        if let Some(caps) = atx_heading_re().captures(line) {
            let text = caps.get(1).map_or("", |m| m.as_str()).trim();
            headings.push(text.to_string());
        }
    }
    headings
}

fn normalize_heading(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Required sections absent from `headings`, in declaration order.
pub fn missing_sections(
    required: &[String],
    headings: &[String],
    mode: HeadingMatchMode,
) -> Vec<String> {
    match mode {
        HeadingMatchMode::Exact => required
            .iter()
            .filter(|section| !headings.iter().any(|h| h == section.trim()))
            .cloned()
            .collect(),
        HeadingMatchMode::Normalized => {
            let present: Vec<String> = headings.iter().map(|h| normalize_heading(h)).collect();
            required
                .iter()
                .filter(|section| !present.contains(&normalize_heading(section)))
                .cloned()
                .collect()
        }
    }
}
