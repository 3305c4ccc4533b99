//! Generated regions: the only part of an existing file codegen may touch.
//!
//! A file carries at most one region, delimited by the configured begin and
//! end markers on their own lines. Everything outside the region is
//! hand-written and preserved byte for byte.

use crate::error::MergeConflictError;
use std::ops::Range;

/// Begin/end delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMarkers {
    pub begin: String,
    pub end: String,
}

impl RegionMarkers {
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Locate the region. Returns the byte range strictly between the
    /// markers, or `None` when the file has no markers at all.
    pub fn find(&self, path: &str, text: &str) -> Result<Option<Range<usize>>, MergeConflictError> {
        let conflict = |message: String| MergeConflictError {
            path: path.to_string(),
            message,
        };
        let begins: Vec<usize> = text.match_indices(&self.begin).map(|(i, _)| i).collect();
        let ends: Vec<usize> = text.match_indices(&self.end).map(|(i, _)| i).collect();

        match (begins.as_slice(), ends.as_slice()) {
            ([], []) => Ok(None),
            ([begin], [end]) => {
                let inner_start = begin + self.begin.len();
                if *end < inner_start {
                    return Err(conflict(format!(
                        "end marker `{}` precedes begin marker",
                        self.end
                    )));
                }
                Ok(Some(inner_start..*end))
            }
            ([_, _, ..], _) => Err(conflict(format!(
                "{} begin markers found; exactly one generated region is allowed",
                begins.len()
            ))),
            ([_], []) | ([], [_]) => Err(conflict("unmatched generated-region marker".to_string())),
            _ => Err(conflict(format!(
                "{} end markers found; exactly one generated region is allowed",
                ends.len()
            ))),
        }
    }

    /// Current region body, without the surrounding newlines.
    pub fn extract<'a>(&self, path: &str, text: &'a str) -> Result<Option<&'a str>, MergeConflictError> {
        Ok(self
            .find(path, text)?
            .map(|range| text[range].trim_matches('\n')))
    }

    /// Replace only the bytes between the markers with `body`.
    pub fn replace(&self, path: &str, text: &str, body: &str) -> Result<String, MergeConflictError> {
        let Some(range) = self.find(path, text)? else {
            return Err(MergeConflictError {
                path: path.to_string(),
                message: "no generated region to merge into".to_string(),
            });
        };
        let mut merged = String::with_capacity(text.len() + body.len());
        merged.push_str(&text[..range.start]);
        merged.push_str(&region_body(body));
        merged.push_str(&text[range.end..]);
        Ok(merged)
    }

    /// Wrap `body` in a fresh region.
    pub fn wrap(&self, body: &str) -> String {
        format!("{}{}{}\n", self.begin, region_body(body), self.end)
    }

    /// Strip markers from backend output that already carries a region.
    pub fn unwrap_body<'a>(&self, path: &str, content: &'a str) -> Result<&'a str, MergeConflictError> {
        Ok(self.extract(path, content)?.unwrap_or(content))
    }
}

fn region_body(body: &str) -> String {
    let trimmed = body.trim_matches('\n');
    if trimmed.is_empty() {
        "\n".to_string()
    } else {
        format!("\n{trimmed}\n")
    }
}
