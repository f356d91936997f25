//! Separator algebra: merging per-tag newline constraints and rebuilding
//! the whitespace/comment run between two adjacent nodes.
//!
//! A separator is any string of whitespace and complete HTML comments.
//! Handlers contribute `{min, max}` newline constraints from both sides of
//! a boundary; the engine merges them and then pads or trims a candidate
//! separator (accumulated from the DOM or sliced from the original source)
//! until it satisfies the merged constraints.

use tracing::warn;

/// A single-sided newline constraint. `None` means "don't care".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SepInfo {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl SepInfo {
    pub const NONE: SepInfo = SepInfo {
        min: None,
        max: None,
    };

    pub fn new(min: usize, max: usize) -> Self {
        SepInfo {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Merged constraints for one boundary, with the node names that produced
/// them kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SepConstraints {
    pub min: usize,
    pub max: usize,
    /// Whether the left-hand side ever asserted a minimum. Needed for the
    /// start-of-output adjustment.
    pub left_had_min: bool,
    pub a: String,
    pub b: String,
}

/// Pending separator between the last emitted node and the next.
#[derive(Debug, Clone, Default)]
pub struct Separator {
    pub constraints: Option<SepConstraints>,
    /// Separator text accumulated from whitespace text nodes and comments.
    pub src: String,
}

impl Separator {
    pub fn is_pending(&self) -> bool {
        self.constraints.is_some() || !self.src.is_empty()
    }

    /// Merge a constraint pair into the pending constraints. On a
    /// `min > max` conflict the newer pair wins: its max overrides and the
    /// minimum is clamped down to it.
    pub fn add_constraints(&mut self, a_name: &str, a: SepInfo, b_name: &str, b: SepInfo) {
        let pair_min = a.min.unwrap_or(0).max(b.min.unwrap_or(0));
        let pair_max = a.max.unwrap_or(2).min(b.max.unwrap_or(2));

        let merged = match self.constraints.take() {
            Some(existing) => {
                let mut min = existing.min.max(pair_min);
                let mut max = existing.max.min(pair_max);
                if min > max {
                    warn!(
                        a = %a_name,
                        b = %b_name,
                        min,
                        max,
                        "conflicting separator constraints; newer max wins"
                    );
                    max = pair_max;
                    min = min.min(max);
                }
                SepConstraints {
                    min,
                    max,
                    left_had_min: existing.left_had_min || a.min.is_some(),
                    a: existing.a,
                    b: b_name.to_string(),
                }
            }
            None => SepConstraints {
                min: pair_min,
                max: pair_max,
                left_had_min: a.min.is_some(),
                a: a_name.to_string(),
                b: b_name.to_string(),
            },
        };
        self.constraints = Some(merged);
    }
}

/// True if `s` matches the separator grammar
/// `(\s | <!-- ([^-] | -(?!->))* -->)*`.
pub fn is_valid_separator(s: &str) -> bool {
    let mut i = 0;
    while i < s.len() {
        if s[i..].starts_with("<!--") {
            match s[i + 4..].find("-->") {
                Some(end) => i += 4 + end + 3,
                None => return false,
            }
            continue;
        }
        match s[i..].chars().next() {
            Some(c) if c.is_whitespace() => i += c.len_utf8(),
            _ => return false,
        }
    }
    true
}

/// Count the newlines that actually separate content: newlines inside
/// comment bodies do not count, and a line holding only comments is
/// absorbed together with its trailing newline.
pub fn count_visible_newlines(s: &str) -> usize {
    let mut count = 0;
    let mut i = 0;
    let mut line_has_comment = false;
    let mut line_has_other = false;
    while i < s.len() {
        if s[i..].starts_with("<!--") {
            line_has_comment = true;
            match s[i + 4..].find("-->") {
                Some(end) => i += 4 + end + 3,
                None => break,
            }
            continue;
        }
        let Some(c) = s[i..].chars().next() else { break };
        if c == '\n' {
            if !(line_has_comment && !line_has_other) {
                count += 1;
            }
            line_has_comment = false;
            line_has_other = false;
        } else if !matches!(c, ' ' | '\t' | '\r') {
            line_has_other = true;
        }
        i += c.len_utf8();
    }
    count
}

/// Remove the rightmost newline that is not inside a comment body.
fn remove_last_plain_newline(s: &mut String) -> bool {
    let mut last = None;
    let mut i = 0;
    while i < s.len() {
        if s[i..].starts_with("<!--") {
            match s[i + 4..].find("-->") {
                Some(end) => i += 4 + end + 3,
                None => break,
            }
            continue;
        }
        let Some(c) = s[i..].chars().next() else { break };
        if c == '\n' {
            last = Some(i);
        }
        i += c.len_utf8();
    }
    match last {
        Some(pos) => {
            s.remove(pos);
            true
        }
        None => false,
    }
}

/// Materialize a separator: adjust the candidate string until it satisfies
/// the merged constraints.
///
/// `right_pre_safe` is true when the node following the separator may be
/// preceded by indentation without triggering an indent-pre.
pub fn materialize(
    constraints: Option<&SepConstraints>,
    candidate: &str,
    at_start_of_output: bool,
    right_pre_safe: bool,
) -> String {
    let mut sep = candidate.to_string();
    let Some(constraints) = constraints else {
        return sep;
    };

    let mut min = constraints.min;
    let max = constraints.max;
    if at_start_of_output && !constraints.left_had_min && min > 0 {
        min -= 1;
    }

    let mut count = count_visible_newlines(&sep);
    while count < min {
        sep.push('\n');
        count += 1;
    }
    while count > max {
        if !remove_last_plain_newline(&mut sep) {
            break;
        }
        count -= 1;
    }

    if min > 0 && !right_pre_safe {
        // Indentation at the head of the new line would start an
        // indent-pre in front of the next node.
        while sep.ends_with(' ') || sep.ends_with('\t') {
            sep.pop();
        }
    }
    sep
}
