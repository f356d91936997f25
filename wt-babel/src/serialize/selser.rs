//! Selective serialization: verbatim reuse of original source for
//! unmodified subtrees.
//!
//! A node qualifies when it carries a valid source range and neither it
//! nor anything below it has a diff mark. Separator runs at the edges of
//! the slice are handed back to the separator engine when the adjacent
//! sibling was edited, so the engine can reconcile them with the emitted
//! replacement.

use super::SerializerState;
use crate::dom;
use crate::error::SerializeError;
use crate::meta;
use markup5ever_rcdom::Handle;
use tracing::error;

/// Try to emit `node` verbatim from the original source. Returns `true`
/// when the node was handled and the tag handler must be skipped.
pub fn try_emit_original(
    state: &mut SerializerState,
    node: &Handle,
) -> Result<bool, SerializeError> {
    let db = state.db;
    if db.is_marked(node) || subtree_has_marks(state, node) {
        return Ok(false);
    }
    let env = state.env;
    let Some(page_src) = env.page.src.as_deref() else {
        return Ok(false);
    };
    let Some(dsr) = db.dp(node).and_then(|d| d.dsr) else {
        return Ok(false);
    };
    if !dsr.is_valid() {
        error!(node = %dom::node_name(node), "backwards source range; falling back to handler");
        return Ok(false);
    }
    let (Some(start), Some(end)) = (dsr.start, dsr.end) else {
        return Ok(false);
    };
    let Some(full) = page_src.get(start..end) else {
        error!(
            node = %dom::node_name(node),
            start,
            end,
            "source range outside the page source; falling back to handler"
        );
        return Ok(false);
    };

    let mut slice = full;
    let is_indent_pre =
        dom::is_element_named(node, "pre") && !db.has_html_syntax(node);

    // A modified previous sibling already re-emitted its own surroundings;
    // give our leading separator run back to the engine to reconcile.
    if !is_indent_pre {
        let prev_marked = dom::prev_non_sep_sibling(node)
            .map(|p| db.is_marked(&p))
            .unwrap_or(false);
        if prev_marked {
            let cut = leading_separator_len(slice);
            state.sep.src.push_str(&slice[..cut]);
            slice = &slice[cut..];
        }
    }
    let next_marked = dom::next_non_sep_sibling(node)
        .map(|n| db.is_marked(&n))
        .unwrap_or(false);
    let mut trailing = "";
    if next_marked {
        let cut = trailing_separator_len(slice);
        trailing = &slice[slice.len() - cut..];
        slice = &slice[..slice.len() - cut];
    }

    state.curr_node_unmodified = true;
    state.emit(slice, node);
    if !trailing.is_empty() {
        state.sep.src.push_str(trailing);
    }

    // An emitted expansion root covers its whole about group.
    let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
    if meta::is_expansion_root(&typeof_attr) {
        if let Some(about) = dom::get_attr(node, "about") {
            state.active_template_id = Some(about);
        }
    }
    Ok(true)
}

fn subtree_has_marks(state: &SerializerState, node: &Handle) -> bool {
    dom::children_of(node).iter().any(|child| {
        (dom::is_element(child) && state.db.is_marked(child)) || subtree_has_marks(state, child)
    })
}

/// Length of the leading run of whitespace and complete comments.
fn leading_separator_len(s: &str) -> usize {
    let mut i = 0;
    loop {
        if s[i..].starts_with("<!--") {
            match s[i + 4..].find("-->") {
                Some(end) => i += 4 + end + 3,
                None => break,
            }
        } else {
            match s[i..].chars().next() {
                Some(c) if c.is_whitespace() => i += c.len_utf8(),
                _ => break,
            }
        }
    }
    i
}

/// Length of the trailing run of whitespace and complete comments.
fn trailing_separator_len(s: &str) -> usize {
    let mut end = s.len();
    loop {
        let head = &s[..end];
        if head.ends_with("-->") {
            match head.rfind("<!--") {
                Some(pos) if pos + 4 <= end => {
                    // Only a full comment counts; a stray arrow is content.
                    if head[pos..].starts_with("<!--") && head[pos + 4..end - 3].find("-->").is_none()
                    {
                        end = pos;
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        match head.chars().next_back() {
            Some(c) if c.is_whitespace() => end -= c.len_utf8(),
            _ => break,
        }
    }
    s.len() - end
}
