//! Tag handler table and dispatch.
//!
//! Handler identity is a closed sum over the wikitext-representable tags
//! plus a generic-HTML fallback; dispatch is exhaustive pattern matching.
//! Each handler emits the markup for its node and contributes separator
//! constraints from the four boundary roles (before/after/firstChild/
//! lastChild).

use super::attrs;
use super::links;
use super::separators::{SepConstraints, SepInfo};
use super::SerializerState;
use crate::dom;
use crate::error::SerializeError;
use crate::escape::EscapeContext;
use crate::meta::{self, DataMw, Syntax, TemplatePart};
use markup5ever_rcdom::Handle;
use std::rc::Rc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Expansion,
    Placeholder,
    Entity,
    Heading(usize),
    Paragraph,
    List,
    ListItem,
    Table,
    TableSection,
    TableRow,
    TableCell { header: bool },
    TableCaption,
    Quote { bold: bool },
    Break,
    Rule,
    Preformatted,
    Meta,
    NowikiSpan,
    Figure,
    Link,
    Body,
    GenericHtml,
}

/// Pick the handler for an element, in dispatch-priority order: expansion
/// roots, placeholders, entities, image spans, literal-HTML syntax, then
/// the tag-name table with the generic fallback.
pub fn dispatch(state: &SerializerState, node: &Handle) -> Handler {
    let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
    let has_src = state
        .db
        .dp(node)
        .map(|dp| dp.src.is_some())
        .unwrap_or(false);

    if meta::is_expansion_root(&typeof_attr) && (has_src || state.db.mw(node).is_some()) {
        return Handler::Expansion;
    }
    if meta::has_marker(&typeof_attr, meta::MW_PLACEHOLDER) {
        return Handler::Placeholder;
    }
    if meta::has_marker(&typeof_attr, meta::MW_ENTITY) {
        return Handler::Entity;
    }

    let name = dom::element_name(node).unwrap_or("");
    if name == "span" && meta::has_marker(&typeof_attr, meta::MW_IMAGE) {
        return Handler::Figure;
    }
    if name == "span" && meta::has_marker(&typeof_attr, meta::MW_NOWIKI) {
        return Handler::NowikiSpan;
    }
    // The pre handler owns both syntactic forms, including literal HTML.
    if name == "pre" {
        return Handler::Preformatted;
    }
    if state.db.has_html_syntax(node) || has_html_syntax_ancestor(state, node) {
        return Handler::GenericHtml;
    }

    if let Some(level) = dom::heading_level(name) {
        return Handler::Heading(level);
    }
    match name {
        "p" => Handler::Paragraph,
        "ul" | "ol" | "dl" => Handler::List,
        "li" | "dt" | "dd" => Handler::ListItem,
        "table" => Handler::Table,
        "tbody" | "thead" | "tfoot" => Handler::TableSection,
        "tr" => Handler::TableRow,
        "th" => Handler::TableCell { header: true },
        "td" => Handler::TableCell { header: false },
        "caption" => Handler::TableCaption,
        "b" | "strong" => Handler::Quote { bold: true },
        "i" | "em" => Handler::Quote { bold: false },
        "br" => Handler::Break,
        "hr" => Handler::Rule,
        "meta" => Handler::Meta,
        "figure" => Handler::Figure,
        "a" | "link" => {
            let rel = dom::get_attr(node, "rel").unwrap_or_default();
            if meta::parse_link_rel(&rel).is_some() || rel.split_ascii_whitespace().any(|m| m.starts_with("mw:")) {
                Handler::Link
            } else {
                Handler::GenericHtml
            }
        }
        "body" => Handler::Body,
        _ => Handler::GenericHtml,
    }
}

pub fn handler_for(state: &SerializerState, node: &Handle) -> Option<Handler> {
    if dom::is_element(node) {
        Some(dispatch(state, node))
    } else {
        None
    }
}

fn has_html_syntax_ancestor(state: &SerializerState, node: &Handle) -> bool {
    let mut current = dom::parent_of(node);
    while let Some(n) = current {
        if dom::is_element_named(&n, "body") || !dom::is_element(&n) {
            return false;
        }
        if state.db.has_html_syntax(&n) {
            return true;
        }
        current = dom::parent_of(&n);
    }
    false
}

impl Handler {
    pub fn handle(
        &self,
        state: &mut SerializerState,
        node: &Handle,
    ) -> Result<(), SerializeError> {
        match self {
            Handler::Expansion => expansion_handle(state, node),
            Handler::Placeholder => placeholder_handle(state, node),
            Handler::Entity => entity_handle(state, node),
            Handler::Heading(level) => heading_handle(state, node, *level),
            Handler::Paragraph | Handler::Body | Handler::TableSection | Handler::List => {
                state.serialize_children(node, None)
            }
            Handler::ListItem => list_item_handle(state, node),
            Handler::Table => table_handle(state, node),
            Handler::TableRow => table_row_handle(state, node),
            Handler::TableCell { header } => table_cell_handle(state, node, *header),
            Handler::TableCaption => table_caption_handle(state, node),
            Handler::Quote { bold } => quote_handle(state, node, *bold),
            Handler::Break => break_handle(state, node),
            Handler::Rule => rule_handle(state, node),
            Handler::Preformatted => pre_handle(state, node),
            Handler::Meta => meta_handle(state, node),
            Handler::NowikiSpan => nowiki_span_handle(state, node),
            Handler::Figure => links::figure_handle(state, node),
            Handler::Link => links::link_handle(state, node),
            Handler::GenericHtml => generic_html_handle(state, node),
        }
    }

    // Separator constraints, one function per boundary role.

    pub fn sep_before(&self, node: &Handle, other: &Handle, state: &SerializerState) -> SepInfo {
        match self {
            Handler::Heading(_) => SepInfo::new(1, 2),
            Handler::Paragraph => paragraph_before(node, other, state),
            Handler::List => list_before(node, other, state),
            Handler::ListItem => list_item_before(node, other, state),
            Handler::Table => SepInfo::new(1, 2),
            Handler::TableRow => {
                if row_emits_marker(state, node) {
                    SepInfo::new(1, 2)
                } else {
                    SepInfo {
                        min: None,
                        max: Some(2),
                    }
                }
            }
            Handler::TableCell { .. } => {
                if is_row_syntax(state, node) {
                    SepInfo::new(0, 0)
                } else {
                    SepInfo::new(1, 2)
                }
            }
            Handler::TableCaption => SepInfo::new(1, 2),
            Handler::Rule => SepInfo::new(1, 2),
            Handler::Preformatted => {
                if state.db.has_html_syntax(node) {
                    SepInfo::NONE
                } else {
                    SepInfo::new(1, 2)
                }
            }
            _ => SepInfo::NONE,
        }
    }

    pub fn sep_after(&self, node: &Handle, other: &Handle, state: &SerializerState) -> SepInfo {
        match self {
            Handler::Heading(_) => SepInfo::new(1, 2),
            Handler::Paragraph => paragraph_after(node, other, state),
            Handler::List => wt_list_eol(node, other, state),
            Handler::ListItem => {
                // A single-line definition keeps term and description on
                // one line.
                if dom::is_element_named(node, "dt") && is_row_syntax_dd(state, other) {
                    return SepInfo::new(0, 0);
                }
                wt_list_eol(node, other, state)
            }
            Handler::Table => SepInfo::new(1, 2),
            Handler::Rule => SepInfo::new(1, 2),
            Handler::Preformatted => {
                if state.db.has_html_syntax(node) {
                    SepInfo::NONE
                } else {
                    SepInfo::new(1, 2)
                }
            }
            _ => SepInfo::NONE,
        }
    }

    pub fn sep_first_child(
        &self,
        node: &Handle,
        _child: &Handle,
        state: &SerializerState,
    ) -> SepInfo {
        match self {
            Handler::Table => SepInfo::new(1, 2),
            Handler::TableRow => {
                if row_emits_marker(state, node) {
                    SepInfo::new(1, 1)
                } else {
                    SepInfo {
                        min: None,
                        max: Some(2),
                    }
                }
            }
            _ => SepInfo::NONE,
        }
    }

    pub fn sep_last_child(
        &self,
        _node: &Handle,
        _child: &Handle,
        _state: &SerializerState,
    ) -> SepInfo {
        match self {
            Handler::Table => SepInfo::new(1, 2),
            _ => SepInfo::NONE,
        }
    }
}

fn is_row_syntax(state: &SerializerState, node: &Handle) -> bool {
    state
        .db
        .dp(node)
        .map(|dp| dp.is_row_syntax_cell())
        .unwrap_or(false)
}

fn is_row_syntax_dd(state: &SerializerState, node: &Handle) -> bool {
    dom::is_element_named(node, "dd")
        && state
            .db
            .dp(node)
            .map(|dp| dp.stx == Some(Syntax::Row))
            .unwrap_or(false)
}

fn other_is_parent(node: &Handle, other: &Handle) -> bool {
    dom::parent_of(node)
        .map(|p| Rc::ptr_eq(&p, other))
        .unwrap_or(false)
}

fn paragraph_before(node: &Handle, other: &Handle, state: &SerializerState) -> SepInfo {
    if other_is_parent(node, other) {
        if dom::is_list_item(other) {
            return SepInfo::new(0, 0);
        }
        if matches!(dom::element_name(other), Some("td" | "th" | "body")) {
            return SepInfo::new(0, 1);
        }
        return SepInfo::NONE;
    }
    let other_is_plain_p =
        dom::is_element_named(other, "p") && !state.db.has_html_syntax(other);
    if dom::is_text(other) || other_is_plain_p {
        // Two blocks that would otherwise run together on one line.
        return SepInfo::new(2, 2);
    }
    SepInfo::new(1, 2)
}

fn paragraph_after(node: &Handle, other: &Handle, state: &SerializerState) -> SepInfo {
    if other_is_parent(node, other) {
        return SepInfo::NONE;
    }
    let ends_with_br = dom::last_non_sep_child(node)
        .map(|c| dom::is_element_named(&c, "br"))
        .unwrap_or(false);
    if dom::is_element_named(other, "p") && !state.db.has_html_syntax(other) && !ends_with_br {
        return SepInfo::new(2, 2);
    }
    SepInfo::NONE
}

fn list_before(node: &Handle, other: &Handle, _state: &SerializerState) -> SepInfo {
    if other_is_parent(node, other) {
        if dom::is_list_item(other) {
            // Deferred-bullet position: the item emitted nothing yet.
            return SepInfo::NONE;
        }
        return SepInfo::new(1, 2);
    }
    let in_list_item = dom::parent_of(node)
        .map(|p| dom::is_list_item(&p))
        .unwrap_or(false);
    if in_list_item && dom::is_text(other) {
        // Sublist after the item's line content starts on the next line.
        return SepInfo::new(1, 1);
    }
    SepInfo::new(1, 2)
}

fn list_item_before(node: &Handle, other: &Handle, state: &SerializerState) -> SepInfo {
    if is_row_syntax_dd(state, node) {
        return SepInfo::new(0, 0);
    }
    if other_is_parent(node, other) {
        return SepInfo::NONE;
    }
    if dom::is_list_item(other) {
        return SepInfo::new(1, 1);
    }
    SepInfo::NONE
}

/// Shared end-of-list constraint.
fn wt_list_eol(node: &Handle, other: &Handle, state: &SerializerState) -> SepInfo {
    if other_is_parent(node, other) {
        return SepInfo::NONE;
    }
    let other_has_src = state
        .db
        .dp(other)
        .map(|dp| dp.src.is_some())
        .unwrap_or(false);
    if state.db.has_html_syntax(other) || other_has_src {
        return SepInfo::new(0, 2);
    }
    let other_name = dom::element_name(other);
    let other_listish = dom::is_list(other) || dom::is_list_item(other);
    if dom::is_list(node) && other_name == dom::element_name(node) {
        // Anything tighter would merge the two lists on reparse.
        return SepInfo::new(2, 2);
    }
    if dom::is_list_item(node) && other_listish {
        return SepInfo::new(1, 1);
    }
    SepInfo::new(1, 2)
}

// Individual handlers.

fn heading_handle(
    state: &mut SerializerState,
    node: &Handle,
    level: usize,
) -> Result<(), SerializeError> {
    let markers = "=".repeat(level);
    state.emit(&markers, node);
    if node.children.borrow().is_empty() {
        // Keeps the empty heading from collapsing into a run of `=`.
        state.emit("<nowiki/>", node);
    } else {
        state.serialize_children(node, Some(EscapeContext::Heading))?;
    }
    state.emit(&markers, node);
    Ok(())
}

fn list_item_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let row_dd = is_row_syntax_dd(state, node);
    if row_dd {
        state.emit(":", node);
    } else {
        let defers_to_sublist = dom::first_non_sep_child(node)
            .map(|f| dom::is_list(&f))
            .unwrap_or(false);
        if !defers_to_sublist {
            let bullets = list_bullets(state, node);
            state.emit(&bullets, node);
        }
    }
    state.serialize_children(node, Some(EscapeContext::ListItem))
}

/// Bullet prefix for a list item: one character per wikitext-syntax list
/// or definition ancestor, outermost first.
fn list_bullets(state: &SerializerState, node: &Handle) -> String {
    let mut bullets = Vec::new();
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if !(dom::is_list(&n) || dom::is_list_item(&n)) || state.db.has_html_syntax(&n) {
            break;
        }
        match dom::element_name(&n) {
            Some("ul") => bullets.push('*'),
            Some("ol") => bullets.push('#'),
            Some("dd") => bullets.push(':'),
            Some("dt") => bullets.push(';'),
            _ => {}
        }
        current = dom::parent_of(&n);
    }
    bullets.reverse();
    bullets.into_iter().collect()
}

fn table_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let (start, end) = {
        let dp = state.db.dp(node);
        (
            dp.and_then(|d| d.start_tag_src.clone())
                .unwrap_or_else(|| "{|".to_string()),
            dp.and_then(|d| d.end_tag_src.clone())
                .unwrap_or_else(|| "|}".to_string()),
        )
    };
    let attrs_text = attrs::serialize_attributes(state, node);
    let mut open = start;
    if !attrs_text.is_empty() {
        open.push(' ');
        open.push_str(&attrs_text);
    }
    state.emit(&open, node);
    state.serialize_children(node, None)?;
    state.emit(&end, node);
    Ok(())
}

pub(super) fn row_emits_marker(state: &SerializerState, node: &Handle) -> bool {
    let has_start_src = state
        .db
        .dp(node)
        .map(|d| d.start_tag_src.is_some())
        .unwrap_or(false);
    has_start_src || !is_first_row(node)
}

fn is_first_row(node: &Handle) -> bool {
    let mut prev = dom::prev_non_sep_sibling(node);
    while let Some(p) = prev {
        if dom::is_element_named(&p, "tr") {
            return false;
        }
        prev = dom::prev_non_sep_sibling(&p);
    }
    // Rows may be split across thead/tbody/tfoot sections.
    if let Some(parent) = dom::parent_of(node) {
        if matches!(dom::element_name(&parent), Some("tbody" | "thead" | "tfoot")) {
            let mut section = dom::prev_non_sep_sibling(&parent);
            while let Some(s) = section {
                if contains_row(&s) {
                    return false;
                }
                section = dom::prev_non_sep_sibling(&s);
            }
        }
    }
    true
}

fn contains_row(node: &Handle) -> bool {
    dom::children_of(node)
        .iter()
        .any(|c| dom::is_element_named(c, "tr") || contains_row(c))
}

fn table_row_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    if row_emits_marker(state, node) {
        let start = state
            .db
            .dp(node)
            .and_then(|d| d.start_tag_src.clone())
            .unwrap_or_else(|| "|-".to_string());
        let attrs_text = attrs::serialize_attributes(state, node);
        let mut open = start;
        if !attrs_text.is_empty() {
            open.push(' ');
            open.push_str(&attrs_text);
        }
        state.emit(&open, node);
    }
    state.serialize_children(node, None)
}

fn table_cell_handle(
    state: &mut SerializerState,
    node: &Handle,
    header: bool,
) -> Result<(), SerializeError> {
    let row_syntax = is_row_syntax(state, node);
    let marker = match (header, row_syntax) {
        (true, true) => "!!",
        (true, false) => "!",
        (false, true) => "||",
        (false, false) => "|",
    };
    let attrs_text = attrs::serialize_attributes(state, node);
    let mut open = marker.to_string();
    if !attrs_text.is_empty() {
        let attr_sep = state
            .db
            .dp(node)
            .and_then(|d| d.attr_sep_src.clone())
            .unwrap_or_else(|| "|".to_string());
        open.push_str(&attrs_text);
        open.push_str(&attr_sep);
    }
    state.emit(&open, node);

    let saved_wide = state.in_wide_td;
    state.in_wide_td = !header && !row_syntax;
    let context = if header {
        EscapeContext::TableHeader
    } else {
        EscapeContext::TableCell
    };
    let result = state.serialize_children(node, Some(context));
    state.in_wide_td = saved_wide;
    result
}

fn table_caption_handle(
    state: &mut SerializerState,
    node: &Handle,
) -> Result<(), SerializeError> {
    let attrs_text = attrs::serialize_attributes(state, node);
    let mut open = "|+".to_string();
    if !attrs_text.is_empty() {
        open.push_str(&attrs_text);
        open.push('|');
    }
    state.emit(&open, node);
    state.serialize_children(node, Some(EscapeContext::TableCell))
}

fn quote_handle(
    state: &mut SerializerState,
    node: &Handle,
    bold: bool,
) -> Result<(), SerializeError> {
    let marker = if bold { "'''" } else { "''" };
    if state.sep.src.is_empty() && preceded_by_quote(node) {
        // Adjacent quote runs would merge into a different marker.
        state.emit("<nowiki/>", node);
    }
    state.emit(marker, node);
    state.serialize_children(node, Some(EscapeContext::Quote))?;
    state.emit(marker, node);
    Ok(())
}

fn is_quote_element(node: &Handle) -> bool {
    matches!(dom::element_name(node), Some("b" | "i" | "strong" | "em"))
}

fn preceded_by_quote(node: &Handle) -> bool {
    let Some(prev) = dom::prev_sibling(node) else {
        return false;
    };
    if !dom::is_element(&prev) {
        return false;
    }
    if is_quote_element(&prev) {
        return true;
    }
    let last = dom::deepest_last_descendant(&prev);
    is_quote_element(&last)
        || dom::parent_of(&last)
            .map(|p| is_quote_element(&p))
            .unwrap_or(false)
}

fn break_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let parent_is_p = dom::parent_of(node)
        .map(|p| dom::is_element_named(&p, "p"))
        .unwrap_or(false);
    if state.db.has_html_syntax(node) || !parent_is_p {
        let attrs_text = attrs::serialize_attributes(state, node);
        let tag = if attrs_text.is_empty() {
            "<br>".to_string()
        } else {
            format!("<br {attrs_text}>")
        };
        state.emit(&tag, node);
    } else {
        // Inside a paragraph the break is the blank line itself: rewrite
        // the pending boundary into a forced paragraph break.
        state.sep.constraints = Some(SepConstraints {
            min: 2,
            max: 2,
            left_had_min: true,
            a: "br".to_string(),
            b: "br".to_string(),
        });
    }
    Ok(())
}

fn rule_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let extra = state
        .db
        .dp(node)
        .and_then(|d| d.extra_dashes)
        .unwrap_or(0);
    state.emit(&"-".repeat(4 + extra), node);
    Ok(())
}

fn pre_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    if state.db.has_html_syntax(node) {
        let attrs_text = attrs::serialize_attributes(state, node);
        let open = if attrs_text.is_empty() {
            "<pre>".to_string()
        } else {
            format!("<pre {attrs_text}>")
        };
        state.emit(&open, node);

        let stripped_nl = state
            .db
            .dp(node)
            .map(|d| d.stripped_nl)
            .unwrap_or(false);
        let saved_escape = state.escape_text;
        state.escape_text = false;
        state.in_html_pre = true;
        let content = state.capture_children(node, None, false);
        state.in_html_pre = false;
        state.escape_text = saved_escape;
        let content = content?;

        let mut body = String::new();
        if stripped_nl && !content.starts_with('\n') {
            body.push('\n');
        }
        body.push_str(&content.replace("</pre", "&lt;/pre"));
        state.emit(&body, node);
        state.emit("</pre>", node);
    } else {
        state.in_indent_pre = true;
        let content = state.capture_children(node, None, false);
        state.in_indent_pre = false;
        state.emit(&indent_pre_content(&content?), node);
    }
    Ok(())
}

/// Indent every line of an indent-pre body, leaving newlines inside
/// comments alone and not indenting past a final trailing newline.
fn indent_pre_content(content: &str) -> String {
    let mut out = String::from(" ");
    let mut i = 0;
    while i < content.len() {
        if content[i..].starts_with("<!--") {
            let end = content[i + 4..]
                .find("-->")
                .map(|e| i + 4 + e + 3)
                .unwrap_or(content.len());
            out.push_str(&content[i..end]);
            i = end;
            continue;
        }
        let ch = content[i..].chars().next().expect("in-bounds index");
        out.push(ch);
        i += ch.len_utf8();
        if ch == '\n' && i < content.len() {
            out.push(' ');
        }
    }
    out
}

fn meta_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
    let property = dom::get_attr(node, "property").unwrap_or_default();

    if meta::has_marker(&typeof_attr, meta::MW_DIFF_MARKER)
        || meta::has_marker(&typeof_attr, meta::MW_SEPARATOR)
    {
        return Ok(());
    }

    if meta::has_marker(&typeof_attr, "mw:tag") {
        let content = dom::get_attr(node, "content").unwrap_or_default();
        state.emit(&format!("<{content}>"), node);
        if content == "nowiki" {
            state.in_nowiki = true;
        } else if content == "/nowiki" {
            state.in_nowiki = false;
        }
        return Ok(());
    }

    if let Some(kind) = meta::marker_suffix(&typeof_attr, "mw:Includes/") {
        let text = state
            .db
            .dp(node)
            .and_then(|d| d.src.clone())
            .unwrap_or_else(|| includes_tag(kind));
        state.emit(&text, node);
        return Ok(());
    }

    if let Some(name) = property.strip_prefix("mw:PageProp/") {
        let content = dom::get_attr(node, "content").unwrap_or_default();
        let magic_src = state.db.dp(node).and_then(|d| d.magic_src.clone());
        let text = match magic_src {
            Some(src) if src.contains("$1") => src.replace("$1", &content),
            Some(src) => src,
            None => match state.env.site.page_prop_word(&name.to_ascii_lowercase()) {
                Some(pattern) if pattern.contains("$1") => {
                    format!("{{{{{}}}}}", pattern.replace("$1", &content))
                }
                Some(word) => word.to_string(),
                None => {
                    warn!(property = %name, "unknown page property");
                    String::new()
                }
            },
        };
        state.emit(&text, node);
        return Ok(());
    }

    // Remaining metas carry no wikitext of their own.
    Ok(())
}

fn includes_tag(kind: &str) -> String {
    let (name, end) = match kind.strip_suffix("/End") {
        Some(n) => (n, true),
        None => (kind, false),
    };
    let tag = name.to_ascii_lowercase();
    if end {
        format!("</{tag}>")
    } else {
        format!("<{tag}>")
    }
}

fn nowiki_span_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    state.emit("<nowiki>", node);
    for child in dom::children_of(node) {
        if dom::is_text(&child) {
            let text = dom::text_of(&child).unwrap_or_default();
            let escaped = text
                .replace("<nowiki>", "&lt;nowiki&gt;")
                .replace("</nowiki>", "&lt;/nowiki&gt;");
            state.emit(&escaped, &child);
        } else if dom::is_element(&child) {
            let entity = dom::get_attr(&child, "typeof")
                .map(|t| meta::has_marker(&t, meta::MW_ENTITY))
                .unwrap_or(false);
            if entity {
                state.serialize_node(&child)?;
            } else {
                state.emit(&dom::text_content(&child), &child);
            }
        }
    }
    state.emit("</nowiki>", node);
    Ok(())
}

fn expansion_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
    let about = dom::get_attr(node, "about");
    let src = state.db.dp(node).and_then(|d| d.src.clone());

    let use_src = state.env.rt_testing || meta::is_extension_root(&typeof_attr);
    let text = match (use_src, src, state.db.mw(node)) {
        (true, Some(src), _) => src,
        (_, _, Some(mw)) => reconstruct_transclusion(mw),
        (_, Some(src), None) => src,
        (_, None, None) => {
            warn!(node = %dom::node_name(node), "expansion root without data-mw or source");
            String::new()
        }
    };
    state.emit(&text, node);
    if let Some(about) = about {
        state.active_template_id = Some(about);
    }
    Ok(())
}

/// Rebuild `{{ target | name=value | … }}` from a data-mw record.
/// Positional arguments (keys equal to their index) emit the value alone.
pub fn reconstruct_transclusion(mw: &DataMw) -> String {
    let mut out = String::new();
    for part in &mw.parts {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Template(wrapper) => {
                let template = &wrapper.template;
                out.push_str("{{");
                out.push_str(
                    template
                        .target
                        .wt
                        .as_deref()
                        .or(template.target.function.as_deref())
                        .unwrap_or(""),
                );
                let mut position = 1usize;
                for (key, value) in &template.params {
                    let wt = meta::param_wikitext(value).unwrap_or("");
                    out.push('|');
                    if *key == position.to_string() {
                        out.push_str(wt);
                        position += 1;
                    } else {
                        out.push_str(key);
                        out.push('=');
                        out.push_str(wt);
                    }
                }
                out.push_str("}}");
            }
        }
    }
    out
}

fn placeholder_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    match state.db.dp(node).and_then(|d| d.src.clone()) {
        Some(src) if !src.is_empty() && src.chars().all(|c| c == '\n') => {
            // Newline-only placeholders are separator material.
            state.sep.src.push_str(&src);
        }
        Some(src) => state.emit(&src, node),
        None => warn!(node = %dom::node_name(node), "placeholder without source"),
    }
    Ok(())
}

fn entity_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let content = dom::text_content(node);
    let dp = state.db.dp(node);
    let src = dp.and_then(|d| d.src.clone());
    let src_content = dp.and_then(|d| d.src_content.clone());
    let text = match (src, src_content) {
        (Some(src), Some(expected)) if expected == content => src,
        _ => content,
    };
    state.emit(&text, node);
    Ok(())
}

fn generic_html_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let name = dom::element_name(node).unwrap_or("span").to_string();
    let (auto_start, auto_end, self_close) = {
        let dp = state.db.dp(node);
        (
            dp.map(|d| d.auto_inserted_start).unwrap_or(false),
            dp.map(|d| d.auto_inserted_end).unwrap_or(false),
            dp.map(|d| d.self_close).unwrap_or(false),
        )
    };
    let void = dom::is_void_element(&name);

    if !auto_start {
        let attrs_text = attrs::serialize_attributes(state, node);
        let mut open = format!("<{name}");
        if !attrs_text.is_empty() {
            open.push(' ');
            open.push_str(&attrs_text);
        }
        open.push_str(if self_close { "/>" } else { ">" });
        state.emit(&open, node);
    }
    if void || self_close {
        return Ok(());
    }

    let saved_php = state.in_php_block;
    let saved_pre = state.in_html_pre;
    if dom::is_block_scope_element(&name) {
        state.in_php_block = true;
    }
    if name == "pre" {
        state.in_html_pre = true;
    }
    let result = state.serialize_children(node, None);
    state.in_php_block = saved_php;
    state.in_html_pre = saved_pre;
    result?;

    if !auto_end {
        state.emit(&format!("</{name}>"), node);
    }
    Ok(())
}
