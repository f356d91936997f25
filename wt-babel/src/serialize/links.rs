//! Link and figure handlers: wikilinks, external links, magic links, and
//! image syntax, with their round-trip decisions.

use super::{attrs, SerializerState};
use crate::dom;
use crate::error::SerializeError;
use crate::escape::EscapeContext;
use crate::meta::{self, ExtLinkKind, LinkType, WikiLinkKind};
use markup5ever_rcdom::Handle;
use tracing::warn;
use url::Url;

/// Round-trip data derived from a link element before emission.
struct LinkData {
    link_type: Option<LinkType>,
    target: String,
    target_from_src: bool,
    target_modified: bool,
    tail: String,
    prefix: String,
    pipetrick: bool,
    /// `Some` when the content is plain text (empty string for no
    /// children); `None` when it needs recursive serialization.
    text_content: Option<String>,
}

fn strip_parsoid_href(href: &str) -> String {
    href.strip_prefix("./").unwrap_or(href).to_string()
}

fn link_round_trip_data(state: &SerializerState, node: &Handle) -> LinkData {
    let rel = dom::get_attr(node, "rel").unwrap_or_default();
    let mut link_type = meta::parse_link_rel(&rel);
    if link_type.is_none() {
        let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
        if meta::has_marker(&typeof_attr, meta::MW_IMAGE) {
            link_type = Some(LinkType::Image);
        }
    }

    let href = dom::get_attr(node, "href").unwrap_or_default();
    let shadow = attrs::attribute_shadow(state, node, "href", &href);
    let (mut target, mut target_from_src) = if shadow.from_src {
        (shadow.value.clone(), true)
    } else {
        (strip_parsoid_href(&shadow.value), false)
    };

    // A templated target is immutable: emit the recorded source.
    let about = dom::get_attr(node, "about");
    if let Some(tpl) = about.as_ref().and_then(|a| state.tpl_attrs.get(a)) {
        if let Some(src) = tpl.vs.get("href") {
            target = src.clone();
            target_from_src = true;
        }
    }

    let dp = state.db.dp(node);
    let text_content = if node.children.borrow().is_empty() {
        Some(String::new())
    } else if dom::all_children_are_text(node) {
        Some(dom::text_content(node))
    } else {
        None
    };

    LinkData {
        link_type,
        target,
        target_from_src,
        target_modified: shadow.modified,
        tail: dp.and_then(|d| d.tail.clone()).unwrap_or_default(),
        prefix: dp.and_then(|d| d.prefix.clone()).unwrap_or_default(),
        pipetrick: dp.map(|d| d.pipetrick).unwrap_or(false),
        text_content,
    }
}

pub fn link_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let data = link_round_trip_data(state, node);
    match data.link_type {
        Some(LinkType::WikiLink(kind)) => wikilink_emit(state, node, &data, kind),
        Some(LinkType::ExtLink(kind)) => extlink_emit(state, node, &data, kind),
        Some(LinkType::Image) => figure_handle(state, node),
        None => {
            warn!(node = %dom::node_name(node), "link with unrecognized rel; using external form");
            extlink_emit(state, node, &data, ExtLinkKind::Bracketed)
        }
    }
}

fn wikilink_emit(
    state: &mut SerializerState,
    node: &Handle,
    data: &LinkData,
    kind: WikiLinkKind,
) -> Result<(), SerializeError> {
    let target = &data.target;

    match kind {
        WikiLinkKind::Category => {
            // The sort key rides in the fragment part of the target.
            let (page, sort_key) = match target.split_once('#') {
                Some((page, sort)) => (page.to_string(), Some(sort.to_string())),
                None => (target.clone(), None),
            };
            let text = match sort_key {
                Some(sort) if !sort.is_empty() => format!("[[{page}|{sort}]]"),
                _ => format!("[[{page}]]"),
            };
            state.emit(&text, node);
            return Ok(());
        }
        WikiLinkKind::Language | WikiLinkKind::Interwiki => {
            state.emit(&format!("[[{target}]]"), node);
            return Ok(());
        }
        WikiLinkKind::Simple => {}
    }

    let prefix = &data.prefix;
    let tail = &data.tail;

    if let Some(content) = &data.text_content {
        if !content.is_empty() {
            // Tail elision: content = target + tail serializes as
            // `[[target]]tail`.
            if !tail.is_empty() && content.ends_with(tail.as_str()) {
                let stem = &content[..content.len() - tail.len()];
                if state.env.titles_match(stem, target) {
                    // The content text is the link, so emitting it keeps
                    // the display casing while targeting the same page.
                    state.emit(&format!("{prefix}[[{stem}]]{tail}"), node);
                    return Ok(());
                }
            }
            if tail.is_empty() && state.env.titles_match(content, target) {
                state.emit(&format!("{prefix}[[{content}]]"), node);
                return Ok(());
            }
        }
        if data.pipetrick && !state.db.is_marked(node) {
            state.emit(&format!("{prefix}[[{target}|]]{tail}"), node);
            return Ok(());
        }
        if content.is_empty() {
            // An empty piped content would be pipe-trick-expanded by the
            // pre-save transform; block that.
            state.emit(&format!("{prefix}[[{target}|<nowiki/>]]{tail}"), node);
            return Ok(());
        }
    }

    let content_wt = state.capture_children(node, Some(EscapeContext::Link), false)?;
    state.emit(&format!("{prefix}[[{target}|{content_wt}]]{tail}"), node);
    Ok(())
}

fn encoded_target(data: &LinkData) -> String {
    if data.target_modified && !data.target_from_src {
        match Url::parse(&data.target) {
            Ok(url) => url.to_string(),
            Err(_) => data.target.clone(),
        }
    } else {
        data.target.clone()
    }
}

fn extlink_emit(
    state: &mut SerializerState,
    node: &Handle,
    data: &LinkData,
    kind: ExtLinkKind,
) -> Result<(), SerializeError> {
    match kind {
        ExtLinkKind::Url => {
            // An autolinked bare URL: the content is the URL text itself.
            let text = match &data.text_content {
                Some(content) if !content.is_empty() => content.clone(),
                _ => encoded_target(data),
            };
            state.emit(&text, node);
            Ok(())
        }
        ExtLinkKind::Numbered => {
            state.emit(&format!("[{}]", encoded_target(data)), node);
            Ok(())
        }
        ExtLinkKind::Isbn | ExtLinkKind::Rfc | ExtLinkKind::Pmid => {
            // Magic links serialize as their display text.
            state.emit(&dom::text_content(node), node);
            Ok(())
        }
        ExtLinkKind::Bracketed => {
            let url = encoded_target(data);
            if node.children.borrow().is_empty() {
                state.emit(&format!("[{url}]"), node);
            } else {
                let content_wt = state.capture_children(node, Some(EscapeContext::Link), false)?;
                state.emit(&format!("[{url} {content_wt}]"), node);
            }
            Ok(())
        }
    }
}

// Figures and inline images.

fn find_img(node: &Handle) -> Option<Handle> {
    for child in dom::children_of(node) {
        if dom::is_element_named(&child, "img") {
            return Some(child);
        }
        if dom::is_element(&child) {
            if let Some(img) = find_img(&child) {
                return Some(img);
            }
        }
    }
    None
}

fn find_caption(node: &Handle) -> Option<Handle> {
    dom::children_of(node)
        .into_iter()
        .find(|c| dom::is_element_named(c, "figcaption"))
}

fn leading_digits(text: &str) -> Option<String> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Emit `[[Resource|opt|…|caption]]` by walking the recorded option list.
pub fn figure_handle(state: &mut SerializerState, node: &Handle) -> Result<(), SerializeError> {
    let Some(img) = find_img(node) else {
        warn!(node = %dom::node_name(node), "figure without an image; nothing emitted");
        return Ok(());
    };
    let resource = dom::get_attr(&img, "resource")
        .or_else(|| dom::get_attr(&img, "src"))
        .map(|r| strip_parsoid_href(&r))
        .unwrap_or_default();
    if resource.is_empty() {
        warn!(node = %dom::node_name(node), "image without a resource; nothing emitted");
        return Ok(());
    }
    let caption = find_caption(node);

    let option_list = {
        let from_figure = state.db.dp(node).map(|d| d.option_list.clone());
        match from_figure {
            Some(list) if !list.is_empty() => list,
            _ => state
                .db
                .dp(&img)
                .map(|d| d.option_list.clone())
                .unwrap_or_default(),
        }
    };

    let mut options: Vec<String> = Vec::new();
    let mut size_slot: Option<usize> = None;
    let mut width: Option<String> = None;
    let mut height: Option<String> = None;

    for option in &option_list {
        match option.ck.as_str() {
            "width" => {
                width = leading_digits(&option.ak).or_else(|| dom::get_attr(&img, "width"));
                if size_slot.is_none() {
                    size_slot = Some(options.len());
                    options.push(String::new());
                }
            }
            "height" => {
                height = leading_digits(&option.ak).or_else(|| dom::get_attr(&img, "height"));
                if size_slot.is_none() {
                    size_slot = Some(options.len());
                    options.push(String::new());
                }
            }
            "caption" => match &caption {
                Some(caption_node) => {
                    let text =
                        state.capture_children(caption_node, Some(EscapeContext::Link), false)?;
                    options.push(text);
                }
                None => {
                    warn!("image option list names a caption but the figure has none");
                }
            },
            ck => {
                if state.env.site.image_prefix_option(ck).is_some() {
                    if !option.ak.is_empty() {
                        options.push(option.ak.clone());
                    } else if let Some(text) =
                        state.env.site.replace_interpolated_magic_word(ck, "")
                    {
                        options.push(text);
                    }
                } else if let Some(word) = state.env.site.image_option(ck) {
                    options.push(word.to_string());
                } else if !option.ak.is_empty() {
                    options.push(option.ak.clone());
                } else {
                    warn!(option = %ck, "unrecognized image option; skipped");
                }
            }
        }
    }

    if let Some(slot) = size_slot {
        let size = match (&width, &height) {
            (Some(w), Some(h)) => format!("{w}x{h}px"),
            (Some(w), None) => format!("{w}px"),
            (None, Some(h)) => format!("x{h}px"),
            (None, None) => String::new(),
        };
        if size.is_empty() {
            options.remove(slot);
        } else {
            options[slot] = size;
        }
    }

    let mut text = format!("[[{resource}");
    for option in options {
        text.push('|');
        text.push_str(&option);
    }
    text.push_str("]]");
    state.emit(&text, node);
    Ok(())
}
