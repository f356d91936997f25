//! Attribute emission: wiki-attribute syntax with template provenance.

use super::SerializerState;
use crate::dom;
use crate::meta::ShadowInfo;
use markup5ever_rcdom::Handle;

fn is_ignored_attr(key: &str) -> bool {
    key == "about"
        || key == "typeof"
        || key.starts_with("data-parsoid")
        || key == "data-mw"
        || key == "data-ve-changed"
        || key == "ve-changed"
}

/// Serialize an element's attributes to wiki-attribute syntax.
///
/// Template-generated attributes are re-emitted from their recorded wiki
/// source; everything else goes through the shadow table so unsanitized
/// original values win over normalized live ones.
pub fn serialize_attributes(state: &SerializerState, node: &Handle) -> String {
    let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
    let expanded = typeof_attr
        .split_ascii_whitespace()
        .any(|m| m.starts_with("mw:ExpandedAttrs"));
    let about = dom::get_attr(node, "about");
    let tpl = about.as_ref().and_then(|a| state.tpl_attrs.get(a));

    let mut pieces: Vec<String> = Vec::new();
    for (key, value) in dom::attributes_of(node) {
        if is_ignored_attr(&key) {
            continue;
        }
        if expanded {
            if let Some(kv_src) = tpl.and_then(|t| t.kvs.get(&key)) {
                // The whole pair came from a template: one verbatim entry.
                pieces.push(kv_src.clone());
                continue;
            }
        }
        let key_text = tpl
            .and_then(|t| t.ks.get(&key))
            .cloned()
            .unwrap_or_else(|| key.clone());
        if let Some(value_src) = tpl.and_then(|t| t.vs.get(&key)) {
            pieces.push(format_attr(&key_text, value_src));
            continue;
        }
        if value.is_empty() {
            pieces.push(key_text);
            continue;
        }
        let shadow = attribute_shadow(state, node, &key, &value);
        let value_text = if shadow.from_src {
            shadow.value
        } else {
            escape_attr_value(&shadow.value)
        };
        pieces.push(format_attr(&key_text, &value_text));
    }

    // Reinstate attributes the HTML sanitizer stripped: recorded in the
    // original-attribute table but absent from the live element.
    if let Some(dp) = state.db.dp(node) {
        if let (Some(a), Some(sa)) = (&dp.a, &dp.sa) {
            let mut missing: Vec<&String> = a
                .keys()
                .filter(|key| !dom::has_attr(node, key) && !is_ignored_attr(key))
                .collect();
            missing.sort();
            for key in missing {
                if let Some(src) = sa.get(key) {
                    pieces.push(format_attr(key, src));
                }
            }
        }
    }

    pieces.join(" ")
}

fn format_attr(key: &str, value: &str) -> String {
    format!("{key}=\"{}\"", value.replace('"', "&quot;"))
}

/// HTML-entity-escape an attribute value that is not exact source text.
pub fn escape_attr_value(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Original, unsanitized value of an attribute when the parser recorded
/// one and the live value has not been edited since.
pub fn attribute_shadow(
    state: &SerializerState,
    node: &Handle,
    key: &str,
    live: &str,
) -> ShadowInfo {
    let dp = state.db.dp(node);
    let recorded = dp.and_then(|d| d.a.as_ref()).and_then(|a| a.get(key));
    let shadow = dp.and_then(|d| d.sa.as_ref()).and_then(|sa| sa.get(key));
    match recorded {
        Some(Some(original)) if original == live => match shadow {
            Some(src) => ShadowInfo {
                value: src.clone(),
                modified: false,
                from_src: true,
            },
            None => ShadowInfo {
                value: live.to_string(),
                modified: false,
                from_src: false,
            },
        },
        Some(_) => ShadowInfo {
            value: live.to_string(),
            modified: true,
            from_src: false,
        },
        None => ShadowInfo {
            value: live.to_string(),
            modified: false,
            from_src: false,
        },
    }
}
