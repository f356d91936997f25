//! Document ingestion and the pre-serialization passes.
//!
//! Three things happen before the serializer sees a tree:
//!
//! 1. `data-parsoid` / `data-mw` JSON attributes are lifted into the
//!    [`MetaDb`] side table and removed from the DOM.
//! 2. In edit mode, marker metas are stripped and per-element metadata is
//!    finalized (auto-inserted empties removed, internal markers discarded,
//!    redundant source dropped, fostered ranges collapsed).
//! 3. Template-generated attribute sources are collected from
//!    `mw:objectAttr*` metas into the `tplAttrs` map consulted by the
//!    attribute emitter.

use crate::dom::{self, MetaDb};
use crate::env::Env;
use crate::error::SerializeError;
use crate::meta::{self, DataMw, DataParsoid};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::HashMap;
use tracing::warn;

/// Original wiki source recorded for one template-generated attribute
/// group, keyed by attribute name.
#[derive(Debug, Clone, Default)]
pub struct TplAttrs {
    /// Full key-value pair sources.
    pub kvs: HashMap<String, String>,
    /// Key-only sources.
    pub ks: HashMap<String, String>,
    /// Value-only sources.
    pub vs: HashMap<String, String>,
}

/// A DOM plus its lifted metadata, ready for serialization.
pub struct PreparedDocument {
    pub dom: RcDom,
    pub body: Handle,
    pub meta: MetaDb,
    pub tpl_attrs: HashMap<String, TplAttrs>,
}

/// Parse annotated HTML and run the pre-serialization passes.
pub fn prepare_html(env: &Env, html: &str) -> Result<PreparedDocument, SerializeError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    prepare_dom(env, dom)
}

/// Run the pre-serialization passes over an already-parsed DOM.
pub fn prepare_dom(env: &Env, dom: RcDom) -> Result<PreparedDocument, SerializeError> {
    let body = dom::body_of(&dom)
        .ok_or_else(|| SerializeError::ParseError("document has no body".to_string()))?;

    let mut meta = MetaDb::new();
    lift_metadata(&body, &mut meta);
    if env.edit_mode {
        cleanup(&body, &mut meta);
    }
    let tpl_attrs = collect_template_attributes(&body);

    Ok(PreparedDocument {
        dom,
        body,
        meta,
        tpl_attrs,
    })
}

fn elements_in_order(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    collect_elements(root, &mut out);
    out
}

fn collect_elements(node: &Handle, out: &mut Vec<Handle>) {
    for child in dom::children_of(node) {
        if dom::is_element(&child) {
            out.push(child.clone());
        }
        collect_elements(&child, out);
    }
}

/// Move `data-parsoid` / `data-mw` JSON attributes into the side table.
fn lift_metadata(body: &Handle, meta: &mut MetaDb) {
    for element in elements_in_order(body) {
        if let Some(json) = take_attr(&element, "data-parsoid") {
            match DataParsoid::from_json(&json) {
                Ok(dp) => meta.set_dp(&element, dp),
                Err(err) => warn!(
                    node = %dom::node_name(&element),
                    %err,
                    "discarding unparseable data-parsoid"
                ),
            }
        }
        if let Some(json) = take_attr(&element, "data-mw") {
            match DataMw::from_json(&json) {
                Ok(mw) => meta.set_mw(&element, mw),
                Err(err) => warn!(
                    node = %dom::node_name(&element),
                    %err,
                    "discarding unparseable data-mw"
                ),
            }
        }
    }
}

fn take_attr(node: &Handle, attr: &str) -> Option<String> {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        if let Some(idx) = attrs.iter().position(|a| &*a.name.local == attr) {
            return Some(attrs.remove(idx).value.to_string());
        }
    }
    None
}

/// Edit-mode cleanup: marker-meta stripping plus metadata finalization.
///
/// Running this twice yields the same tree as running it once.
pub fn cleanup(body: &Handle, meta: &mut MetaDb) {
    strip_marker_metas(body);
    finalize_metadata(body, meta);
}

fn is_marker_meta_typeof(typeof_attr: &str) -> bool {
    typeof_attr.split_ascii_whitespace().any(|m| {
        m == "mw:StartTag"
            || m == "mw:EndTag"
            || m == "mw:Extension/ref/Marker"
            || m == "mw:TSRMarker"
            || m.starts_with("mw:TSRMarker/")
    })
}

fn strip_marker_metas(body: &Handle) {
    for element in elements_in_order(body) {
        if !dom::is_element_named(&element, "meta") {
            continue;
        }
        let Some(typeof_attr) = dom::get_attr(&element, "typeof") else {
            continue;
        };
        // The transclusion property dominates any marker also present.
        if meta::has_marker(&typeof_attr, meta::MW_TRANSCLUSION) {
            continue;
        }
        let strippable_marker =
            is_marker_meta_typeof(&typeof_attr) && !dom::has_attr(&element, "property");
        let stripped_tag = meta::has_marker(&typeof_attr, "mw:Placeholder/StrippedTag");
        if strippable_marker || stripped_tag {
            dom::detach(&element);
        }
    }
}

fn finalize_metadata(body: &Handle, meta_db: &mut MetaDb) {
    for element in elements_in_order(body) {
        let typeof_attr = dom::get_attr(&element, "typeof").unwrap_or_default();
        let expansion_root = meta::is_expansion_root(&typeof_attr);
        let has_mw = meta_db.mw(&element).is_some();

        let Some(dp) = meta_db.dp(&element) else {
            continue;
        };

        if dp.auto_inserted_start
            && dp.auto_inserted_end
            && element.children.borrow().is_empty()
        {
            dom::detach(&element);
            continue;
        }

        let dp = meta_db.dp_mut(&element);
        dp.tag_id = None;

        // The exact source of an expansion is reconstructable from data-mw
        // once the range is complete, so it need not be carried around.
        if expansion_root {
            let complete_dsr = dp
                .dsr
                .map(|d| d.is_valid() && d.open_width.is_some() && d.close_width.is_some())
                .unwrap_or(false);
            if (complete_dsr && has_mw) || dp.tsr.is_none() {
                dp.src = None;
            }
        }
        dp.tsr = None;

        if dp.fostered && !expansion_root {
            if let Some(dsr) = dp.dsr.as_mut() {
                dsr.collapse_to_end();
            }
        }
    }
}

/// Sweep for `mw:objectAttr*` metas and record template-generated
/// attribute sources under their `about` group. The metas themselves are
/// removed; their information lives on in the returned map.
pub fn collect_template_attributes(body: &Handle) -> HashMap<String, TplAttrs> {
    let mut tpl_attrs: HashMap<String, TplAttrs> = HashMap::new();
    for element in elements_in_order(body) {
        if !dom::is_element_named(&element, "meta") {
            continue;
        }
        let Some(property) = dom::get_attr(&element, "property") else {
            continue;
        };
        let (bucket, key) = if let Some(k) = property.strip_prefix("mw:objectAttrKey#") {
            (Bucket::Key, k)
        } else if let Some(k) = property.strip_prefix("mw:objectAttrVal#") {
            (Bucket::Value, k)
        } else if let Some(k) = property.strip_prefix("mw:objectAttr#") {
            (Bucket::Pair, k)
        } else {
            continue;
        };
        let Some(about) = dom::get_attr(&element, "about") else {
            warn!(property = %property, "objectAttr meta without about group");
            continue;
        };
        let src = dom::get_attr(&element, "content").unwrap_or_default();
        let entry = tpl_attrs.entry(about).or_default();
        match bucket {
            Bucket::Pair => entry.kvs.insert(key.to_string(), src),
            Bucket::Key => entry.ks.insert(key.to_string(), src),
            Bucket::Value => entry.vs.insert(key.to_string(), src),
        };
        dom::detach(&element);
    }
    tpl_attrs
}

enum Bucket {
    Pair,
    Key,
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Dsr;

    fn prepare(html: &str) -> PreparedDocument {
        prepare_html(&Env::default(), html).unwrap()
    }

    #[test]
    fn test_lift_data_parsoid() {
        let doc = prepare(r#"<p data-parsoid='{"dsr":[0,5,0,0]}'>hello</p>"#);
        let p = dom::first_non_sep_child(&doc.body).unwrap();
        assert_eq!(doc.meta.dp(&p).unwrap().dsr, Some(Dsr::new(0, 5, 0, 0)));
        assert!(!dom::has_attr(&p, "data-parsoid"));
    }

    #[test]
    fn test_bad_data_parsoid_is_discarded() {
        let doc = prepare(r#"<p data-parsoid='not json'>hello</p>"#);
        let p = dom::first_non_sep_child(&doc.body).unwrap();
        assert!(doc.meta.dp(&p).is_none());
    }

    #[test]
    fn test_marker_meta_stripping() {
        // Lead with content so the parser keeps the metas in the body.
        let doc = prepare(concat!(
            "<p>x</p>",
            r#"<meta typeof="mw:StartTag">"#,
            r#"<meta typeof="mw:Placeholder/StrippedTag">"#,
            r#"<meta typeof="mw:EndTag mw:Transclusion">"#
        ));
        let metas: Vec<_> = dom::children_of(&doc.body)
            .into_iter()
            .filter(|c| dom::is_element_named(c, "meta"))
            .collect();
        // Only the transclusion-bearing meta survives.
        assert_eq!(metas.len(), 1);
        assert!(meta::has_marker(
            &dom::get_attr(&metas[0], "typeof").unwrap(),
            meta::MW_TRANSCLUSION
        ));
    }

    #[test]
    fn test_auto_inserted_empty_removed() {
        let doc = prepare(concat!(
            r#"<b data-parsoid='{"autoInsertedStart":true,"autoInsertedEnd":true}'></b>"#,
            "<p>x</p>"
        ));
        assert!(dom::children_of(&doc.body)
            .iter()
            .all(|c| !dom::is_element_named(c, "b")));
    }

    #[test]
    fn test_fostered_dsr_collapsed() {
        let doc = prepare(r#"<p data-parsoid='{"dsr":[4,9,0,0],"fostered":true}'>x</p>"#);
        let p = dom::first_non_sep_child(&doc.body).unwrap();
        let dsr = doc.meta.dp(&p).unwrap().dsr.unwrap();
        assert_eq!(dsr.start, Some(9));
        assert_eq!(dsr.end, Some(9));
    }

    #[test]
    fn test_cleanup_idempotent() {
        let env = Env::default();
        let doc = prepare_html(
            &env,
            concat!(
                r#"<p data-parsoid='{"dsr":[0,1,0,0],"tagId":7}'>x</p>"#,
                r#"<meta typeof="mw:StartTag">"#
            ),
        )
        .unwrap();
        let mut meta = doc.meta;
        // Second run over the already-cleaned tree changes nothing.
        cleanup(&doc.body, &mut meta);
        let p = dom::first_non_sep_child(&doc.body).unwrap();
        assert_eq!(dom::element_name(&p), Some("p"));
        assert!(meta.dp(&p).unwrap().tag_id.is_none());
        assert_eq!(dom::children_of(&doc.body).len(), 1);
    }

    #[test]
    fn test_template_attr_collection() {
        let doc = prepare(concat!(
            "<p>x</p>",
            r##"<meta about="#mwt1" property="mw:objectAttr#class" content="class={{cls}}">"##,
            r##"<meta about="#mwt1" property="mw:objectAttrVal#id" content="{{id}}">"##
        ));
        let group = doc.tpl_attrs.get("#mwt1").unwrap();
        assert_eq!(group.kvs.get("class").unwrap(), "class={{cls}}");
        assert_eq!(group.vs.get("id").unwrap(), "{{id}}");
        // The metas themselves are gone.
        assert!(dom::children_of(&doc.body)
            .iter()
            .all(|c| !dom::is_element_named(c, "meta")));
    }
}
