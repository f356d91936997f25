//! Selective serialization: verbatim reuse of the original source.

use wt_babel::dom;
use wt_babel::meta::DiffMark;
use wt_babel::{prepare_html, Env, WikitextSerializer};

fn body_children(doc: &wt_babel::PreparedDocument) -> Vec<markup5ever_rcdom::Handle> {
    dom::children_of(&doc.body)
        .into_iter()
        .filter(dom::is_element)
        .collect()
}

#[test]
fn test_unmodified_document_is_byte_stable() {
    let src = "*a\n*b";
    let env = Env::default().with_page_src(src);
    let html = concat!(
        r#"<ul data-parsoid='{"dsr":[0,5,0,0]}'>"#,
        r#"<li data-parsoid='{"dsr":[0,2,1,0]}'>a</li>"#,
        r#"<li data-parsoid='{"dsr":[3,5,1,0]}'>b</li>"#,
        "</ul>"
    );
    let doc = prepare_html(&env, html).unwrap();
    let out = WikitextSerializer::new(&env).serialize_selser(&doc).unwrap();
    assert_eq!(out, src);
}

#[test]
fn test_modified_node_goes_through_handlers() {
    let src = "a\n\nb";
    let env = Env::default().with_page_src(src);
    let html = concat!(
        r#"<p data-parsoid='{"dsr":[0,1,0,0]}'>a</p>"#,
        r#"<p data-parsoid='{"dsr":[3,4,0,0]}'>X</p>"#
    );
    let mut doc = prepare_html(&env, html).unwrap();
    let children = body_children(&doc);
    doc.meta.mark(&children[1], DiffMark::Modified);
    let out = WikitextSerializer::new(&env).serialize_selser(&doc).unwrap();
    assert_eq!(out, "a\n\nX");
}

#[test]
fn test_inserted_node_between_unmodified_neighbours() {
    let src = "a\n\nb";
    let env = Env::default().with_page_src(src);
    let html = concat!(
        r#"<p data-parsoid='{"dsr":[0,1,0,0]}'>a</p>"#,
        "<p>new</p>",
        r#"<p data-parsoid='{"dsr":[3,4,0,0]}'>b</p>"#
    );
    let mut doc = prepare_html(&env, html).unwrap();
    let children = body_children(&doc);
    doc.meta.mark(&children[1], DiffMark::Inserted);
    let out = WikitextSerializer::new(&env).serialize_selser(&doc).unwrap();
    assert_eq!(out, "a\n\nnew\n\nb");
}

#[test]
fn test_modified_descendant_disables_subtree_reuse() {
    let src = "*a\n*b";
    let env = Env::default().with_page_src(src);
    let html = concat!(
        r#"<ul data-parsoid='{"dsr":[0,5,0,0]}'>"#,
        r#"<li data-parsoid='{"dsr":[0,2,1,0]}'>a</li>"#,
        r#"<li data-parsoid='{"dsr":[3,5,1,0]}'>edited</li>"#,
        "</ul>"
    );
    let mut doc = prepare_html(&env, html).unwrap();
    let ul = body_children(&doc).remove(0);
    let items: Vec<_> = dom::children_of(&ul)
        .into_iter()
        .filter(dom::is_element)
        .collect();
    doc.meta.mark(&items[1], DiffMark::Modified);
    let out = WikitextSerializer::new(&env).serialize_selser(&doc).unwrap();
    // The first item still comes from source; the second is re-emitted.
    assert_eq!(out, "*a\n*edited");
}

#[test]
fn test_selser_requires_page_source() {
    let env = Env::default();
    let doc = prepare_html(&env, "<p>a</p>").unwrap();
    assert!(WikitextSerializer::new(&env).serialize_selser(&doc).is_err());
}

#[test]
fn test_selser_preserves_comment_separators() {
    let src = "a\n\n<!-- keep -->\nb";
    let env = Env::default().with_page_src(src);
    let html = concat!(
        r#"<p data-parsoid='{"dsr":[0,1,0,0]}'>a</p>"#,
        "\n\n<!-- keep -->\n",
        r#"<p data-parsoid='{"dsr":[17,18,0,0]}'>b</p>"#
    );
    let doc = prepare_html(&env, html).unwrap();
    let out = WikitextSerializer::new(&env).serialize_selser(&doc).unwrap();
    assert_eq!(out, src);
}
