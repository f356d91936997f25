//! Wikilinks, external links, magic links, and images.

use crate::common::serialize;

#[test]
fn test_simple_wikilink() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink" href="./Foo">Foo</a>"#),
        "[[Foo]]"
    );
}

#[test]
fn test_wikilink_case_normalization() {
    // Content differing only in first-letter case still counts as simple,
    // and the display casing wins.
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink" href="./Foo">foo</a>"#),
        "[[foo]]"
    );
}

#[test]
fn test_wikilink_tail() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink" href="./Foo" data-parsoid='{"tail":"s"}'>Foos</a>"#),
        "[[Foo]]s"
    );
}

#[test]
fn test_piped_wikilink() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink" href="./Foo">bar</a>"#),
        "[[Foo|bar]]"
    );
}

#[test]
fn test_piped_content_is_escaped() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink" href="./Foo">a]]b</a>"#),
        "[[Foo|<nowiki>a]]b</nowiki>]]"
    );
}

#[test]
fn test_empty_category_link() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink/Category" href="./Category:Foo"></a>"#),
        "[[Category:Foo]]"
    );
}

#[test]
fn test_category_sort_key() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink/Category" href="./Category:Foo#key"></a>"#),
        "[[Category:Foo|key]]"
    );
}

#[test]
fn test_empty_non_category_link_blocks_pipe_trick() {
    assert_eq!(
        serialize(r#"<a rel="mw:WikiLink" href="./T"></a>"#),
        "[[T|<nowiki/>]]"
    );
}

#[test]
fn test_pipetrick_preserved() {
    assert_eq!(
        serialize(
            r#"<a rel="mw:WikiLink" href="./Foo (bar)" data-parsoid='{"pipetrick":true}'>Foo</a>"#
        ),
        "[[Foo (bar)|]]"
    );
}

#[test]
fn test_bracketed_external_link() {
    assert_eq!(
        serialize(r#"<a rel="mw:ExtLink" href="https://x.org">docs</a>"#),
        "[https://x.org docs]"
    );
}

#[test]
fn test_numbered_external_link() {
    assert_eq!(
        serialize(r#"<a rel="mw:ExtLink/Numbered" href="https://x.org"></a>"#),
        "[https://x.org]"
    );
}

#[test]
fn test_bare_url_link() {
    assert_eq!(
        serialize(r#"<a rel="mw:ExtLink/URL" href="https://x.org">https://x.org</a>"#),
        "https://x.org"
    );
}

#[test]
fn test_magic_link() {
    assert_eq!(
        serialize(r#"<a rel="mw:ExtLink/RFC" href="//tools.ietf.org/html/rfc2324">RFC 2324</a>"#),
        "RFC 2324"
    );
}

#[test]
fn test_figure_with_caption() {
    let html = concat!(
        r#"<figure data-parsoid='{"optionList":[{"ck":"thumbnail","ak":"thumb"},{"ck":"caption","ak":""}]}'>"#,
        r#"<img resource="./File:X.jpg">"#,
        "<figcaption>cap</figcaption></figure>"
    );
    assert_eq!(serialize(html), "[[File:X.jpg|thumb|cap]]");
}

#[test]
fn test_inline_image_span() {
    assert_eq!(
        serialize(r#"<span typeof="mw:Image"><img resource="./File:Y.png"></span>"#),
        "[[File:Y.png]]"
    );
}

#[test]
fn test_image_dimensions_join() {
    let html = concat!(
        r#"<span typeof="mw:Image" data-parsoid='{"optionList":[{"ck":"width","ak":"100"},{"ck":"height","ak":"50"}]}'>"#,
        r#"<img resource="./File:X.jpg"></span>"#
    );
    assert_eq!(serialize(html), "[[File:X.jpg|100x50px]]");
}

#[test]
fn test_unknown_image_option_is_skipped() {
    let html = concat!(
        r#"<span typeof="mw:Image" data-parsoid='{"optionList":[{"ck":"sideways","ak":""},{"ck":"thumbnail","ak":"thumb"}]}'>"#,
        r#"<img resource="./File:X.jpg"></span>"#
    );
    assert_eq!(serialize(html), "[[File:X.jpg|thumb]]");
}
