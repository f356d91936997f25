//! End-to-end escaping: text that would re-tokenize as markup gets a
//! nowiki wrapper.

use crate::common::serialize;

#[test]
fn test_plain_text_is_untouched() {
    assert_eq!(serialize("<p>just words, nothing else.</p>"), "just words, nothing else.");
}

#[test]
fn test_list_marker_at_start_of_line() {
    assert_eq!(
        serialize("<p>* not a list</p>"),
        "<nowiki>* not a list</nowiki>"
    );
}

#[test]
fn test_sol_state_survives_the_separator() {
    // The second paragraph starts a fresh line only after the blank-line
    // separator is accounted for.
    assert_eq!(
        serialize("<p>x</p><p>* y</p>"),
        "x\n\n<nowiki>* y</nowiki>"
    );
}

#[test]
fn test_signature_tildes() {
    assert_eq!(serialize("<p>sig ~~~~</p>"), "<nowiki>sig ~~~~</nowiki>");
}

#[test]
fn test_template_braces() {
    assert_eq!(serialize("<p>a {{b}} c</p>"), "<nowiki>a {{b}} c</nowiki>");
}

#[test]
fn test_link_brackets() {
    assert_eq!(serialize("<p>see [[Foo]]</p>"), "<nowiki>see [[Foo]]</nowiki>");
}

#[test]
fn test_heading_lookalike() {
    assert_eq!(serialize("<h2>=x=</h2>"), "==<nowiki>=x=</nowiki>==");
}

#[test]
fn test_bullet_inside_list_item() {
    assert_eq!(
        serialize("<ul><li>*x</li></ul>"),
        "*<nowiki>*x</nowiki>"
    );
}

#[test]
fn test_quotes_in_bold() {
    assert_eq!(
        serialize("<b>a''b</b>"),
        "'''<nowiki>a''b</nowiki>'''"
    );
}

#[test]
fn test_adjacent_quotes_get_a_spacer() {
    assert_eq!(serialize("<b>a</b><i>b</i>"), "'''a'''<nowiki/>''b''");
}

#[test]
fn test_nowiki_span() {
    assert_eq!(
        serialize(r#"<span typeof="mw:Nowiki">''x''</span>"#),
        "<nowiki>''x''</nowiki>"
    );
}

#[test]
fn test_entity_round_trip() {
    assert_eq!(
        serialize(
            r#"<span typeof="mw:Entity" data-parsoid='{"src":"&amp;amp;","srcContent":"&amp;"}'>&amp;</span>"#
        ),
        "&amp;"
    );
}

#[test]
fn test_entity_with_changed_content_emits_literal() {
    assert_eq!(
        serialize(
            r#"<span typeof="mw:Entity" data-parsoid='{"src":"&amp;amp;","srcContent":"&amp;"}'>changed</span>"#
        ),
        "changed"
    );
}

#[test]
fn test_leading_space_would_open_indent_pre() {
    assert_eq!(
        serialize("<p> indented</p>"),
        "<nowiki> indented</nowiki>"
    );
}
