//! Paragraphs, headings, breaks, rules, and preformatted blocks.

use crate::common::serialize;

#[test]
fn test_single_paragraph() {
    assert_eq!(serialize("<p>hello</p>"), "hello");
}

#[test]
fn test_paragraphs_get_a_blank_line() {
    assert_eq!(serialize("<p>foo</p><p>bar</p>"), "foo\n\nbar");
}

#[test]
fn test_paragraphs_with_source_whitespace() {
    // The whitespace text node between the blocks is separator material
    // and gets padded up to the required blank line.
    assert_eq!(serialize("<p>foo</p>\n<p>bar</p>"), "foo\n\nbar");
}

#[test]
fn test_heading() {
    assert_eq!(serialize("<h2>Title</h2>"), "==Title==");
    assert_eq!(serialize("<h4>Deep</h4>"), "====Deep====");
}

#[test]
fn test_empty_heading_keeps_its_shape() {
    assert_eq!(serialize("<h1></h1>"), "=<nowiki/>=");
}

#[test]
fn test_heading_then_paragraph() {
    assert_eq!(serialize("<h2>x</h2><p>y</p>"), "==x==\ny");
}

#[test]
fn test_text_then_paragraph() {
    assert_eq!(serialize("intro<p>body</p>"), "intro\n\nbody");
}

#[test]
fn test_br_inside_paragraph_becomes_blank_line() {
    assert_eq!(serialize("<p>a<br>b</p>"), "a\n\nb");
}

#[test]
fn test_br_outside_paragraph_stays_a_tag() {
    assert_eq!(
        serialize(r#"<div data-parsoid='{"stx":"html"}'>a<br>b</div>"#),
        "<div>a<br>b</div>"
    );
}

#[test]
fn test_horizontal_rule() {
    assert_eq!(serialize("<hr><p>x</p>"), "----\nx");
}

#[test]
fn test_horizontal_rule_extra_dashes() {
    assert_eq!(
        serialize(r#"<hr data-parsoid='{"extra_dashes":2}'>"#),
        "------"
    );
}

#[test]
fn test_indent_pre() {
    assert_eq!(serialize("<pre>code here</pre>"), " code here");
    assert_eq!(serialize("<pre>a\nb</pre>"), " a\n b");
}

#[test]
fn test_html_pre() {
    assert_eq!(
        serialize(r#"<pre data-parsoid='{"stx":"html"}'>x</pre>"#),
        "<pre>x</pre>"
    );
}

#[test]
fn test_html_pre_escapes_nested_close() {
    assert_eq!(
        serialize(r#"<pre data-parsoid='{"stx":"html"}'>a&lt;/pre&gt;b</pre>"#),
        "<pre>a&lt;/pre>b</pre>"
    );
}

#[test]
fn test_html_pre_stripped_newline() {
    assert_eq!(
        serialize(r#"<pre data-parsoid='{"stx":"html","strippedNL":true}'>x</pre>"#),
        "<pre>\nx</pre>"
    );
}

#[test]
fn test_comment_between_blocks() {
    assert_eq!(
        serialize("<p>a</p><!--note--><p>b</p>"),
        "a<!--note-->\n\nb"
    );
}

#[test]
fn test_comment_separator_run_preserved() {
    // Whitespace and comment nodes between blocks round-trip as one
    // separator; the comment-only line does not count as a blank line.
    assert_eq!(
        serialize("<p>a</p>\n\n<!-- keep -->\n<p>b</p>"),
        "a\n\n<!-- keep -->\nb"
    );
}

#[test]
fn test_generic_html_element() {
    assert_eq!(
        serialize(r#"<div data-parsoid='{"stx":"html"}'><p data-parsoid='{"stx":"html"}'>x</p></div>"#),
        "<div><p>x</p></div>"
    );
}

#[test]
fn test_auto_inserted_end_suppresses_close() {
    assert_eq!(
        serialize(r#"<small data-parsoid='{"stx":"html","autoInsertedEnd":true}'>x</small>"#),
        "<small>x"
    );
}
