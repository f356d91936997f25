//! Lists and definition lists.

use crate::common::serialize;

#[test]
fn test_simple_list() {
    assert_eq!(serialize("<ul><li>a</li><li>b</li></ul>"), "*a\n*b");
}

#[test]
fn test_ordered_list() {
    assert_eq!(serialize("<ol><li>a</li><li>b</li></ol>"), "#a\n#b");
}

#[test]
fn test_nested_list() {
    assert_eq!(
        serialize("<ul><li>a</li><li>b<ul><li>c</li></ul></li></ul>"),
        "*a\n*b\n**c"
    );
}

#[test]
fn test_mixed_nesting() {
    assert_eq!(
        serialize("<ul><li>a<ol><li>n</li></ol></li></ul>"),
        "*a\n*#n"
    );
}

#[test]
fn test_item_with_only_a_sublist() {
    // The item defers its bullets to the nested list's items.
    assert_eq!(serialize("<ul><li><ul><li>x</li></ul></li></ul>"), "**x");
}

#[test]
fn test_definition_list() {
    assert_eq!(serialize("<dl><dt>t</dt><dd>d</dd></dl>"), ";t\n:d");
}

#[test]
fn test_single_line_definition() {
    assert_eq!(
        serialize(r#"<dl><dt>t</dt><dd data-parsoid='{"stx":"row"}'>d</dd></dl>"#),
        ";t:d"
    );
}

#[test]
fn test_definition_nested_in_dd() {
    assert_eq!(
        serialize("<dl><dd><ul><li>x</li></ul></dd></dl>"),
        ":*x"
    );
}

#[test]
fn test_adjacent_lists_of_same_kind() {
    // Exactly two newlines; anything tighter would merge the lists.
    assert_eq!(
        serialize("<ul><li>a</li></ul><ul><li>b</li></ul>"),
        "*a\n\n*b"
    );
}

#[test]
fn test_list_then_paragraph() {
    assert_eq!(serialize("<ul><li>a</li></ul><p>x</p>"), "*a\nx");
}

#[test]
fn test_paragraph_wrapped_item_content() {
    // A paragraph as first content of an item stays on the bullet line.
    assert_eq!(serialize("<ul><li><p>a</p></li></ul>"), "*a");
}
