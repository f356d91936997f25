//! Table serialization.

use crate::common::serialize;

#[test]
fn test_minimal_table() {
    assert_eq!(
        serialize("<table><tbody><tr><td>a</td></tr></tbody></table>"),
        "{|\n|a\n|}"
    );
}

#[test]
fn test_cells_on_separate_lines() {
    assert_eq!(
        serialize("<table><tbody><tr><td>a</td><td>b</td></tr></tbody></table>"),
        "{|\n|a\n|b\n|}"
    );
}

#[test]
fn test_row_syntax_cells_stay_inline() {
    assert_eq!(
        serialize(concat!(
            "<table><tbody><tr><td>a</td>",
            r#"<td data-parsoid='{"stx_v":"row"}'>b</td>"#,
            "</tr></tbody></table>"
        )),
        "{|\n|a||b\n|}"
    );
}

#[test]
fn test_second_row_gets_a_marker() {
    assert_eq!(
        serialize("<table><tbody><tr><td>a</td></tr><tr><td>b</td></tr></tbody></table>"),
        "{|\n|a\n|-\n|b\n|}"
    );
}

#[test]
fn test_header_cell() {
    assert_eq!(
        serialize("<table><tbody><tr><th>h</th></tr></tbody></table>"),
        "{|\n!h\n|}"
    );
}

#[test]
fn test_caption() {
    assert_eq!(
        serialize("<table><caption>c</caption><tbody><tr><td>a</td></tr></tbody></table>"),
        "{|\n|+c\n|a\n|}"
    );
}

#[test]
fn test_table_attributes() {
    assert_eq!(
        serialize(r#"<table class="wikitable"><tbody><tr><td>a</td></tr></tbody></table>"#),
        "{| class=\"wikitable\"\n|a\n|}"
    );
}

#[test]
fn test_cell_attributes() {
    assert_eq!(
        serialize(r#"<table><tbody><tr><td align="right">x</td></tr></tbody></table>"#),
        "{|\n|align=\"right\"|x\n|}"
    );
}

#[test]
fn test_pipe_in_cell_content_is_escaped() {
    assert_eq!(
        serialize("<table><tbody><tr><td>a|b</td></tr></tbody></table>"),
        "{|\n|<nowiki>a|b</nowiki>\n|}"
    );
}

#[test]
fn test_table_after_paragraph() {
    assert_eq!(
        serialize("<p>x</p><table><tbody><tr><td>a</td></tr></tbody></table>"),
        "x\n{|\n|a\n|}"
    );
}
