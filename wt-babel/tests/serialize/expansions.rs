//! Template and extension expansions, placeholders, and meta markers.

use crate::common::serialize;

#[test]
fn test_template_reconstruction() {
    let html = concat!(
        "<p>",
        r##"<span about="#mwt1" typeof="mw:Transclusion" "##,
        r#"data-mw='{"parts":[{"template":{"target":{"wt":"tpl"},"params":{"a":{"wt":"1"}}}}]}'>"#,
        "rendered</span></p>"
    );
    assert_eq!(serialize(html), "{{tpl|a=1}}");
}

#[test]
fn test_template_positional_params() {
    let html = concat!(
        r##"<span about="#mwt1" typeof="mw:Transclusion" "##,
        r#"data-mw='{"parts":[{"template":{"target":{"wt":"t"},"params":{"1":{"wt":"x"},"2":{"wt":"y"}}}}]}'>"#,
        "rendered</span>"
    );
    assert_eq!(serialize(html), "{{t|x|y}}");
}

#[test]
fn test_template_mixed_params_keep_order() {
    let html = concat!(
        r##"<span about="#mwt1" typeof="mw:Transclusion" "##,
        r#"data-mw='{"parts":[{"template":{"target":{"wt":"t"},"params":{"1":{"wt":"x"},"name":{"wt":"v"}}}}]}'>"#,
        "rendered</span>"
    );
    assert_eq!(serialize(html), "{{t|x|name=v}}");
}

#[test]
fn test_template_literal_parts() {
    let html = concat!(
        r##"<span about="#mwt1" typeof="mw:Transclusion" "##,
        r#"data-mw='{"parts":["foo ",{"template":{"target":{"wt":"t"}}}]}'>"#,
        "rendered</span>"
    );
    assert_eq!(serialize(html), "foo {{t}}");
}

#[test]
fn test_expansion_siblings_are_suppressed() {
    let html = concat!(
        r##"<span about="#mwt1" typeof="mw:Transclusion" "##,
        r#"data-mw='{"parts":[{"template":{"target":{"wt":"t"}}}]}'>a</span>"#,
        r##"<span about="#mwt1">more rendered output</span>"##
    );
    assert_eq!(serialize(html), "{{t}}");
}

#[test]
fn test_extension_emits_recorded_source() {
    let html = concat!(
        r##"<p about="#mwt2" typeof="mw:Extension/poem" "##,
        r#"data-parsoid='{"src":"&lt;poem&gt;x&lt;/poem&gt;","tsr":[0,14]}'>x</p>"#
    );
    assert_eq!(serialize(html), "<poem>x</poem>");
}

#[test]
fn test_placeholder_source() {
    assert_eq!(
        serialize(r#"<span typeof="mw:Placeholder" data-parsoid='{"src":"__MYSTERY__","tsr":[0,11]}'>?</span>"#),
        "__MYSTERY__"
    );
}

#[test]
fn test_newline_placeholder_folds_into_separator() {
    let html = concat!(
        "<p>a</p>",
        r#"<span typeof="mw:Placeholder" data-parsoid='{"src":"\n\n\n","tsr":[1,4]}'></span>"#,
        "<p>b</p>"
    );
    // The placeholder newlines merge with the paragraph separator and the
    // paragraph constraints cap them.
    assert_eq!(serialize(html), "a\n\nb");
}

#[test]
fn test_page_prop_word() {
    assert_eq!(
        serialize(r#"<p>x</p><meta property="mw:PageProp/notoc">"#),
        "x__NOTOC__"
    );
}

#[test]
fn test_default_sort_interpolation() {
    assert_eq!(
        serialize(r#"<p>x</p><meta property="mw:PageProp/categorydefaultsort" content="Key">"#),
        "x{{DEFAULTSORT:Key}}"
    );
}

#[test]
fn test_includes_markers() {
    assert_eq!(
        serialize(concat!(
            "<p>x</p>",
            r#"<meta typeof="mw:Includes/NoInclude">"#,
            r#"<meta typeof="mw:Includes/NoInclude/End">"#
        )),
        "x<noinclude></noinclude>"
    );
}
