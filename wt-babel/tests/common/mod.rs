//! Shared harness for serializer integration tests.

use wt_babel::{html_to_wikitext, Env};

/// Parse annotated HTML and serialize it with the default environment.
pub fn serialize(html: &str) -> String {
    html_to_wikitext(&Env::default(), html).expect("serialization should succeed")
}

/// Same, with the original page source available for separator reuse.
#[allow(dead_code)]
pub fn serialize_with_src(src: &str, html: &str) -> String {
    let env = Env::default().with_page_src(src);
    html_to_wikitext(&env, html).expect("serialization should succeed")
}

#[test]
fn test_harness_smoke() {
    assert_eq!(serialize("<p>hello</p>"), "hello");
}

#[test]
fn test_sink_matches_buffered_output() {
    let env = Env::default();
    let doc = wt_babel::prepare_html(&env, "<p>foo</p><p>bar</p>").unwrap();
    let serializer = wt_babel::WikitextSerializer::new(&env);
    let buffered = serializer.serialize(&doc).unwrap();
    let mut chunks = String::new();
    serializer
        .serialize_with_sink(&doc, &mut |chunk| chunks.push_str(chunk))
        .unwrap();
    assert_eq!(buffered, chunks);
    assert_eq!(buffered, "foo\n\nbar");
}
