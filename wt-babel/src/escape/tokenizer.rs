//! Lightweight wikitext scanner backing the escape oracle.
//!
//! Tokenizes a text fragment the way the wiki parser would, representing
//! every construct as a tag-shaped token (`wikilink`, `extlink`, `urllink`,
//! `listItem`, `heading`, `table`, quote runs, raw HTML tags, comments).
//! Runs synchronously and accumulates all tokens before returning; the
//! oracle's decision depends on seeing the complete stream.
//!
//! Position 0 counts as start-of-line; callers suppress SOL-only tokens by
//! prefixing the probe text with a junk character.

use wt_config::SiteConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    StartTag,
    EndTag,
    SelfClosingTag,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub name: String,
    /// The matched source text, kept for attribute-sensitive checks.
    pub src: String,
}

impl Token {
    fn new(kind: TokenKind, name: &str, src: &str) -> Self {
        Token {
            kind,
            name: name.to_string(),
            src: src.to_string(),
        }
    }
}

/// HTML tags the wiki parser treats as markup. Tags outside this set render
/// as literal text and are not significant for escaping.
pub const ALLOWED_HTML_TAGS: &[&str] = &[
    "abbr", "b", "bdi", "big", "blockquote", "br", "caption", "center", "cite", "code",
    "dd", "del", "dfn", "div", "dl", "dt", "em", "font", "gallery", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr", "i", "includeonly", "ins", "kbd", "li", "noinclude", "nowiki", "ol",
    "onlyinclude", "p", "pre", "rb", "ref", "references", "rp", "rt", "ruby", "s", "samp",
    "small", "span", "strike", "strong", "sub", "sup", "table", "td", "th", "tr", "tt",
    "u", "ul", "var", "wbr",
];

pub fn is_allowed_html_tag(name: &str) -> bool {
    ALLOWED_HTML_TAGS.contains(&name)
}

/// Tokenize a fragment. The returned stream contains only tokens that
/// could matter for escaping; plain text is skipped.
pub fn tokenize(site: &SiteConfig, text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut sol = true;

    while pos < text.len() {
        let rest = &text[pos..];

        if rest.starts_with('\n') {
            sol = true;
            pos += 1;
            continue;
        }

        if sol {
            if let Some(len) = match_heading_line(rest) {
                tokens.push(Token::new(TokenKind::StartTag, "heading", &rest[..len]));
                pos += len;
                sol = false;
                continue;
            }
            if rest.starts_with(['*', '#', ':', ';']) {
                let len = rest
                    .find(|c| !matches!(c, '*' | '#' | ':' | ';'))
                    .unwrap_or(rest.len());
                tokens.push(Token::new(TokenKind::StartTag, "listItem", &rest[..len]));
                pos += len;
                sol = false;
                continue;
            }
            if rest.starts_with("----") {
                let len = rest.find(|c| c != '-').unwrap_or(rest.len());
                tokens.push(Token::new(TokenKind::SelfClosingTag, "hr", &rest[..len]));
                pos += len;
                sol = false;
                continue;
            }
            if rest.starts_with("{|") {
                tokens.push(Token::new(TokenKind::StartTag, "table", "{|"));
                pos += 2;
                sol = false;
                continue;
            }
        }

        if rest.starts_with("<!--") {
            let len = match rest[4..].find("-->") {
                Some(end) => 4 + end + 3,
                None => rest.len(),
            };
            tokens.push(Token::new(TokenKind::Comment, "comment", &rest[..len]));
            pos += len;
            sol = false;
            continue;
        }

        if rest.starts_with('<') {
            if let Some((token, len)) = match_html_tag(rest) {
                tokens.push(token);
                pos += len;
                sol = false;
                continue;
            }
        }

        if rest.starts_with("[[") {
            if let Some(end) = rest.find("]]") {
                tokens.push(Token::new(
                    TokenKind::SelfClosingTag,
                    "wikilink",
                    &rest[..end + 2],
                ));
                pos += end + 2;
                sol = false;
                continue;
            }
        }

        if rest.starts_with('[') && site.starts_with_url_protocol(&rest[1..]) {
            if let Some(end) = rest.find(']') {
                tokens.push(Token::new(
                    TokenKind::SelfClosingTag,
                    "extlink",
                    &rest[..end + 1],
                ));
                pos += end + 1;
                sol = false;
                continue;
            }
        }

        if rest.starts_with("{{") {
            if let Some(end) = rest.find("}}") {
                tokens.push(Token::new(
                    TokenKind::SelfClosingTag,
                    "template",
                    &rest[..end + 2],
                ));
                pos += end + 2;
                sol = false;
                continue;
            }
        }

        if rest.starts_with("''") {
            let len = rest.find(|c| c != '\'').unwrap_or(rest.len());
            tokens.push(Token::new(TokenKind::SelfClosingTag, "mw-quote", &rest[..len]));
            pos += len;
            sol = false;
            continue;
        }

        if at_word_boundary(text, pos) {
            if let Some(len) = match_magic_link(rest) {
                tokens.push(Token::new(
                    TokenKind::SelfClosingTag,
                    "magiclink",
                    &rest[..len],
                ));
                pos += len;
                sol = false;
                continue;
            }
        }

        if at_word_boundary(text, pos) && site.starts_with_url_protocol(rest) {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == ']' || c == '<' || c == '>')
                .unwrap_or(rest.len());
            tokens.push(Token::new(TokenKind::SelfClosingTag, "urllink", &rest[..len]));
            pos += len;
            sol = false;
            continue;
        }

        let ch = rest.chars().next().expect("non-empty rest");
        pos += ch.len_utf8();
        sol = false;
    }

    tokens
}

fn at_word_boundary(text: &str, pos: usize) -> bool {
    if pos == 0 {
        return true;
    }
    text[..pos]
        .chars()
        .next_back()
        .map(|c| !c.is_alphanumeric())
        .unwrap_or(true)
}

/// `RFC n`, `PMID n`, and `ISBN x` auto-link without any bracket syntax.
/// Returns the consumed length when `rest` starts with one.
fn match_magic_link(rest: &str) -> Option<usize> {
    let keyword = ["RFC", "PMID", "ISBN"]
        .iter()
        .find(|k| rest.starts_with(**k))?;
    let after = &rest[keyword.len()..];
    let spaces = after.len() - after.trim_start_matches(' ').len();
    if spaces == 0 {
        return None;
    }
    let body = &after[spaces..];
    let body_len = if *keyword == "ISBN" {
        body.find(|c: char| !(c.is_ascii_digit() || c == 'X' || c == 'x' || c == '-'))
            .unwrap_or(body.len())
    } else {
        body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len())
    };
    if body_len == 0 {
        return None;
    }
    Some(keyword.len() + spaces + body_len)
}

/// A heading candidate: the line starts with `=` and, ignoring trailing
/// whitespace, ends with `=` too. Returns the consumed length.
fn match_heading_line(rest: &str) -> Option<usize> {
    if !rest.starts_with('=') {
        return None;
    }
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let line = rest[..line_end].trim_end();
    if line.len() >= 2 && line.ends_with('=') {
        Some(line_end)
    } else {
        None
    }
}

/// Match `<name ...>`, `</name ...>`, or `<name ... />` at the head of
/// `rest`. Returns the token and consumed length.
fn match_html_tag(rest: &str) -> Option<(Token, usize)> {
    let bytes = rest.as_bytes();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric()) {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = rest[name_start..i].to_ascii_lowercase();
    let close = rest[i..].find('>')?;
    let end = i + close + 1;
    let self_closing = rest[..end - 1].ends_with('/');
    let kind = if closing {
        TokenKind::EndTag
    } else if self_closing {
        TokenKind::SelfClosingTag
    } else {
        TokenKind::StartTag
    };
    Some((Token::new(kind, &name, &rest[..end]), end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wt_config::SiteConfig;

    fn scan(text: &str) -> Vec<Token> {
        tokenize(&SiteConfig::default(), text)
    }

    fn names(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_plain_text() {
        assert!(scan("just some words").is_empty());
        assert!(scan("a | b - c").is_empty());
    }

    #[test]
    fn test_sol_constructs() {
        assert_eq!(names(&scan("* item")), vec!["listItem"]);
        assert_eq!(names(&scan("=h=")), vec!["heading"]);
        assert_eq!(names(&scan("----")), vec!["hr"]);
        assert_eq!(names(&scan("{| class=x")), vec!["table"]);
        // A junk prefix suppresses SOL-only tokens.
        assert!(scan("_* item").is_empty());
        // But a newline re-enables them.
        assert_eq!(names(&scan("_x\n* item")), vec!["listItem"]);
    }

    #[test]
    fn test_heading_requires_closing_eq() {
        assert!(scan("=just text").is_empty());
        assert_eq!(names(&scan("==x== ")), vec!["heading"]);
    }

    #[test]
    fn test_links() {
        assert_eq!(names(&scan("_see [[Foo|bar]] end")), vec!["wikilink"]);
        assert_eq!(names(&scan("_[https://x.org y]")), vec!["extlink"]);
        assert_eq!(names(&scan("_go to https://x.org now")), vec!["urllink"]);
        // Unclosed link brackets are literal text.
        assert!(scan("_a [[b").is_empty());
    }

    #[test]
    fn test_html_tags() {
        let tokens = scan("_a <b>x</b> <br/>");
        assert_eq!(names(&tokens), vec!["b", "b", "br"]);
        assert_eq!(tokens[0].kind, TokenKind::StartTag);
        assert_eq!(tokens[1].kind, TokenKind::EndTag);
        assert_eq!(tokens[2].kind, TokenKind::SelfClosingTag);
        // `<` without a tag name is literal.
        assert!(scan("_a < b").is_empty());
    }

    #[test]
    fn test_entity_span_src_kept() {
        let tokens = scan(r#"_<span typeof="mw:Entity">&</span>"#);
        assert!(tokens[0].src.contains("mw:Entity"));
    }

    #[test]
    fn test_quotes_and_templates() {
        assert_eq!(names(&scan("_a ''b''")), vec!["mw-quote", "mw-quote"]);
        assert_eq!(names(&scan("_{{tpl|x}}")), vec!["template"]);
    }

    #[test]
    fn test_magic_links() {
        assert_eq!(names(&scan("_see RFC 2324 now")), vec!["magiclink"]);
        assert_eq!(names(&scan("_ISBN 0-306-40615-2")), vec!["magiclink"]);
        assert!(scan("_an RFCish word").is_empty());
        assert!(scan("_RFC alone").is_empty());
    }

    #[test]
    fn test_comment() {
        let tokens = scan("_a <!-- note --> b");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
    }
}
