//! The escape oracle: decides whether a text fragment must be wrapped in
//! `<nowiki>` so that it round-trips as plain text instead of being
//! re-tokenized as markup.
//!
//! The decision is a sequence of ordered short-circuits: cheap character
//! scans accept the overwhelmingly common harmless case, context predicates
//! catch construct-local hazards, and only the remaining fragments are run
//! through the wikitext scanner.

pub mod tokenizer;

use once_cell::sync::Lazy;
use regex::Regex;
use self::tokenizer::{is_allowed_html_tag, tokenize, TokenKind};
use wt_config::SiteConfig;

use crate::dom::is_void_element;

/// Escape-relevant construct the serializer is currently inside. Pushed by
/// handlers around child serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeContext {
    Heading,
    ListItem,
    TableCell,
    TableHeader,
    Link,
    Quote,
}

/// Cumulative text of the current output line, with lazily computed
/// open-construct flags for cross-chunk checks.
#[derive(Debug, Clone, Default)]
pub struct LineState {
    pub text: String,
    processed: bool,
    has_open_heading_char: bool,
    has_open_brackets: bool,
}

impl LineState {
    pub fn push(&mut self, s: &str) {
        self.text.push_str(s);
        self.processed = false;
    }

    pub fn reset_with(&mut self, tail: &str) {
        self.text.clear();
        self.text.push_str(tail);
        self.processed = false;
        self.has_open_heading_char = false;
        self.has_open_brackets = false;
    }

    /// `(open heading, open brackets)` for the line so far.
    pub fn open_flags(&mut self) -> (bool, bool) {
        if !self.processed {
            self.processed = true;
            self.has_open_heading_char = self.text.starts_with('=');
            self.has_open_brackets =
                self.text.matches('[').count() > self.text.matches(']').count();
        }
        (self.has_open_heading_char, self.has_open_brackets)
    }
}

/// Everything the oracle needs to know about the emission context.
pub struct EscapeArgs<'a> {
    pub site: &'a SiteConfig,
    pub on_sol: bool,
    pub in_indent_pre: bool,
    pub in_php_block: bool,
    pub in_wide_td: bool,
    pub context: Option<EscapeContext>,
    pub line: &'a mut LineState,
}

static MAGIC_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(?:RFC|ISBN|PMID)(?:\s|$)").unwrap());
static SOL_LEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]+[^\s]").unwrap());
static INDENT_PRE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]+[^ \t\n]").unwrap());
static HEADING_AMBIG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^=+[^=]+=+$").unwrap());

const SENSITIVE_CHARS: &[char] = &[
    '<', '>', '[', ']', '-', '+', '|', '\'', '!', '=', '#', '*', ':', ';', '~', '{', '}',
];

fn has_tildes(text: &str) -> bool {
    text.contains("~~~")
}

fn has_inner_newline(text: &str) -> bool {
    match text.rfind('\n') {
        Some(pos) => pos + 1 < text.len() || text[..pos].contains('\n'),
        None => false,
    }
}

fn replace_nowiki_tags(text: &str) -> String {
    text.replace("<nowiki>", "&lt;nowiki&gt;")
        .replace("</nowiki>", "&lt;/nowiki&gt;")
}

/// Wrap a fragment in `<nowiki>`, keeping any trailing newline run outside
/// the wrapper.
pub fn wrap_in_nowiki(text: &str) -> String {
    let text = replace_nowiki_tags(text);
    let head_len = text.trim_end_matches('\n').len();
    let (head, tail) = text.split_at(head_len);
    format!("<nowiki>{head}</nowiki>{tail}")
}

impl EscapeContext {
    /// Construct-local hazard check for text emitted inside this context.
    pub fn requires_escape(self, args: &EscapeArgs, text: &str) -> bool {
        let line = &args.line.text;
        match self {
            EscapeContext::Heading => text.starts_with('=') || text.ends_with('='),
            EscapeContext::ListItem => {
                let at_item_start = !line.is_empty()
                    && line.chars().all(|c| matches!(c, '*' | '#' | ':' | ';'));
                let starts_bullet = text.starts_with(['*', '#', ':', ';']);
                ((at_item_start || args.on_sol) && starts_bullet)
                    || newline_starts_bullet(text)
                    || (line.starts_with(';') && text.contains(':'))
            }
            EscapeContext::TableCell | EscapeContext::TableHeader => {
                if text.contains('|') {
                    return true;
                }
                if self == EscapeContext::TableHeader && text.contains("!!") {
                    return true;
                }
                let at_cell_start = !line.is_empty()
                    && line.chars().all(|c| matches!(c, '|' | '!'));
                if at_cell_start && text.starts_with(['-', '+', '}']) {
                    return true;
                }
                // In a wide cell a newline re-enters table SOL syntax.
                args.in_wide_td
                    && text
                        .split('\n')
                        .skip(1)
                        .any(|l| l.starts_with(['|', '!']))
            }
            EscapeContext::Link => {
                text.starts_with('|') || text.contains("[[") || text.contains("]]")
            }
            EscapeContext::Quote => {
                text.starts_with('\'') || text.ends_with('\'') || text.contains("''")
            }
        }
    }
}

fn newline_starts_bullet(text: &str) -> bool {
    text.split('\n')
        .skip(1)
        .any(|l| l.starts_with(['*', '#', ':', ';']))
}

/// Decide whether `text` can be emitted raw or must be nowiki-wrapped, and
/// return the text to emit.
pub fn escape_wikitext(args: &mut EscapeArgs, text: &str) -> String {
    let has_magic = MAGIC_LINK_RE.is_match(text);

    // Fast accept: nothing in the fragment can possibly tokenize.
    if !has_magic
        && !SOL_LEADER_RE.is_match(text)
        && !text.contains(SENSITIVE_CHARS)
    {
        return text.to_string();
    }

    if let Some(context) = args.context {
        if context.requires_escape(args, text) {
            return wrap_in_nowiki(text);
        }
    }

    // Brace pairs are never safe: they open or close templates and
    // template arguments regardless of position.
    if text.contains("{{") || text.contains("}}") {
        return wrap_in_nowiki(text);
    }

    let sol = args.on_sol && !args.in_indent_pre && !args.in_php_block;
    let newlines = has_inner_newline(text);
    let tildes = has_tildes(text);

    // Refined fast paths for single-line fragments.
    if !has_magic && !newlines && !tildes {
        if !sol
            && !text.contains("''")
            && !text.contains(['<', '>', '[', ']'])
            && !text.ends_with('=')
        {
            return text.to_string();
        }
        if sol
            && !text.starts_with([' ', '#', '*', ':', ';', '='])
            && !text.contains(['<', '[', ']', '>', '|', '\'', '!'])
            && !text.contains("----")
        {
            return text.to_string();
        }
    }

    // A line starting with a space would open an indent-pre.
    if sol && INDENT_PRE_RE.is_match(text) {
        return wrap_in_nowiki(text);
    }

    let text = replace_nowiki_tags(text);

    // Consult the scanner. A junk prefix suppresses SOL-only tokens when
    // we are mid-line; inside indent-pre or a block-scope HTML tag every
    // embedded newline is mid-line too.
    let mut probe = String::new();
    if !sol {
        probe.push('_');
    }
    if args.in_indent_pre || args.in_php_block {
        probe.push_str(&text.replace('\n', "\n_"));
    } else {
        probe.push_str(&text);
    }
    if has_significant_tokens(args.site, &probe) {
        return wrap_in_nowiki(&text);
    }
    if tildes {
        return wrap_in_nowiki(&text);
    }

    if sol && HEADING_AMBIG_RE.is_match(&text) {
        return wrap_in_nowiki(&text);
    }

    // Cross-chunk hazards: the line so far may have opened a heading or a
    // bracket that this fragment completes.
    let (open_heading, open_brackets) = args.line.open_flags();
    if open_heading && text.trim_end().ends_with('=') {
        return wrap_in_nowiki(&text);
    }
    if open_brackets && text.contains(']') {
        let combined = format!("{}{}", args.line.text, text);
        let linkish = tokenize(args.site, &combined)
            .iter()
            .any(|t| t.name == "wikilink" || t.name == "extlink");
        if linkish {
            return wrap_in_nowiki(&text);
        }
    }

    text
}

fn has_significant_tokens(site: &SiteConfig, probe: &str) -> bool {
    for token in tokenize(site, probe) {
        if token.kind == TokenKind::Comment {
            return true;
        }
        match token.name.as_str() {
            "wikilink" | "extlink" | "listItem" | "heading" | "table" | "hr" | "template"
            | "mw-quote" | "magiclink" => return true,
            // Bare URLs round-trip as the same text.
            "urllink" => continue,
            name => {
                if !is_allowed_html_tag(name) {
                    continue;
                }
                if matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                    continue;
                }
                if token.kind == TokenKind::EndTag && is_void_element(name) {
                    continue;
                }
                if name == "span" && token.src.contains("mw:Entity") {
                    continue;
                }
                return true;
            }
        }
    }
    false
}
