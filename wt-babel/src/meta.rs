//! Typed round-trip metadata carried alongside DOM nodes.
//!
//! Every element produced by the paired parser may carry a `data-parsoid`
//! record (source ranges and original-syntax hints), a `data-mw` record
//! (template invocations), and semantic markers on `typeof`/`rel`/`about`.
//! Ingestion parses the JSON attributes once into these types; the
//! serializer only ever reads the typed records.

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Document source range: where an element's markup lives in the original
/// wikitext, plus the widths of its opening and closing markup.
///
/// Unknown components are `None`; there is no in-band sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dsr {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub open_width: Option<usize>,
    pub close_width: Option<usize>,
}

impl Dsr {
    pub fn new(start: usize, end: usize, open: usize, close: usize) -> Self {
        Dsr {
            start: Some(start),
            end: Some(end),
            open_width: Some(open),
            close_width: Some(close),
        }
    }

    /// A range is usable for source slicing when both endpoints are known
    /// and not reversed.
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s <= e)
    }

    /// Offset just past the opening markup, when known.
    pub fn inner_start(&self) -> Option<usize> {
        Some(self.start? + self.open_width?)
    }

    /// Offset of the closing markup, when known.
    pub fn inner_end(&self) -> Option<usize> {
        let end = self.end?;
        let close = self.close_width?;
        end.checked_sub(close)
    }

    /// Collapse to a zero-width range at the end offset. Used for fostered
    /// content whose source must not be sliced twice.
    pub fn collapse_to_end(&mut self) {
        self.start = self.end;
        self.open_width = Some(0);
        self.close_width = Some(0);
    }
}

impl<'de> Deserialize<'de> for Dsr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DsrVisitor;

        impl<'de> Visitor<'de> for DsrVisitor {
            type Value = Dsr;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of up to four nullable integers")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Dsr, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut parts = [None; 4];
                for slot in parts.iter_mut() {
                    match seq.next_element::<Option<i64>>()? {
                        Some(value) => {
                            // Negative offsets are unknowns, not positions.
                            *slot = value.filter(|v| *v >= 0).map(|v| v as usize);
                        }
                        None => break,
                    }
                }
                // Drain any extra elements so trailing data is not an error.
                while seq.next_element::<serde_json::Value>()?.is_some() {}
                Ok(Dsr {
                    start: parts[0],
                    end: parts[1],
                    open_width: parts[2],
                    close_width: parts[3],
                })
            }
        }

        deserializer.deserialize_seq(DsrVisitor)
    }
}

/// Which syntactic form an element originally had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    Html,
    Piped,
    Row,
}

/// One entry of a figure's image-option list: canonical key plus the
/// actual source text that produced it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImgOption {
    pub ck: String,
    #[serde(default)]
    pub ak: String,
}

/// The per-element `data-parsoid` record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataParsoid {
    pub dsr: Option<Dsr>,
    pub stx: Option<Syntax>,
    /// Value syntax for table cells (`row` for `||`/`!!` cells).
    pub stx_v: Option<String>,
    #[serde(rename = "autoInsertedStart")]
    pub auto_inserted_start: bool,
    #[serde(rename = "autoInsertedEnd")]
    pub auto_inserted_end: bool,
    #[serde(rename = "selfClose")]
    pub self_close: bool,
    pub src: Option<String>,
    #[serde(rename = "startTagSrc")]
    pub start_tag_src: Option<String>,
    #[serde(rename = "endTagSrc")]
    pub end_tag_src: Option<String>,
    #[serde(rename = "attrSepSrc")]
    pub attr_sep_src: Option<String>,
    #[serde(rename = "magicSrc")]
    pub magic_src: Option<String>,
    #[serde(rename = "strippedNL")]
    pub stripped_nl: bool,
    pub fostered: bool,
    pub tsr: Option<(i64, i64)>,
    #[serde(rename = "tagId")]
    pub tag_id: Option<i64>,
    #[serde(rename = "optionList")]
    pub option_list: Vec<ImgOption>,
    #[serde(rename = "optNames")]
    pub opt_names: Option<HashMap<String, String>>,
    pub tail: Option<String>,
    pub prefix: Option<String>,
    pub pipetrick: bool,
    /// For entity spans: the text content the recorded `src` decodes to.
    #[serde(rename = "srcContent")]
    pub src_content: Option<String>,
    /// Original attribute values as seen by the parser (sanitizer input).
    pub a: Option<HashMap<String, Option<String>>>,
    /// Shadow source text for attribute values.
    pub sa: Option<HashMap<String, String>>,
    /// Extra dashes beyond the minimum four of a horizontal rule.
    pub extra_dashes: Option<usize>,
}

impl DataParsoid {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_row_syntax_cell(&self) -> bool {
        self.stx_v.as_deref() == Some("row")
    }
}

/// The per-element `data-mw` record describing template invocations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataMw {
    pub parts: Vec<TemplatePart>,
}

impl DataMw {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One part of a transclusion: either a template call or literal wikitext
/// between calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TemplatePart {
    Template(TemplateWrapper),
    Literal(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateWrapper {
    pub template: Template,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    pub target: TemplateTarget,
    /// Parameter map; the underlying `serde_json::Map` preserves the
    /// original argument order.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateTarget {
    pub wt: Option<String>,
    pub href: Option<String>,
    pub function: Option<String>,
}

/// Extract the `wt` field of a parameter value record.
pub fn param_wikitext(value: &serde_json::Value) -> Option<&str> {
    value.get("wt").and_then(|v| v.as_str())
}

/// Diff annotation attached by the (out-of-scope) diff pre-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMark {
    Inserted,
    Modified,
}

/// Attribute shadow lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowInfo {
    pub value: String,
    /// The live value differs from what the parser recorded.
    pub modified: bool,
    /// The value is exact source text and must be emitted unescaped.
    pub from_src: bool,
}

// Semantic markers carried on `typeof` / `rel`.

pub const MW_TRANSCLUSION: &str = "mw:Transclusion";
pub const MW_PLACEHOLDER: &str = "mw:Placeholder";
pub const MW_ENTITY: &str = "mw:Entity";
pub const MW_NOWIKI: &str = "mw:Nowiki";
pub const MW_DIFF_MARKER: &str = "mw:DiffMarker";
pub const MW_IMAGE: &str = "mw:Image";
pub const MW_SEPARATOR: &str = "mw:Separator";

/// True if the whitespace-separated marker list contains `marker` exactly.
pub fn has_marker(attr: &str, marker: &str) -> bool {
    attr.split_ascii_whitespace().any(|m| m == marker)
}

/// First marker starting with `prefix`, with the prefix stripped.
pub fn marker_suffix<'a>(attr: &'a str, prefix: &str) -> Option<&'a str> {
    attr.split_ascii_whitespace()
        .find_map(|m| m.strip_prefix(prefix))
}

/// True if the marker list identifies a transclusion or extension root.
pub fn is_expansion_root(typeof_attr: &str) -> bool {
    typeof_attr.split_ascii_whitespace().any(|m| {
        m == MW_TRANSCLUSION
            || m.starts_with("mw:Extension/")
            || m.starts_with("mw:Object")
    })
}

/// True if the root is specifically an extension expansion.
pub fn is_extension_root(typeof_attr: &str) -> bool {
    typeof_attr
        .split_ascii_whitespace()
        .any(|m| m.starts_with("mw:Extension/") || m.starts_with("mw:Object/Ext"))
}

/// Link classification parsed from a `rel` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    WikiLink(WikiLinkKind),
    ExtLink(ExtLinkKind),
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikiLinkKind {
    Simple,
    Category,
    Language,
    Interwiki,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtLinkKind {
    Bracketed,
    Url,
    Numbered,
    Isbn,
    Rfc,
    Pmid,
}

/// Parse the first `mw:` marker of a `rel` attribute into a [`LinkType`].
pub fn parse_link_rel(rel: &str) -> Option<LinkType> {
    for marker in rel.split_ascii_whitespace() {
        let link = match marker {
            "mw:WikiLink" => LinkType::WikiLink(WikiLinkKind::Simple),
            "mw:WikiLink/Category" => LinkType::WikiLink(WikiLinkKind::Category),
            "mw:WikiLink/Language" => LinkType::WikiLink(WikiLinkKind::Language),
            "mw:WikiLink/Interwiki" => LinkType::WikiLink(WikiLinkKind::Interwiki),
            "mw:ExtLink" => LinkType::ExtLink(ExtLinkKind::Bracketed),
            "mw:ExtLink/URL" => LinkType::ExtLink(ExtLinkKind::Url),
            "mw:ExtLink/Numbered" => LinkType::ExtLink(ExtLinkKind::Numbered),
            "mw:ExtLink/ISBN" => LinkType::ExtLink(ExtLinkKind::Isbn),
            "mw:ExtLink/RFC" => LinkType::ExtLink(ExtLinkKind::Rfc),
            "mw:ExtLink/PMID" => LinkType::ExtLink(ExtLinkKind::Pmid),
            "mw:Image" => LinkType::Image,
            _ => continue,
        };
        return Some(link);
    }
    None
}
