//! Per-run environment threaded through the serializer.

use wt_config::SiteConfig;

/// Information about the page being serialized.
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    /// The original wikitext source, when known. Required for selective
    /// serialization and for verbatim separator reuse.
    pub src: Option<String>,
}

/// Environment for one serialization run.
///
/// The serializer never touches the file system or the network; everything
/// it needs to know about the wiki arrives here.
#[derive(Debug, Clone)]
pub struct Env {
    pub page: PageInfo,
    /// Enables the cleanup pre-pass (marker-meta stripping, metadata
    /// finalization). Off for read-only round-trip checks.
    pub edit_mode: bool,
    /// Round-trip testing mode: template and extension roots emit their
    /// recorded source instead of reconstructing from data-mw.
    pub rt_testing: bool,
    /// Emit trace events for separator and escape decisions.
    pub trace: bool,
    pub site: SiteConfig,
}

impl Env {
    pub fn new(site: SiteConfig) -> Self {
        Env {
            page: PageInfo::default(),
            edit_mode: true,
            rt_testing: false,
            trace: false,
            site,
        }
    }

    pub fn with_page_src(mut self, src: impl Into<String>) -> Self {
        self.page.src = Some(src.into());
        self
    }

    /// Normalize a page title for comparison: underscores become spaces,
    /// whitespace is collapsed, and the first letter is capitalized.
    pub fn normalize_title(&self, title: &str) -> String {
        let cleaned = title.replace('_', " ");
        let cleaned = cleaned.trim();
        let mut out = String::with_capacity(cleaned.len());
        let mut last_was_space = false;
        for ch in cleaned.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                }
                last_was_space = true;
            } else {
                out.push(ch);
                last_was_space = false;
            }
        }
        let mut chars = out.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => out,
        }
    }

    /// True if two link targets refer to the same page.
    pub fn titles_match(&self, a: &str, b: &str) -> bool {
        self.normalize_title(a) == self.normalize_title(b)
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new(SiteConfig::default())
    }
}
