//! Shared site-configuration loader for the wt toolchain.
//!
//! `defaults/wiki.default.toml` is embedded into every binary so that the
//! serializer and its docs stay in sync. Applications layer wiki-specific
//! files (localized magic words, namespace aliases) on top of those defaults
//! via [`Loader`] before deserializing into [`SiteConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/wiki.default.toml");

/// Site configuration consumed by the serializer.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub namespaces: NamespaceConfig,
    pub magic_words: MagicWordConfig,
    pub protocols: ProtocolConfig,
}

/// Namespace aliases. The first alias of each group is the canonical form
/// used when emitting.
#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceConfig {
    pub category: Vec<String>,
    pub file: Vec<String>,
}

/// Localized magic words, keyed by canonical name.
#[derive(Debug, Clone, Deserialize)]
pub struct MagicWordConfig {
    /// Bare image options (`thumbnail` -> `thumb`).
    pub image_options: HashMap<String, String>,
    /// Interpolated image options (`img_link` -> `link=$1`).
    pub image_prefix_options: HashMap<String, String>,
    /// Page-property words (`notoc` -> `__NOTOC__`, `defaultsort` -> `DEFAULTSORT:$1`).
    pub page_props: HashMap<String, String>,
}

/// Recognized external-link protocols.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    pub url: Vec<String>,
}

impl SiteConfig {
    /// Lookup of a bare image option by canonical name.
    pub fn image_option(&self, canonical: &str) -> Option<&str> {
        self.magic_words
            .image_options
            .get(canonical)
            .map(String::as_str)
    }

    /// Lookup of an interpolated image option pattern by canonical name.
    pub fn image_prefix_option(&self, canonical: &str) -> Option<&str> {
        self.magic_words
            .image_prefix_options
            .get(canonical)
            .map(String::as_str)
    }

    /// Substitute `value` into the `$1` slot of an interpolated magic word.
    pub fn replace_interpolated_magic_word(&self, canonical: &str, value: &str) -> Option<String> {
        self.image_prefix_option(canonical)
            .or_else(|| self.page_prop_word(canonical))
            .map(|pattern| pattern.replace("$1", value))
    }

    /// Lookup of a page-property word (pattern may contain `$1`).
    pub fn page_prop_word(&self, canonical: &str) -> Option<&str> {
        self.magic_words
            .page_props
            .get(canonical)
            .map(String::as_str)
    }

    /// True if `name` is an alias of the category namespace.
    pub fn is_category_namespace(&self, name: &str) -> bool {
        self.namespaces
            .category
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// True if `name` is an alias of the file namespace.
    pub fn is_file_namespace(&self, name: &str) -> bool {
        self.namespaces
            .file
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// The canonical category namespace name.
    pub fn category_namespace(&self) -> &str {
        self.namespaces
            .category
            .first()
            .map(String::as_str)
            .unwrap_or("Category")
    }

    /// True if `text` starts with a recognized external-link protocol.
    pub fn starts_with_url_protocol(&self, text: &str) -> bool {
        self.protocols.url.iter().any(|p| text.starts_with(p.as_str()))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Loader::from_defaults()
            .and_then(Loader::load)
            .expect("embedded site defaults must parse")
    }
}

/// Builder that layers configuration files over the embedded defaults.
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start from the embedded defaults.
    pub fn from_defaults() -> Result<Self, ConfigError> {
        let builder =
            Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Ok(Loader { builder })
    }

    /// Layer a wiki-specific TOML file on top of the current sources.
    pub fn with_file(mut self, path: &Path) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path).format(FileFormat::Toml));
        self
    }

    /// Resolve all sources into a [`SiteConfig`].
    pub fn load(self) -> Result<SiteConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let site = SiteConfig::default();
        assert!(site.is_category_namespace("Category"));
        assert!(site.is_file_namespace("File"));
        assert!(site.is_file_namespace("Image"));
        assert!(!site.is_category_namespace("File"));
    }

    #[test]
    fn test_image_options() {
        let site = SiteConfig::default();
        assert_eq!(site.image_option("thumbnail"), Some("thumb"));
        assert_eq!(site.image_option("framed"), Some("frame"));
        assert_eq!(site.image_option("none"), Some("none"));
        assert_eq!(site.image_option("unheard-of"), None);
    }

    #[test]
    fn test_interpolated_options() {
        let site = SiteConfig::default();
        assert_eq!(
            site.replace_interpolated_magic_word("link", "Main Page"),
            Some("link=Main Page".to_string())
        );
        assert_eq!(
            site.replace_interpolated_magic_word("defaultsort", "Key"),
            Some("DEFAULTSORT:Key".to_string())
        );
    }

    #[test]
    fn test_page_props() {
        let site = SiteConfig::default();
        assert_eq!(site.page_prop_word("notoc"), Some("__NOTOC__"));
        assert_eq!(site.page_prop_word("toc"), Some("__TOC__"));
    }

    #[test]
    fn test_protocols() {
        let site = SiteConfig::default();
        assert!(site.starts_with_url_protocol("https://example.org"));
        assert!(!site.starts_with_url_protocol("example.org"));
    }
}
