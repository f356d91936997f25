//! HTML to wikitext serialization for annotated document trees
//!
//! ```text
//! This crate converts the annotated HTML produced by a bidirectional
//! wiki/HTML converter back into wiki markup. The goal is semantic
//! round-tripping: re-parsing the emitted markup yields a tree
//! equivalent to the input. Where the original page source and source
//! ranges are available, unmodified regions reproduce byte-for-byte.
//!
//! TLDR for contributors:
//!     - The DOM comes from html5ever/rcdom; round-trip metadata
//!       (data-parsoid, data-mw, diff marks) lives in a typed side
//!       table (see ./dom.rs), never re-parsed from attributes.
//!     - All of the interesting behavior is in three state machines:
//!       the separator engine (./serialize/separators.rs), the escape
//!       oracle (./escape/), and the selective serializer
//!       (./serialize/selser.rs). Tag handlers are mechanical.
//!     - Every handler change needs a round-trip test; see tests/.
//! ```
//!
//! Architecture
//!
//! ```text
//! The pipeline is prepare -> serialize:
//!
//! prepare (./prepare.rs) parses the annotated HTML, lifts the JSON
//! metadata attributes into the side table, strips parser-internal
//! marker metas, finalizes per-element metadata, and collects the
//! sources of template-generated attributes.
//!
//! serialize (./serialize/) walks the tree depth-first. Between any
//! two nodes it merges the separator constraints contributed by both
//! sides and reconstructs the whitespace/comment run; for each element
//! it either reuses original source verbatim (selser) or dispatches to
//! the tag handler; text nodes pass through the escape oracle which
//! decides between raw emission and a nowiki wrapper.
//!
//! The file structure:
//! .
//! ├── error.rs
//! ├── env.rs                  # Per-run environment and page info
//! ├── dom.rs                  # rcdom helpers + metadata side table
//! ├── meta.rs                 # Typed data-parsoid / data-mw records
//! ├── prepare.rs              # Ingestion and pre-serialization passes
//! ├── escape
//! │   ├── tokenizer.rs        # Wikitext scanner for the oracle
//! │   └── mod.rs              # The escape oracle
//! ├── serialize
//! │   ├── separators.rs       # Constraint merge + materialization
//! │   ├── handlers.rs         # Tag handler table and dispatch
//! │   ├── links.rs            # Wikilink / extlink / figure handlers
//! │   ├── attrs.rs            # Attribute emitter
//! │   ├── selser.rs           # Selective serialization
//! │   └── mod.rs              # State record, driver, public API
//! └── lib.rs
//! ```
//!
//! Library Choices
//!
//! ```text
//! The DOM side rides on the html5ever ecosystem rather than a
//! hand-rolled tree: the input contract is real-world HTML and the
//! Servo parser handles it. Metadata records use serde against the
//! JSON attribute payloads, with parameter order preserved so template
//! calls reconstruct argument-for-argument. The escape oracle compiles
//! its pattern tables once via once_cell; site-specific names
//! (namespaces, magic words, protocols) come from wt-config so a
//! localized wiki only needs a TOML overlay.
//! ```

pub mod dom;
pub mod env;
pub mod error;
pub mod escape;
pub mod meta;
pub mod prepare;
pub mod serialize;

pub use env::{Env, PageInfo};
pub use error::SerializeError;
pub use prepare::{prepare_html, PreparedDocument};
pub use serialize::WikitextSerializer;

/// Convert annotated HTML to wikitext in one call.
pub fn html_to_wikitext(env: &Env, html: &str) -> Result<String, SerializeError> {
    let doc = prepare::prepare_html(env, html)?;
    WikitextSerializer::new(env).serialize(&doc)
}

/// Convert annotated HTML to wikitext in selser mode. With no diff marks
/// attached, the output equals the original page source byte-for-byte
/// wherever source ranges are present.
pub fn html_to_wikitext_selser(env: &Env, html: &str) -> Result<String, SerializeError> {
    let doc = prepare::prepare_html(env, html)?;
    WikitextSerializer::new(env).serialize_selser(&doc)
}
