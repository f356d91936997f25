//! The serializer core: state record, traversal driver, and public API.
//!
//! The driver walks the DOM depth-first. Before a node's content is
//! emitted it merges the "after previous" and "before this" separator
//! constraints; it then either reuses original source (selective
//! serialization) or invokes the node's tag handler; on exit it records
//! the node as "previous" for the next separator computation.
//!
//! Emission is push-based: chunks accumulate in the output buffer and are
//! forwarded to an optional caller-supplied sink. Handlers may compose a
//! child serialization to a scratch string; the pending separator is saved
//! and restored around that composition so the outer run observes no side
//! effects.

pub mod attrs;
pub mod handlers;
pub mod links;
pub mod selser;
pub mod separators;

use crate::dom::{self, MetaDb};
use crate::env::Env;
use crate::error::SerializeError;
use crate::escape::{escape_wikitext, EscapeArgs, EscapeContext, LineState};
use crate::meta;
use crate::prepare::{PreparedDocument, TplAttrs};
use markup5ever_rcdom::{Handle, NodeData};
use self::separators::{is_valid_separator, materialize, SepInfo, Separator};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{error, trace};

/// HTML-to-wikitext serializer for one environment.
pub struct WikitextSerializer<'e> {
    env: &'e Env,
}

impl<'e> WikitextSerializer<'e> {
    pub fn new(env: &'e Env) -> Self {
        WikitextSerializer { env }
    }

    /// Serialize a prepared document and return the wikitext.
    pub fn serialize(&self, doc: &PreparedDocument) -> Result<String, SerializeError> {
        let mut state = SerializerState::new(self.env, doc, false, None);
        state.run(&doc.body)?;
        Ok(state.out)
    }

    /// Serialize, forwarding each emitted chunk to `sink` as it is produced.
    pub fn serialize_with_sink(
        &self,
        doc: &PreparedDocument,
        sink: &mut dyn FnMut(&str),
    ) -> Result<(), SerializeError> {
        let mut state = SerializerState::new(self.env, doc, false, Some(sink));
        state.run(&doc.body)
    }

    /// Selective serialization: unmodified subtrees are copied verbatim
    /// from the original page source; only changed regions go through the
    /// handlers. Diff marks are read from the document's [`MetaDb`].
    pub fn serialize_selser(&self, doc: &PreparedDocument) -> Result<String, SerializeError> {
        if self.env.page.src.is_none() {
            return Err(SerializeError::MetadataError(
                "selective serialization requires the original page source".to_string(),
            ));
        }
        let mut state = SerializerState::new(self.env, doc, true, None);
        state.run(&doc.body)?;
        Ok(state.out)
    }
}

/// Mutable state of one serialization run.
pub struct SerializerState<'a> {
    pub(crate) env: &'a Env,
    pub(crate) db: &'a MetaDb,
    pub(crate) tpl_attrs: &'a HashMap<String, TplAttrs>,
    pub(crate) out: String,
    sink: Option<&'a mut dyn FnMut(&str)>,
    capture_depth: usize,
    pub(crate) sep: Separator,
    pub(crate) on_sol: bool,
    pub(crate) at_start_of_output: bool,
    pub(crate) escape_text: bool,
    pub(crate) in_indent_pre: bool,
    pub(crate) in_php_block: bool,
    pub(crate) in_html_pre: bool,
    pub(crate) in_nowiki: bool,
    pub(crate) in_wide_td: bool,
    pub(crate) selser_mode: bool,
    pub(crate) wte_handlers: Vec<EscapeContext>,
    pub(crate) curr_line: LineState,
    pub(crate) prev_node: Option<Handle>,
    pub(crate) prev_node_unmodified: bool,
    pub(crate) curr_node_unmodified: bool,
    pub(crate) in_modified_content: bool,
    pub(crate) active_template_id: Option<String>,
}

impl<'a> SerializerState<'a> {
    fn new(
        env: &'a Env,
        doc: &'a PreparedDocument,
        selser_mode: bool,
        sink: Option<&'a mut dyn FnMut(&str)>,
    ) -> Self {
        SerializerState {
            env,
            db: &doc.meta,
            tpl_attrs: &doc.tpl_attrs,
            out: String::new(),
            sink,
            capture_depth: 0,
            sep: Separator::default(),
            on_sol: true,
            at_start_of_output: true,
            escape_text: true,
            in_indent_pre: false,
            in_php_block: false,
            in_html_pre: false,
            in_nowiki: false,
            in_wide_td: false,
            selser_mode,
            wte_handlers: Vec::new(),
            curr_line: LineState::default(),
            prev_node: None,
            prev_node_unmodified: false,
            curr_node_unmodified: false,
            in_modified_content: false,
            active_template_id: None,
        }
    }

    fn run(&mut self, body: &Handle) -> Result<(), SerializeError> {
        self.serialize_children(body, None)?;
        // Flush trailing comments/newlines accumulated after the last
        // node. Constraints no longer apply: there is no following node
        // to separate from.
        let tail = std::mem::take(&mut self.sep).src;
        self.push_str(&tail);
        Ok(())
    }

    // Emission plumbing.

    fn push_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.out.push_str(s);
        if self.capture_depth == 0 {
            if let Some(sink) = self.sink.as_mut() {
                sink(s);
            }
        }
        match s.rfind('\n') {
            Some(idx) => {
                let tail = &s[idx + 1..];
                self.curr_line.reset_with(tail);
                self.on_sol = tail.is_empty();
            }
            None => {
                self.curr_line.push(s);
                self.on_sol = false;
            }
        }
    }

    /// Emit a chunk of markup on behalf of `node`, materializing the
    /// pending separator first. The separator is emitted exactly once: it
    /// is taken out of the state here.
    pub(crate) fn emit(&mut self, text: &str, node: &Handle) {
        let sep = self.build_pending_sep(node);
        self.push_str(&sep);
        if !sep.is_empty() {
            self.at_start_of_output = false;
        }
        self.push_str(text);
        if !text.is_empty() {
            self.at_start_of_output = false;
        }
    }

    /// Materialize and consume the pending separator. `next` is the node
    /// the separator precedes.
    pub(crate) fn build_pending_sep(&mut self, next: &Handle) -> String {
        let sep = std::mem::take(&mut self.sep);
        let mut candidate = sep.src;

        // Prefer the literal source run between the two nodes whenever the
        // ranges are known and both sides are unmodified.
        let reusable = !self.in_modified_content
            && (!self.selser_mode
                || (self.prev_node_unmodified && self.curr_node_unmodified));
        if reusable {
            if let Some(slice) = self.source_separator(next) {
                candidate = slice;
            }
        }

        let right_pre_safe = dom::is_pre_safe(next);
        let result = materialize(
            sep.constraints.as_ref(),
            &candidate,
            self.at_start_of_output,
            right_pre_safe,
        );
        if self.env.trace {
            trace!(sep = %result.escape_debug(), "separator");
        }
        debug_assert!(is_valid_separator(&result), "separator grammar violated");
        result
    }

    /// The original source text between the previous node and `next`,
    /// when both ranges are known and the text is a valid separator.
    fn source_separator(&self, next: &Handle) -> Option<String> {
        let src = self.env.page.src.as_deref()?;
        let prev = self.prev_node.as_ref()?;
        if Rc::ptr_eq(prev, next) {
            return None;
        }
        let prev_dsr = self.db.dp(prev)?.dsr?;
        let next_dsr = self.db.dp(next)?.dsr?;
        if !prev_dsr.is_valid() || !next_dsr.is_valid() {
            return None;
        }

        let prev_is_parent = dom::parent_of(next)
            .map(|p| Rc::ptr_eq(&p, prev))
            .unwrap_or(false);
        let next_is_parent = dom::parent_of(prev)
            .map(|p| Rc::ptr_eq(&p, next))
            .unwrap_or(false);
        let (from, to) = if prev_is_parent {
            (prev_dsr.inner_start()?, next_dsr.start?)
        } else if next_is_parent {
            (prev_dsr.end?, next_dsr.inner_end()?)
        } else {
            (prev_dsr.end?, next_dsr.start?)
        };
        if from > to {
            return None;
        }
        let slice = src.get(from..to)?;
        if is_valid_separator(slice) {
            Some(slice.to_string())
        } else {
            None
        }
    }

    // Traversal.

    pub(crate) fn serialize_node(&mut self, node: &Handle) -> Result<(), SerializeError> {
        match &node.data {
            NodeData::Text { .. } => self.serialize_text_node(node),
            NodeData::Comment { .. } => {
                self.serialize_comment_node(node);
                Ok(())
            }
            NodeData::Element { .. } => self.serialize_element(node),
            _ => Ok(()),
        }
    }

    /// Serialize the children of `node`, optionally under an escape
    /// context. The context stack is returned to its entry depth.
    pub(crate) fn serialize_children(
        &mut self,
        node: &Handle,
        wte: Option<EscapeContext>,
    ) -> Result<(), SerializeError> {
        if let Some(context) = wte {
            self.wte_handlers.push(context);
        }
        let depth = self.wte_handlers.len();
        let result = (|| {
            for child in dom::children_of(node) {
                self.serialize_node(&child)?;
            }
            Ok(())
        })();
        debug_assert_eq!(self.wte_handlers.len(), depth, "escape stack imbalance");
        if wte.is_some() {
            self.wte_handlers.pop();
        }
        result
    }

    /// Serialize the children of `node` to a scratch string. The pending
    /// separator and line bookkeeping are saved and restored so the outer
    /// run observes no side effects.
    pub(crate) fn capture_children(
        &mut self,
        node: &Handle,
        wte: Option<EscapeContext>,
        sol: bool,
    ) -> Result<String, SerializeError> {
        let saved_out = std::mem::take(&mut self.out);
        let saved_sep = std::mem::take(&mut self.sep);
        let saved_line = std::mem::take(&mut self.curr_line);
        let saved_sol = self.on_sol;
        let saved_start = self.at_start_of_output;
        let saved_prev = self.prev_node.take();

        self.capture_depth += 1;
        self.on_sol = sol;
        self.at_start_of_output = false;
        let result = self.serialize_children(node, wte);
        // Flush whatever whitespace the last child left pending; the
        // captured composition owns it.
        let tail = std::mem::take(&mut self.sep).src;
        self.push_str(&tail);
        self.capture_depth -= 1;

        let captured = std::mem::replace(&mut self.out, saved_out);
        self.sep = saved_sep;
        self.curr_line = saved_line;
        self.on_sol = saved_sol;
        self.at_start_of_output = saved_start;
        self.prev_node = saved_prev;
        result.map(|_| captured)
    }

    fn serialize_text_node(&mut self, node: &Handle) -> Result<(), SerializeError> {
        let text = dom::text_of(node).unwrap_or_default();
        if text.is_empty() {
            return Ok(());
        }
        // Whitespace-only runs are separator material, not content.
        if text.chars().all(char::is_whitespace) {
            self.sep.src.push_str(&text);
            return Ok(());
        }
        self.update_constraints_before(node, None);

        // A leading newline run belongs to the separator too.
        let lead_len = text.len() - text.trim_start_matches('\n').len();
        let (lead, rest) = text.split_at(lead_len);
        self.sep.src.push_str(lead);

        // Emit the separator before deciding how to escape: the escape
        // decision depends on the post-separator line position.
        let sep = self.build_pending_sep(node);
        self.push_str(&sep);
        if !sep.is_empty() {
            self.at_start_of_output = false;
        }

        // Inside literal nowiki or HTML-pre content there is nothing to
        // escape; the enclosing tags already suspend tokenization.
        let escaping = self.escape_text && !self.in_nowiki && !self.in_html_pre;
        let emitted = if escaping {
            let mut args = EscapeArgs {
                site: &self.env.site,
                on_sol: self.on_sol,
                in_indent_pre: self.in_indent_pre,
                in_php_block: self.in_php_block,
                in_wide_td: self.in_wide_td,
                context: self.wte_handlers.last().copied(),
                line: &mut self.curr_line,
            };
            escape_wikitext(&mut args, rest)
        } else {
            rest.to_string()
        };
        self.push_str(&emitted);
        if !emitted.is_empty() {
            self.at_start_of_output = false;
        }

        self.update_constraints_after(node, None);
        self.prev_node = Some(node.clone());
        self.prev_node_unmodified = false;
        self.curr_node_unmodified = false;
        Ok(())
    }

    fn serialize_comment_node(&mut self, node: &Handle) {
        let body = dom::comment_of(node).unwrap_or_default();
        let encoded = format!("<!--{}-->", body.replace("-->", "--&gt;"));
        let after_block = dom::prev_sibling(node)
            .map(|p| {
                dom::element_name(&p)
                    .map(|n| dom::is_block_scope_element(n) || dom::heading_level(n).is_some())
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        if self.sep.is_pending() || self.on_sol || after_block {
            // At a block boundary the comment travels with the separator.
            self.sep.src.push_str(&encoded);
        } else {
            self.emit(&encoded, node);
            self.prev_node = Some(node.clone());
            self.prev_node_unmodified = false;
        }
    }

    fn serialize_element(&mut self, node: &Handle) -> Result<(), SerializeError> {
        let typeof_attr = dom::get_attr(node, "typeof").unwrap_or_default();
        if meta::has_marker(&typeof_attr, meta::MW_DIFF_MARKER) {
            self.curr_node_unmodified = false;
            return Ok(());
        }

        // Siblings of an emitted template expansion share its about id and
        // are already covered by the emitted source.
        if let Some(active) = self.active_template_id.clone() {
            if dom::get_attr(node, "about").as_deref() == Some(active.as_str()) {
                return Ok(());
            }
            self.active_template_id = None;
        }

        let handler = handlers::dispatch(self, node);
        self.update_constraints_before(node, Some(&handler));

        self.curr_node_unmodified = false;
        let mut handled = false;
        if self.selser_mode {
            handled = selser::try_emit_original(self, node)?;
        }
        if !handled {
            let marked = self.db.is_marked(node);
            let saved_modified = self.in_modified_content;
            if marked {
                self.in_modified_content = true;
            }
            let result = handler.handle(self, node);
            self.in_modified_content = saved_modified;
            if let Err(err) = result {
                error!(node = %dom::node_name(node), %err, "handler failed");
                return Err(err);
            }
        }

        self.update_constraints_after(node, Some(&handler));
        self.prev_node = Some(node.clone());
        self.prev_node_unmodified = self.curr_node_unmodified;
        Ok(())
    }

    // Separator constraint updates at node boundaries.

    fn update_constraints_before(&mut self, node: &Handle, handler: Option<&handlers::Handler>) {
        if let Some(prev) = dom::prev_non_sep_sibling(node) {
            let a_info = handlers::handler_for(self, &prev)
                .map(|h| h.sep_after(&prev, node, self))
                .unwrap_or(SepInfo::NONE);
            let b_info = handler
                .map(|h| h.sep_before(node, &prev, self))
                .unwrap_or(SepInfo::NONE);
            self.sep.add_constraints(
                &dom::node_name(&prev),
                a_info,
                &dom::node_name(node),
                b_info,
            );
        } else if let Some(parent) = dom::parent_of(node) {
            if dom::is_element(&parent) {
                let a_info = handlers::handler_for(self, &parent)
                    .map(|h| h.sep_first_child(&parent, node, self))
                    .unwrap_or(SepInfo::NONE);
                let b_info = handler
                    .map(|h| h.sep_before(node, &parent, self))
                    .unwrap_or(SepInfo::NONE);
                self.sep.add_constraints(
                    &dom::node_name(&parent),
                    a_info,
                    &dom::node_name(node),
                    b_info,
                );
            }
        }
    }

    fn update_constraints_after(&mut self, node: &Handle, handler: Option<&handlers::Handler>) {
        if dom::next_non_sep_sibling(node).is_some() {
            // The next sibling pairs with us when it is visited.
            return;
        }
        if let Some(parent) = dom::parent_of(node) {
            if dom::is_element(&parent) {
                let a_info = handler
                    .map(|h| h.sep_after(node, &parent, self))
                    .unwrap_or(SepInfo::NONE);
                let b_info = handlers::handler_for(self, &parent)
                    .map(|h| h.sep_last_child(&parent, node, self))
                    .unwrap_or(SepInfo::NONE);
                self.sep.add_constraints(
                    &dom::node_name(node),
                    a_info,
                    &dom::node_name(&parent),
                    b_info,
                );
            }
        }
    }
}
