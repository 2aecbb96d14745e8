//! Page HTML parsed by html5ever into an index arena
//!
//! Only what the Markdown renderer reads is kept: element local names,
//! attributes and merged text. Comments stay as inert nodes so the tree
//! builder can address them; doctypes are dropped.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, QualName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeData {
    Document,
    Element {
        /// Lowercase local name
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub data: NodeData,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    pub const DOCUMENT: usize = 0;

    /// Parse `html` as a full document; fragments get the implied html/body
    pub fn parse(html: &str) -> Self {
        parse_document(DomSink::default(), ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes())
    }

    fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn data(&self, id: usize) -> &NodeData {
        &self.nodes[id].data
    }

    pub fn children(&self, id: usize) -> &[usize] {
        &self.nodes[id].children
    }

    /// Element name, empty for anything that is not an element
    pub fn name(&self, id: usize) -> &str {
        match &self.nodes[id].data {
            NodeData::Element { name, .. } => name,
            _ => "",
        }
    }

    pub fn attr(&self, id: usize, key: &str) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn push(&mut self, data: NodeData) -> usize {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn detach(&mut self, id: usize) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    fn append(&mut self, parent: usize, child: usize) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    fn append_text(&mut self, parent: usize, text: &str) {
        if let Some(&last) = self.nodes[parent].children.last() {
            if let NodeData::Text(existing) = &mut self.nodes[last].data {
                existing.push_str(text);
                return;
            }
        }
        let id = self.push(NodeData::Text(text.to_string()));
        self.append(parent, id);
    }

    fn insert_before(&mut self, sibling: usize, child: usize) {
        let Some(parent) = self.nodes[sibling].parent else {
            return;
        };
        self.detach(child);
        let pos = self.position(parent, sibling);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(pos, child);
    }

    fn insert_text_before(&mut self, sibling: usize, text: &str) {
        let Some(parent) = self.nodes[sibling].parent else {
            return;
        };
        let pos = self.position(parent, sibling);
        if pos > 0 {
            let prev = self.nodes[parent].children[pos - 1];
            if let NodeData::Text(existing) = &mut self.nodes[prev].data {
                existing.push_str(text);
                return;
            }
        }
        let id = self.push(NodeData::Text(text.to_string()));
        self.insert_before(sibling, id);
    }

    fn position(&self, parent: usize, child: usize) -> usize {
        self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == child)
            .unwrap_or(self.nodes[parent].children.len())
    }
}

/// Node reference handed to the tree builder
///
/// Elements carry their qualified name so `elem_name` can borrow it from the
/// handle instead of from the arena behind the `RefCell`.
#[derive(Debug, Clone)]
pub(crate) struct NodeHandle {
    id: usize,
    name: Option<Rc<QualName>>,
}

impl NodeHandle {
    fn node(id: usize) -> Self {
        Self { id, name: None }
    }
}

/// html5ever tree sink building a [`Dom`]
struct DomSink {
    dom: RefCell<Dom>,
}

impl Default for DomSink {
    fn default() -> Self {
        Self {
            dom: RefCell::new(Dom::new()),
        }
    }
}

impl TreeSink for DomSink {
    type Handle = NodeHandle;
    type Output = Dom;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Dom {
        self.dom.into_inner()
    }

    // Page bodies are routinely sloppy; recover like a browser
    fn parse_error(&self, _msg: Cow<'static, str>) {}

    fn get_document(&self) -> NodeHandle {
        NodeHandle::node(Dom::DOCUMENT)
    }

    fn elem_name<'a>(&'a self, target: &'a NodeHandle) -> &'a QualName {
        static NO_NAME: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };
        target.name.as_deref().unwrap_or(&NO_NAME)
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> NodeHandle {
        let attrs = attrs
            .into_iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect();
        let id = self.dom.borrow_mut().push(NodeData::Element {
            name: name.local.to_string(),
            attrs,
        });
        NodeHandle {
            id,
            name: Some(Rc::new(name)),
        }
    }

    fn create_comment(&self, _text: StrTendril) -> NodeHandle {
        NodeHandle::node(self.dom.borrow_mut().push(NodeData::Comment))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> NodeHandle {
        NodeHandle::node(self.dom.borrow_mut().push(NodeData::Comment))
    }

    fn append(&self, parent: &NodeHandle, child: NodeOrText<NodeHandle>) {
        let mut dom = self.dom.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => dom.append(parent.id, node.id),
            NodeOrText::AppendText(text) => dom.append_text(parent.id, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &NodeHandle,
        prev_element: &NodeHandle,
        child: NodeOrText<NodeHandle>,
    ) {
        let has_parent = self.dom.borrow().nodes[element.id].parent.is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &NodeHandle) -> NodeHandle {
        target.clone()
    }

    fn same_node(&self, x: &NodeHandle, y: &NodeHandle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &NodeHandle, new_node: NodeOrText<NodeHandle>) {
        let mut dom = self.dom.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => dom.insert_before(sibling.id, node.id),
            NodeOrText::AppendText(text) => dom.insert_text_before(sibling.id, &text),
        }
    }

    fn add_attrs_if_missing(&self, target: &NodeHandle, attrs: Vec<Attribute>) {
        let mut dom = self.dom.borrow_mut();
        if let NodeData::Element { attrs: existing, .. } = &mut dom.nodes[target.id].data {
            for attr in attrs {
                let key = attr.name.local.to_string();
                if !existing.iter().any(|(k, _)| *k == key) {
                    existing.push((key, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &NodeHandle) {
        self.dom.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &NodeHandle, new_parent: &NodeHandle) {
        let mut dom = self.dom.borrow_mut();
        let children = std::mem::take(&mut dom.nodes[node.id].children);
        for child in children {
            dom.nodes[child].parent = Some(new_parent.id);
            dom.nodes[new_parent.id].children.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(dom: &Dom, id: usize, name: &str) -> Option<usize> {
        if dom.name(id) == name {
            return Some(id);
        }
        dom.children(id).iter().find_map(|&c| find(dom, c, name))
    }

    fn text_of(dom: &Dom, id: usize) -> String {
        dom.children(id)
            .iter()
            .map(|&c| match dom.data(c) {
                NodeData::Text(text) => text.clone(),
                _ => text_of(dom, c),
            })
            .collect()
    }

    #[test]
    fn fragment_gets_document_structure() {
        let dom = Dom::parse("<p>Hello</p>");
        let html = find(&dom, Dom::DOCUMENT, "html").unwrap();
        let body = find(&dom, html, "body").unwrap();
        let p = find(&dom, body, "p").unwrap();
        assert_eq!(text_of(&dom, p), "Hello");
    }

    #[test]
    fn attributes_are_kept() {
        let dom = Dom::parse(r#"<pre class="language-bash" data-x='1'>ls</pre>"#);
        let pre = find(&dom, Dom::DOCUMENT, "pre").unwrap();
        assert_eq!(dom.attr(pre, "class"), Some("language-bash"));
        assert_eq!(dom.attr(pre, "data-x"), Some("1"));
        assert_eq!(dom.attr(pre, "id"), None);
    }

    #[test]
    fn named_references_are_decoded() {
        let dom = Dom::parse("<p>&eacute;t&eacute; &auml; &hellip; &#x41;</p>");
        let p = find(&dom, Dom::DOCUMENT, "p").unwrap();
        assert_eq!(text_of(&dom, p), "\u{e9}t\u{e9} \u{e4} \u{2026} A");
        assert_eq!(dom.children(p).len(), 1);
    }

    #[test]
    fn implied_table_body() {
        let dom = Dom::parse("<table><tr><td>1</td></tr></table>");
        let table = find(&dom, Dom::DOCUMENT, "table").unwrap();
        assert_eq!(dom.name(dom.children(table)[0]), "tbody");
    }

    #[test]
    fn unclosed_items_become_siblings() {
        let dom = Dom::parse("<ul><li>One<li>Two</ul>");
        let ul = find(&dom, Dom::DOCUMENT, "ul").unwrap();
        let items: Vec<&str> = dom.children(ul).iter().map(|&c| dom.name(c)).collect();
        assert_eq!(items, vec!["li", "li"]);
    }

    #[test]
    fn misnested_formatting_is_repaired() {
        let dom = Dom::parse("<p><b>bold<i>both</b>italic</i></p>");
        let p = find(&dom, Dom::DOCUMENT, "p").unwrap();
        assert_eq!(text_of(&dom, p), "boldbothitalic");
    }
}
