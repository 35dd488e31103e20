use super::html::parse_html_into;
use super::*;
use crate::selector::{
    NthChildSelector, SelectorAttrCondition, SelectorCombinator, SelectorPart, SelectorPseudoClass,
    SelectorStep, parse_selector_groups,
};

mod host_impl;
mod page_api;
mod reflection;
mod selector_matching;
mod style;
mod tree;

pub(crate) use style::{parse_style_declarations, serialize_style_declarations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    // Source order is kept; names are lower case.
    pub(crate) attrs: Vec<(String, String)>,
}

impl Element {
    pub(crate) fn new(tag_name: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
        }
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub(crate) fn remove_attr(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| *key != name);
        before != self.attrs.len()
    }

    pub(crate) fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

/// Style rule registered by the page, consulted for computed style.
#[derive(Debug, Clone)]
pub(crate) struct PageStyleRule {
    pub(crate) selector: Vec<Vec<SelectorPart>>,
    pub(crate) pseudo_element: Option<String>,
    pub(crate) declarations: Vec<(String, String)>,
}

/// Deterministic in-memory document.
///
/// Every tree, attribute and style change is recorded as a [`MutationRecord`], and
/// time only moves through [`Page::advance_time`], so engine scheduling is
/// reproducible in tests.
#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) dom: Dom,
    mutations: Vec<MutationRecord<NodeId>>,
    now_ms: u64,
    last_input_event: Option<InputEvent>,
    ready: bool,
    style_rules: Vec<PageStyleRule>,
    text_overrides: HashMap<NodeId, String>,
    properties: HashMap<NodeId, serde_json::Map<String, serde_json::Value>>,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let mut dom = Dom::new();
        let root = dom.root;
        parse_html_into(&mut dom, root, html)?;
        dom.ensure_document_body_element()?;
        Ok(Self {
            dom,
            mutations: Vec::new(),
            now_ms: 0,
            last_input_event: None,
            ready: true,
            style_rules: Vec::new(),
            text_overrides: HashMap::new(),
            properties: HashMap::new(),
        })
    }

    pub fn document(&self) -> NodeId {
        self.dom.root
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.dom.document_element()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.dom.body()
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(self.dom.root, selector)
    }

    /// Element with the given `id` attribute, in document order.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom
            .all_element_nodes()
            .into_iter()
            .find(|node| self.dom.attr(*node, "id").as_deref() == Some(id))
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    /// Raw inline `style` attribute text.
    pub fn inline_style(&self, node: NodeId) -> String {
        self.dom.attr(node, "style").unwrap_or_default()
    }

    /// Value of one inline style property, without any `!important` suffix.
    pub fn inline_style_property(&self, node: NodeId, property: &str) -> Option<String> {
        let declarations = parse_style_declarations(self.dom.attr(node, "style").as_deref());
        declarations
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| style::strip_important(&value).0.to_string())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_connected(node)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.dom.tag_name(node)
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Records waiting to be taken by the engine.
    pub fn pending_mutations(&self) -> &[MutationRecord<NodeId>] {
        &self.mutations
    }

    fn record(&mut self, record: MutationRecord<NodeId>) {
        self.mutations.push(record);
    }

    fn visible_text_content(&self, node: NodeId) -> String {
        match self.text_overrides.get(&node) {
            Some(text) => text.clone(),
            None => self.dom.text_content(node),
        }
    }
}

fn native_text_content(page: &Page, node: NodeId) -> String {
    page.dom.text_content(node)
}
