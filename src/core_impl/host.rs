use super::*;

/// Plain function that reads an element's text content.
///
/// The engine captures the host's native getter once in [`ExtendedCss::init`] and
/// routes all text matching through it, so a page that patches its own
/// `textContent` cannot hide text from `:contains()`.
pub type TextContentGetter<D> = fn(&D, <D as HostDocument>::Node) -> String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAttribute {
    pub name: String,
    pub value: String,
}

impl ElementAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attribute { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    pub target: N,
    pub kind: MutationKind,
}

impl<N> MutationRecord<N> {
    pub fn child_list(target: N) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList,
        }
    }

    pub fn attribute(target: N, name: impl Into<String>) -> Self {
        Self {
            target,
            kind: MutationKind::Attribute { name: name.into() },
        }
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            MutationKind::Attribute { name } => Some(name.as_str()),
            MutationKind::ChildList => None,
        }
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute_name().is_some()
    }
}

/// Most recent user input seen by the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub event_type: String,
    pub time_ms: u64,
}

/// Capabilities the engine needs from a live document.
///
/// Nodes are cheap copyable handles; the document owns the tree. Selector
/// arguments are plain CSS and may start with `:scope`, which binds to the
/// `root` handed to the query (the document element when querying from the
/// document node).
pub trait HostDocument {
    type Node: Copy + Eq + Hash + fmt::Debug;

    fn document_node(&self) -> Self::Node;

    fn query_selector_all(&self, root: Self::Node, selector: &str) -> Result<Vec<Self::Node>>;

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: Self::Node, selector: &str) -> Result<Option<Self::Node>>;

    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;

    fn previous_element_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    fn is_element(&self, node: Self::Node) -> bool;

    /// Lower-case tag name, empty for non-elements.
    fn tag_name(&self, node: Self::Node) -> String;

    fn attributes(&self, node: Self::Node) -> Vec<ElementAttribute>;

    /// Page-visible text content, subject to whatever the page patched.
    fn text_content(&self, node: Self::Node) -> String;

    fn native_text_content_getter(&self) -> TextContentGetter<Self>
    where
        Self: Sized;

    fn computed_style(&self, node: Self::Node, pseudo_element: Option<&str>, property: &str)
    -> String;

    fn evaluate_xpath(&self, context: Self::Node, expression: &str) -> Result<Vec<Self::Node>>;

    /// Rejects an XPath expression that cannot be compiled.
    fn validate_xpath(&self, expression: &str) -> Result<()>;

    /// Reflection object walked by `:matches-property()`.
    fn element_properties(&self, node: Self::Node) -> serde_json::Value;

    fn style_text(&self, node: Self::Node) -> String;

    fn set_style_text(&mut self, node: Self::Node, text: &str);

    fn supports_style_property(&self, node: Self::Node, property: &str) -> bool;

    fn set_style_property(&mut self, node: Self::Node, property: &str, value: &str, important: bool);

    /// Detaches `node`; false when it has no parent.
    fn remove_element(&mut self, node: Self::Node) -> bool;

    fn take_mutations(&mut self) -> Vec<MutationRecord<Self::Node>>;

    fn now_ms(&self) -> u64;

    fn last_input_event(&self) -> Option<InputEvent>;

    /// Whether the document finished loading.
    fn is_ready(&self) -> bool;
}
