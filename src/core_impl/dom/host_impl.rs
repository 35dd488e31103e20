use super::*;

impl HostDocument for Page {
    type Node = NodeId;

    fn document_node(&self) -> NodeId {
        self.dom.root
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(root, selector)
    }

    fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        self.dom.closest(node, selector)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent_element(node)
    }

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.dom.previous_element_sibling(node)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.dom.element(node).is_some()
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.dom.tag_name(node).unwrap_or_default().to_string()
    }

    fn attributes(&self, node: NodeId) -> Vec<ElementAttribute> {
        self.dom
            .element(node)
            .map(|element| {
                element
                    .attrs
                    .iter()
                    .map(|(name, value)| ElementAttribute::new(name, value))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn text_content(&self, node: NodeId) -> String {
        self.visible_text_content(node)
    }

    fn native_text_content_getter(&self) -> TextContentGetter<Self> {
        native_text_content
    }

    fn computed_style(&self, node: NodeId, pseudo_element: Option<&str>, property: &str) -> String {
        self.computed_style_value(node, pseudo_element, property)
    }

    fn evaluate_xpath(&self, context: NodeId, expression: &str) -> Result<Vec<NodeId>> {
        xpath::evaluate(&self.dom, context, expression)
    }

    fn validate_xpath(&self, expression: &str) -> Result<()> {
        xpath::validate(expression)
    }

    fn element_properties(&self, node: NodeId) -> serde_json::Value {
        self.reflect_element(node)
    }

    fn style_text(&self, node: NodeId) -> String {
        self.inline_style(node)
    }

    fn set_style_text(&mut self, node: NodeId, text: &str) {
        self.write_style_attribute(node, text);
    }

    fn supports_style_property(&self, node: NodeId, property: &str) -> bool {
        self.dom.element(node).is_some() && style::is_supported_style_property(property)
    }

    fn set_style_property(&mut self, node: NodeId, property: &str, value: &str, important: bool) {
        let Some(element) = self.dom.element(node) else {
            return;
        };
        let mut declarations = parse_style_declarations(element.attr("style"));
        let value = if important {
            format!("{value} !important")
        } else {
            value.to_string()
        };
        match declarations.iter_mut().find(|(name, _)| name == property) {
            Some((_, existing)) => *existing = value,
            None => declarations.push((property.to_string(), value)),
        }
        let text = serialize_style_declarations(&declarations);
        self.write_style_attribute(node, &text);
    }

    fn remove_element(&mut self, node: NodeId) -> bool {
        match self.dom.detach(node) {
            Some(parent) => {
                self.record(MutationRecord::child_list(parent));
                true
            }
            None => false,
        }
    }

    fn take_mutations(&mut self) -> Vec<MutationRecord<NodeId>> {
        std::mem::take(&mut self.mutations)
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn last_input_event(&self) -> Option<InputEvent> {
        self.last_input_event.clone()
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
