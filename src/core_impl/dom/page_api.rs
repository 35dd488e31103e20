use super::*;

/// Page-script side of the document: every call here is what a script on a real
/// page could do, and each change is recorded for the engine's observers.
impl Page {
    fn ensure_element(&self, node: NodeId, operation: &str) -> Result<()> {
        if self.dom.element(node).is_none() {
            return Err(Error::Runtime(format!(
                "{operation} target is not an element"
            )));
        }
        Ok(())
    }

    /// Parses `html` and appends the resulting nodes to `parent`.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        if !self.dom.is_valid_node(parent) || !self.dom.can_have_children(parent) {
            return Err(Error::Runtime("appendHTML target cannot have children".into()));
        }
        let created = parse_html_into(&mut self.dom, parent, html)?;
        if !created.is_empty() {
            self.record(MutationRecord::child_list(parent));
        }
        Ok(created)
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.dom.create_element(None, tag_name, Vec::new())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let old_parent = self.dom.parent(child);
        self.dom.append_child(parent, child)?;
        if let Some(old_parent) = old_parent.filter(|old| *old != parent) {
            self.record(MutationRecord::child_list(old_parent));
        }
        self.record(MutationRecord::child_list(parent));
        Ok(())
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        let old_parent = self.dom.parent(child);
        self.dom.insert_before(parent, child, reference)?;
        if let Some(old_parent) = old_parent.filter(|old| *old != parent) {
            self.record(MutationRecord::child_list(old_parent));
        }
        self.record(MutationRecord::child_list(parent));
        Ok(())
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.dom.root {
            return Err(Error::Runtime("cannot remove document root".into()));
        }
        if let Some(parent) = self.dom.detach(node) {
            self.record(MutationRecord::child_list(parent));
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.ensure_element(node, "setAttribute")?;
        let name = name.to_ascii_lowercase();
        if let Some(element) = self.dom.element_mut(node) {
            element.set_attr(&name, value);
        }
        self.record(MutationRecord::attribute(node, name));
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.ensure_element(node, "removeAttribute")?;
        let name = name.to_ascii_lowercase();
        let removed = self
            .dom
            .element_mut(node)
            .is_some_and(|element| element.remove_attr(&name));
        if removed {
            self.record(MutationRecord::attribute(node, name));
        }
        Ok(())
    }

    /// Replaces the inline style, like a script assigning `style.cssText`.
    pub fn set_style_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.ensure_element(node, "style")?;
        self.write_style_attribute(node, text);
        Ok(())
    }

    pub(crate) fn write_style_attribute(&mut self, node: NodeId, text: &str) {
        let Some(element) = self.dom.element_mut(node) else {
            return;
        };
        element.set_attr("style", text);
        self.record(MutationRecord::attribute(node, "style"));
    }

    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.ensure_element(node, "textContent")?;
        self.dom.replace_children_with_text(node, text);
        self.record(MutationRecord::child_list(node));
        Ok(())
    }

    /// Patches the page-visible `textContent` of `node` without touching the
    /// native getter.
    pub fn override_text_content(&mut self, node: NodeId, text: &str) {
        self.text_overrides.insert(node, text.to_string());
    }

    /// Assigns an expando property visible through element reflection.
    pub fn set_property(&mut self, node: NodeId, name: &str, value: serde_json::Value) -> Result<()> {
        self.ensure_element(node, "property")?;
        self.properties
            .entry(node)
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Registers a page style rule used for computed style.
    ///
    /// `pseudo_element` targets `::before`-style boxes; pass `None` for the element itself.
    pub fn add_style_rule(
        &mut self,
        selector: &str,
        pseudo_element: Option<&str>,
        declarations: &str,
    ) -> Result<()> {
        let selector = parse_selector_groups(selector)?;
        self.style_rules.push(PageStyleRule {
            selector,
            pseudo_element: pseudo_element.map(style::normalize_pseudo_element),
            declarations: parse_style_declarations(Some(declarations)),
        });
        Ok(())
    }

    pub fn dispatch_input_event(&mut self, event_type: &str) {
        self.last_input_event = Some(InputEvent {
            event_type: event_type.to_string(),
            time_ms: self.now_ms,
        });
    }

    pub fn advance_time(&mut self, ms: u64) {
        self.now_ms = self.now_ms.saturating_add(ms);
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}
