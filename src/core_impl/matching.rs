use super::*;

mod absolute;
mod matcher_arg;
mod relative;

const SCOPE_DIRECT_CHILDREN: &str = ":scope>";
const SCOPE_ANY_CHILDREN: &str = ":scope ";

/// Document plus the text accessor every text match goes through.
pub(crate) struct MatchContext<'a, D: HostDocument> {
    pub(crate) doc: &'a D,
    pub(crate) text_content: TextContentGetter<D>,
}

impl<D: HostDocument> Clone for MatchContext<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: HostDocument> Copy for MatchContext<'_, D> {}

impl<'a, D: HostDocument> MatchContext<'a, D> {
    pub(crate) fn new(doc: &'a D, text_content: TextContentGetter<D>) -> Self {
        Self { doc, text_content }
    }

    /// Context for one-shot selection, reading text through the page-visible accessor.
    pub(crate) fn page_visible(doc: &'a D) -> Self {
        Self::new(doc, D::text_content)
    }

    fn text_of(&self, node: D::Node) -> String {
        (self.text_content)(self.doc, node)
    }

    /// Selects the distinct elements matched by any selector of the `SelectorList` `ast`.
    pub(crate) fn select(&self, ast: &AstNode) -> Result<Vec<D::Node>> {
        let root = self.doc.document_node();
        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for selector in &ast.children {
            for node in self.elements_for_selector(selector, root, None)? {
                if seen.insert(node) {
                    selected.push(node);
                }
            }
        }
        Ok(selected)
    }

    /// Evaluates one `Selector` node from `root`.
    ///
    /// The first child is always a regular selector; `specified` replaces its
    /// text when the caller needs a `:scope`-anchored query.
    pub(crate) fn elements_for_selector(
        &self,
        selector: &AstNode,
        root: D::Node,
        specified: Option<&str>,
    ) -> Result<Vec<D::Node>> {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let mut elements = Vec::new();
            for (index, child) in selector.children.iter().enumerate() {
                if index == 0 {
                    elements = self.by_regular_selector(child, root, specified)?;
                } else if child.is_extended() {
                    elements = self.by_extended_selector(elements, child)?;
                } else if child.is_regular() {
                    elements = self.by_following_regular_selector(&elements, child)?;
                }
            }
            Ok(elements)
        })
    }

    fn by_regular_selector(
        &self,
        regular: &AstNode,
        root: D::Node,
        specified: Option<&str>,
    ) -> Result<Vec<D::Node>> {
        let selector_text = match specified {
            Some(text) => text,
            None => regular.required_value()?,
        };
        self.doc
            .query_selector_all(root, selector_text)
            .map_err(|err| {
                Error::Matching(format!(
                    "Error: unable to select by '{selector_text}' -- {err}"
                ))
            })
    }

    fn by_extended_selector(
        &self,
        elements: Vec<D::Node>,
        extended: &AstNode,
    ) -> Result<Vec<D::Node>> {
        let pseudo_node = extended.first_child()?;
        let name = pseudo_node.pseudo_class().ok_or_else(|| {
            Error::Matching("Extended selector should have a pseudo-class child".into())
        })?;

        if name.is_relative() {
            let list = pseudo_node.first_child().map_err(|_| {
                Error::Matching(format!(
                    "Selector list is missing for :{name}() pseudo-class"
                ))
            })?;
            let mut found = Vec::with_capacity(elements.len());
            for element in elements {
                let matched = match name {
                    PseudoClass::Has | PseudoClass::AbpHas => self.has_relatives(element, list, name)?,
                    PseudoClass::Is => self.is_any_element(element, list, name)?,
                    PseudoClass::Not => self.not_element(element, list, name)?,
                    _ => {
                        return Err(Error::Matching(format!(
                            "Unknown relative pseudo-class: '{name}'"
                        )));
                    }
                };
                if matched {
                    found.push(element);
                }
            }
            return Ok(found);
        }

        let arg = match pseudo_node.value() {
            Some(arg) if !arg.is_empty() => arg,
            _ => {
                return Err(Error::Matching(format!(
                    "Missing arg for :{name}() pseudo-class"
                )));
            }
        };

        match name {
            PseudoClass::NthAncestor => self.nth_ancestors(&elements, arg, name),
            PseudoClass::XPath => {
                self.doc.validate_xpath(arg).map_err(|_| {
                    Error::Matching(format!(
                        "Invalid argument of :{name}() pseudo-class: '{arg}'"
                    ))
                })?;
                self.by_xpath(&elements, arg)
            }
            PseudoClass::Upward => {
                if matcher_arg::js_number(arg).is_some() {
                    self.nth_ancestors(&elements, arg, name)
                } else {
                    self.upward(&elements, arg)
                }
            }
            _ => {
                let mut found = Vec::with_capacity(elements.len());
                for element in elements {
                    if self.is_matched_by_absolute(element, name, arg)? {
                        found.push(element);
                    }
                }
                Ok(found)
            }
        }
    }

    /// Handles a regular selector that follows an extended one, e.g. the
    /// `> .banner` in `div:has(> img) > .banner`.
    fn by_following_regular_selector(
        &self,
        elements: &[D::Node],
        regular: &AstNode,
    ) -> Result<Vec<D::Node>> {
        let value = regular.required_value()?;
        let mut found = Vec::new();
        for &element in elements {
            if value.starts_with('>') {
                let specified = format!(":scope{value}");
                found.extend(self.by_regular_selector(regular, element, Some(&specified))?);
            } else if value.starts_with('+') || value.starts_with('~') {
                // `html` has no parent, which is not an error here
                let Some(parent) = self.doc.parent_element(element) else {
                    continue;
                };
                let specified = format!(
                    "{SCOPE_DIRECT_CHILDREN}{}{value}",
                    self.element_selector_desc(element)
                );
                found.extend(self.by_regular_selector(regular, parent, Some(&specified))?);
            } else {
                let specified = format!("{SCOPE_ANY_CHILDREN}{value}");
                found.extend(self.by_regular_selector(regular, element, Some(&specified))?);
            }
        }
        Ok(found)
    }

    /// `tag[attr="value"]...` description used to re-find `element` among its siblings.
    pub(crate) fn element_selector_desc(&self, element: D::Node) -> String {
        let mut desc = self.doc.tag_name(element);
        for attribute in self.doc.attributes(element) {
            let value = attribute.value.replace('\\', "\\\\").replace('"', "\\\"");
            desc.push_str(&format!("[{}=\"{value}\"]", attribute.name));
        }
        desc
    }
}

/// Selects the elements of `doc` matched by a parsed selector list.
///
/// Text pseudo-classes read the page-visible text content here; an engine
/// instance routes them through the accessor it captured at init instead.
pub fn select_elements_by_ast<D: HostDocument>(doc: &D, ast: &AstNode) -> Result<Vec<D::Node>> {
    MatchContext::page_visible(doc).select(ast)
}
