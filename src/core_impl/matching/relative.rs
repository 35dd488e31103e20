use super::*;

impl<D: HostDocument> MatchContext<'_, D> {
    fn first_inner_regular<'n>(selector: &'n AstNode, name: PseudoClass) -> Result<&'n str> {
        selector
            .children
            .first()
            .filter(|child| child.is_regular())
            .and_then(AstNode::value)
            .ok_or_else(|| {
                Error::Matching(format!(
                    "RegularSelector is missing for :{name}() pseudo-class"
                ))
            })
    }

    /// `:has()`: every selector of `list` must find something relative to `element`.
    pub(super) fn has_relatives(
        &self,
        element: D::Node,
        list: &AstNode,
        name: PseudoClass,
    ) -> Result<bool> {
        for selector in &list.children {
            let regular = Self::first_inner_regular(selector, name)?;
            let (root, specified) = if regular.starts_with('+') || regular.starts_with('~') {
                (
                    self.doc.parent_element(element),
                    format!(
                        "{SCOPE_DIRECT_CHILDREN}{}{regular}",
                        self.element_selector_desc(element)
                    ),
                )
            } else if regular == "*" {
                (Some(element), format!("{SCOPE_ANY_CHILDREN}*"))
            } else {
                (Some(element), format!("{SCOPE_ANY_CHILDREN}{regular}"))
            };

            let root = root.ok_or_else(|| {
                Error::Matching(format!(
                    "Selection by :{name}() pseudo-class is not possible"
                ))
            })?;

            let relatives = self
                .elements_for_selector(selector, root, Some(&specified))
                .map_err(|err| {
                    log::error!("{err}");
                    Error::Matching(format!(
                        "Invalid selector for :{name}() pseudo-class: '{regular}'"
                    ))
                })?;
            if relatives.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `:is()`: any selector of `list` re-selects `element` among its parent's children.
    ///
    /// Invalid selectors count as a non-match.
    pub(super) fn is_any_element(
        &self,
        element: D::Node,
        list: &AstNode,
        name: PseudoClass,
    ) -> Result<bool> {
        for selector in &list.children {
            let regular = Self::first_inner_regular(selector, name)?;
            let root = self.parent_or_error(element, name)?;
            let specified = format!("{SCOPE_DIRECT_CHILDREN}{regular}");
            let Ok(any) = self.elements_for_selector(selector, root, Some(&specified)) else {
                continue;
            };
            if any.contains(&element) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `:not()`: no selector of `list` may re-select `element`.
    pub(super) fn not_element(
        &self,
        element: D::Node,
        list: &AstNode,
        name: PseudoClass,
    ) -> Result<bool> {
        for selector in &list.children {
            let regular = Self::first_inner_regular(selector, name)?;
            let root = self.parent_or_error(element, name)?;
            let specified = format!("{SCOPE_DIRECT_CHILDREN}{regular}");
            let any = self
                .elements_for_selector(selector, root, Some(&specified))
                .map_err(|err| {
                    log::error!("{err}");
                    Error::Matching(format!(
                        "Invalid selector for :{name}() pseudo-class: '{regular}'"
                    ))
                })?;
            if any.contains(&element) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn parent_or_error(&self, element: D::Node, name: PseudoClass) -> Result<D::Node> {
        self.doc.parent_element(element).ok_or_else(|| {
            Error::Matching(format!(
                "Selection by :{name}() pseudo-class is not possible"
            ))
        })
    }
}
