use super::*;

impl Dom {
    /// Element bound to `:scope` when querying from `root`.
    pub(crate) fn scope_for(&self, root: NodeId) -> Option<NodeId> {
        if root == self.root {
            self.document_element()
        } else {
            Some(root)
        }
    }

    pub(crate) fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let scope = self.scope_for(root);

        let mut ids = Vec::new();
        self.collect_elements_descendants_dfs(root, &mut ids);

        Ok(ids
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|steps| self.matches_selector_chain(*candidate, steps, scope))
            })
            .collect())
    }

    pub(crate) fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(node_id).filter(|node| self.element(*node).is_some());
        while let Some(current) = cursor {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(current, steps, Some(node_id)))
            {
                return Ok(Some(current));
            }
            cursor = self.parent_element(current);
        }
        Ok(None)
    }

    pub(crate) fn matches_selector_chain(
        &self,
        node_id: NodeId,
        steps: &[SelectorPart],
        scope: Option<NodeId>,
    ) -> bool {
        let Some((last, rest)) = steps.split_last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step, scope) {
            return false;
        }
        let Some(combinator) = last.combinator else {
            return true;
        };
        self.matches_combinator(node_id, combinator, rest, scope)
    }

    // Backtracks so `a b > c` tries every `a` ancestor, not just the nearest.
    fn matches_combinator(
        &self,
        node_id: NodeId,
        combinator: SelectorCombinator,
        rest: &[SelectorPart],
        scope: Option<NodeId>,
    ) -> bool {
        match combinator {
            SelectorCombinator::Child => self
                .parent_element(node_id)
                .is_some_and(|parent| self.matches_selector_chain(parent, rest, scope)),
            SelectorCombinator::Descendant => {
                let mut cursor = self.parent_element(node_id);
                while let Some(parent) = cursor {
                    if self.matches_selector_chain(parent, rest, scope) {
                        return true;
                    }
                    cursor = self.parent_element(parent);
                }
                false
            }
            SelectorCombinator::AdjacentSibling => self
                .previous_element_sibling(node_id)
                .is_some_and(|sibling| self.matches_selector_chain(sibling, rest, scope)),
            SelectorCombinator::GeneralSibling => {
                let mut cursor = self.previous_element_sibling(node_id);
                while let Some(sibling) = cursor {
                    if self.matches_selector_chain(sibling, rest, scope) {
                        return true;
                    }
                    cursor = self.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    pub(crate) fn matches_step(
        &self,
        node_id: NodeId,
        step: &SelectorStep,
        scope: Option<NodeId>,
    ) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };

        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &step.id {
            if element.attr("id") != Some(id.as_str()) {
                return false;
            }
        }

        if step
            .classes
            .iter()
            .any(|class_name| !element.has_class(class_name))
        {
            return false;
        }

        if !step
            .attrs
            .iter()
            .all(|cond| Self::matches_attr_condition(element, cond))
        {
            return false;
        }

        step.pseudo_classes
            .iter()
            .all(|pseudo| self.matches_pseudo_class(node_id, pseudo, scope))
    }

    fn matches_attr_condition(element: &Element, cond: &SelectorAttrCondition) -> bool {
        match cond {
            SelectorAttrCondition::Exists { key } => element.has_attr(key),
            SelectorAttrCondition::Value {
                key,
                op,
                value,
                case_insensitive,
            } => element.attr(key).is_some_and(|actual| {
                if *case_insensitive {
                    op.matches(&actual.to_lowercase(), &value.to_lowercase())
                } else {
                    op.matches(actual, value)
                }
            }),
        }
    }

    fn matches_pseudo_class(
        &self,
        node_id: NodeId,
        pseudo: &SelectorPseudoClass,
        scope: Option<NodeId>,
    ) -> bool {
        match pseudo {
            SelectorPseudoClass::Scope => scope == Some(node_id),
            SelectorPseudoClass::Root => self.document_element() == Some(node_id),
            SelectorPseudoClass::FirstChild => self.previous_element_sibling(node_id).is_none(),
            SelectorPseudoClass::LastChild => self.next_element_sibling(node_id).is_none(),
            SelectorPseudoClass::OnlyChild => {
                self.previous_element_sibling(node_id).is_none()
                    && self.next_element_sibling(node_id).is_none()
            }
            SelectorPseudoClass::FirstOfType => self.position_of_type(node_id, false) == Some(1),
            SelectorPseudoClass::LastOfType => self.position_of_type(node_id, true) == Some(1),
            SelectorPseudoClass::OnlyOfType => {
                self.position_of_type(node_id, false) == Some(1)
                    && self.position_of_type(node_id, true) == Some(1)
            }
            SelectorPseudoClass::Empty => self.children(node_id).iter().all(|child| {
                matches!(
                    self.node(*child).map(|n| &n.node_type),
                    Some(NodeType::Comment(_))
                )
            }),
            SelectorPseudoClass::NthChild(selector) => {
                self.nth_matches(self.position(node_id, false), selector)
            }
            SelectorPseudoClass::NthLastChild(selector) => {
                self.nth_matches(self.position(node_id, true), selector)
            }
            SelectorPseudoClass::NthOfType(selector) => {
                self.nth_matches(self.position_of_type(node_id, false), selector)
            }
            SelectorPseudoClass::NthLastOfType(selector) => {
                self.nth_matches(self.position_of_type(node_id, true), selector)
            }
            SelectorPseudoClass::Is(inners) | SelectorPseudoClass::Where(inners) => inners
                .iter()
                .any(|inner| self.matches_selector_chain(node_id, inner, scope)),
            SelectorPseudoClass::Not(inners) => !inners
                .iter()
                .any(|inner| self.matches_selector_chain(node_id, inner, scope)),
        }
    }

    fn nth_matches(&self, position: Option<usize>, selector: &NthChildSelector) -> bool {
        position.is_some_and(|position| selector.matches(position))
    }

    /// 1-based position among element siblings, counted from the end when `from_last`.
    pub(crate) fn position(&self, node_id: NodeId, from_last: bool) -> Option<usize> {
        self.sibling_position(node_id, from_last, |_| true)
    }

    /// 1-based position among element siblings with the same tag name.
    pub(crate) fn position_of_type(&self, node_id: NodeId, from_last: bool) -> Option<usize> {
        let tag_name = self.tag_name(node_id)?;
        self.sibling_position(node_id, from_last, |element| element.tag_name == tag_name)
    }

    fn sibling_position(
        &self,
        node_id: NodeId,
        from_last: bool,
        counts: impl Fn(&Element) -> bool,
    ) -> Option<usize> {
        let parent = self.parent(node_id)?;
        let children = self.children(parent);
        let mut index = 0usize;
        let ordered: Box<dyn Iterator<Item = &NodeId>> = if from_last {
            Box::new(children.iter().rev())
        } else {
            Box::new(children.iter())
        };
        for child in ordered {
            let Some(element) = self.element(*child) else {
                continue;
            };
            if !counts(element) {
                continue;
            }
            index += 1;
            if *child == node_id {
                return Some(index);
            }
        }
        None
    }
}
