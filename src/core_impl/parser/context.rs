use super::*;

/// Mutable parser state: the AST under construction plus the path to the node
/// currently receiving tokens, and the bracket bookkeeping for pseudo-classes.
#[derive(Debug, Default)]
pub(super) struct ParserContext {
    pub(super) ast: Option<AstNode>,
    // Child indices from the root to the buffer node.
    path: Vec<usize>,
    pub(super) extended_names: Vec<String>,
    pub(super) extended_brackets: usize,
    pub(super) standard_names: Vec<String>,
    pub(super) standard_brackets: usize,
    pub(super) attribute_open: bool,
    pub(super) attribute_buffer: String,
    pub(super) regexp_open: bool,
    pub(super) should_optimize: bool,
}

impl ParserContext {
    fn node_at_depth(&self, depth: usize) -> Option<&AstNode> {
        let mut node = self.ast.as_ref()?;
        for &index in self.path.get(..depth)? {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    pub(super) fn buffer(&self) -> Option<&AstNode> {
        self.node_at_depth(self.path.len())
    }

    fn buffer_mut(&mut self) -> Option<&mut AstNode> {
        let mut node = self.ast.as_mut()?;
        for &index in &self.path {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    pub(super) fn buffer_type(&self) -> Option<NodeType> {
        self.buffer().map(AstNode::node_type)
    }

    fn buffer_parent_type(&self) -> Option<NodeType> {
        let depth = self.path.len().checked_sub(1)?;
        self.node_at_depth(depth).map(AstNode::node_type)
    }

    /// Name of the pseudo-class when the buffer is an absolute pseudo-class node.
    pub(super) fn buffer_pseudo_name(&self) -> Option<PseudoClass> {
        self.buffer().and_then(AstNode::pseudo_class)
    }

    pub(super) fn buffer_value(&self) -> String {
        self.buffer()
            .and_then(AstNode::value)
            .unwrap_or_default()
            .to_string()
    }

    /// Appends `kind` to the buffer node's children and makes it the new buffer.
    pub(super) fn add_node(&mut self, kind: NodeKind) -> Result<()> {
        let buffer = self
            .buffer_mut()
            .ok_or_else(|| Error::SelectorParse("No buffer node".into()))?;
        buffer.children.push(AstNode::new(kind));
        let index = buffer.children.len() - 1;
        self.path.push(index);
        Ok(())
    }

    pub(super) fn add_regular(&mut self, value: &str) -> Result<()> {
        self.add_node(NodeKind::RegularSelector {
            value: value.to_string(),
        })
    }

    pub(super) fn init_ast(&mut self, value: &str) -> Result<()> {
        self.ast = Some(AstNode::new(NodeKind::SelectorList));
        self.path.clear();
        self.add_node(NodeKind::Selector)?;
        self.add_regular(value)
    }

    pub(super) fn init_relative_subtree(&mut self, value: &str) -> Result<()> {
        self.add_node(NodeKind::SelectorList)?;
        self.add_node(NodeKind::Selector)?;
        self.add_regular(value)
    }

    /// Moves the buffer up to the closest node of type `target`, if there is one.
    pub(super) fn up_to_closest(&mut self, target: NodeType) {
        for depth in (0..=self.path.len()).rev() {
            if self.node_at_depth(depth).map(AstNode::node_type) == Some(target) {
                self.path.truncate(depth);
                break;
            }
        }
    }

    /// Appends token text to the buffer node's value.
    pub(super) fn update_buffer(&mut self, token: &str) -> Result<()> {
        let attribute_open = self.attribute_open;
        let buffer = self
            .buffer_mut()
            .ok_or_else(|| Error::SelectorParse("No bufferNode to update".into()))?;
        let is_regular = buffer.is_regular();
        let Some(value) = buffer.value_mut() else {
            return Err(Error::SelectorParse(
                "Only RegularSelector and AbsolutePseudoClass nodes can be updated".into(),
            ));
        };
        value.push_str(token);
        if is_regular && attribute_open {
            self.attribute_buffer.push_str(token);
        }
        Ok(())
    }

    /// Makes the last regular selector child of the buffer selector node the new buffer.
    pub(super) fn push_last_regular(&mut self) -> Result<()> {
        let selector = self
            .buffer()
            .ok_or_else(|| Error::SelectorParse("No bufferNode found".into()))?;
        if !selector.is_selector() {
            return Err(Error::SelectorParse("Unsupported bufferNode type".into()));
        }
        let index = selector
            .children
            .iter()
            .rposition(AstNode::is_regular)
            .ok_or_else(|| Error::SelectorParse("No RegularSelector node found".into()))?;
        self.path.push(index);
        Ok(())
    }

    /// Finds where parsing continues after a complex part of the selector, e.g. the
    /// `.banner` in `div:has(img).banner` or the `>` in `div:contains(a > b)`.
    pub(super) fn updated_buffer(&mut self) -> Result<Option<NodeType>> {
        if self.buffer_type() == Some(NodeType::SelectorList)
            && self.buffer_parent_type() == Some(NodeType::RelativePseudoClass)
        {
            return Ok(self.buffer_type());
        }

        self.up_to_closest(NodeType::Selector);
        let selector = self.buffer().ok_or_else(|| {
            Error::SelectorParse(
                "No SelectorNode, impossible to continue selector parsing by ExtendedCss".into(),
            )
        })?;

        let last = selector.children.last();
        let has_extended = last.is_some_and(AstNode::is_extended) && self.standard_brackets == 0;
        if has_extended {
            let last_index = selector.children.len() - 1;
            let pseudo = last
                .and_then(|extended| extended.children.first())
                .and_then(AstNode::pseudo_class);
            if let Some(name) = pseudo {
                let has_relative = name.is_relative()
                    && self.extended_brackets > 0
                    && self.extended_brackets == self.extended_names.len();
                let has_absolute = name.is_absolute()
                    && self.extended_names.last().map(String::as_str) == Some(name.name());
                if has_relative || has_absolute {
                    self.path.push(last_index);
                    self.path.push(0);
                }
            }
        } else {
            self.push_last_regular()?;
        }
        Ok(self.buffer_type())
    }
}
