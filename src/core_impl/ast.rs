use super::*;

/// Extended pseudo-classes understood by the engine.
///
/// Absolute pseudo-classes take a plain string argument; relative ones take a
/// selector list that is parsed into its own subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    Contains,
    HasText,
    AbpContains,
    MatchesCss,
    MatchesCssBefore,
    MatchesCssAfter,
    MatchesAttr,
    MatchesProperty,
    XPath,
    NthAncestor,
    Upward,
    Has,
    AbpHas,
    Is,
    Not,
}

impl PseudoClass {
    pub const ALL: [PseudoClass; 15] = [
        Self::Contains,
        Self::HasText,
        Self::AbpContains,
        Self::MatchesCss,
        Self::MatchesCssBefore,
        Self::MatchesCssAfter,
        Self::MatchesAttr,
        Self::MatchesProperty,
        Self::XPath,
        Self::NthAncestor,
        Self::Upward,
        Self::Has,
        Self::AbpHas,
        Self::Is,
        Self::Not,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pseudo| pseudo.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::HasText => "has-text",
            Self::AbpContains => "-abp-contains",
            Self::MatchesCss => "matches-css",
            Self::MatchesCssBefore => "matches-css-before",
            Self::MatchesCssAfter => "matches-css-after",
            Self::MatchesAttr => "matches-attr",
            Self::MatchesProperty => "matches-property",
            Self::XPath => "xpath",
            Self::NthAncestor => "nth-ancestor",
            Self::Upward => "upward",
            Self::Has => "has",
            Self::AbpHas => "-abp-has",
            Self::Is => "is",
            Self::Not => "not",
        }
    }

    pub fn is_absolute(self) -> bool {
        !self.is_relative()
    }

    pub fn is_relative(self) -> bool {
        matches!(self, Self::Has | Self::AbpHas | Self::Is | Self::Not)
    }

    /// `:contains()` and its aliases, whose argument may hold a bare regexp.
    pub(crate) fn is_text_matching(self) -> bool {
        matches!(self, Self::Contains | Self::HasText | Self::AbpContains)
    }

    pub(crate) fn is_has(self) -> bool {
        matches!(self, Self::Has | Self::AbpHas)
    }

    /// `:is()` and `:not()` with plain-CSS arguments can be folded into the standard selector.
    pub(crate) fn is_optimizable(self) -> bool {
        matches!(self, Self::Is | Self::Not)
    }
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    SelectorList,
    Selector,
    RegularSelector { value: String },
    ExtendedSelector,
    AbsolutePseudoClass { name: PseudoClass, value: String },
    RelativePseudoClass { name: PseudoClass },
}

/// Discriminant of [`NodeKind`], used when walking the parser's buffer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeType {
    SelectorList,
    Selector,
    RegularSelector,
    ExtendedSelector,
    AbsolutePseudoClass,
    RelativePseudoClass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub(crate) fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::SelectorList => NodeType::SelectorList,
            NodeKind::Selector => NodeType::Selector,
            NodeKind::RegularSelector { .. } => NodeType::RegularSelector,
            NodeKind::ExtendedSelector => NodeType::ExtendedSelector,
            NodeKind::AbsolutePseudoClass { .. } => NodeType::AbsolutePseudoClass,
            NodeKind::RelativePseudoClass { .. } => NodeType::RelativePseudoClass,
        }
    }

    pub fn is_selector_list(&self) -> bool {
        matches!(self.kind, NodeKind::SelectorList)
    }

    pub fn is_selector(&self) -> bool {
        matches!(self.kind, NodeKind::Selector)
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.kind, NodeKind::RegularSelector { .. })
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.kind, NodeKind::ExtendedSelector)
    }

    /// Text of a regular selector or the argument of an absolute pseudo-class.
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::RegularSelector { value } | NodeKind::AbsolutePseudoClass { value, .. } => {
                Some(value.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            NodeKind::RegularSelector { value } | NodeKind::AbsolutePseudoClass { value, .. } => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Value that must be non-empty to be evaluated.
    pub(crate) fn required_value(&self) -> Result<&str> {
        match self.value() {
            Some(value) if !value.is_empty() => Ok(value),
            Some(_) => Err(Error::SelectorParse(
                "Ast RegularSelector ot AbsolutePseudoClass node should have a value".into(),
            )),
            None => Err(Error::SelectorParse(
                "Only RegularSelector ot AbsolutePseudoClass node can have a value".into(),
            )),
        }
    }

    pub fn pseudo_class(&self) -> Option<PseudoClass> {
        match self.kind {
            NodeKind::AbsolutePseudoClass { name, .. } | NodeKind::RelativePseudoClass { name } => {
                Some(name)
            }
            _ => None,
        }
    }

    pub(crate) fn first_child(&self) -> Result<&AstNode> {
        self.children
            .first()
            .ok_or_else(|| Error::SelectorParse("Node should have children".into()))
    }

    /// The single child of an extended selector or relative pseudo-class.
    pub(crate) fn only_child(&self, error: &str) -> Result<&AstNode> {
        if self.children.len() != 1 {
            return Err(Error::SelectorParse(error.into()));
        }
        self.first_child()
    }

    /// Renders a selector list whose selectors hold one regular child each as `a, b`.
    pub(crate) fn regular_list_to_string(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.children.len());
        for selector in &self.children {
            let regular = selector.only_child("Selector node should have exact one child")?;
            if !regular.is_regular() {
                return Err(Error::SelectorParse(
                    "Selector should have only one RegularSelector child".into(),
                ));
            }
            parts.push(regular.required_value()?.to_string());
        }
        Ok(parts.join(", "))
    }
}
