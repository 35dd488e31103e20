use super::*;

/// Node and rules handed to the `before_style_applied` hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTarget<N> {
    pub node: N,
    pub rules: Vec<Rule>,
}

/// Hook that may rewrite a [`StyleTarget`] right before its styles are applied.
/// Returning `None` fails the apply pass.
pub type BeforeStyleApplied<N> = Box<dyn FnMut(StyleTarget<N>) -> Option<StyleTarget<N>>>;

/// Engine configuration.
///
/// At least one of [`style_sheet`](Self::style_sheet) and
/// [`css_rules`](Self::css_rules) must be set; when both are, their rules are merged.
pub struct Configuration<N> {
    pub(super) style_sheet: Option<String>,
    pub(super) css_rules: Option<Vec<String>>,
    pub(super) debug: bool,
    pub(super) before_style_applied: Option<BeforeStyleApplied<N>>,
}

impl<N> Default for Configuration<N> {
    fn default() -> Self {
        Self {
            style_sheet: None,
            css_rules: None,
            debug: false,
            before_style_applied: None,
        }
    }
}

impl<N> fmt::Debug for Configuration<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("style_sheet", &self.style_sheet)
            .field("css_rules", &self.css_rules)
            .field("debug", &self.debug)
            .field("before_style_applied", &self.before_style_applied.is_some())
            .finish()
    }
}

impl<N> Configuration<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style_sheet(mut self, style_sheet: impl Into<String>) -> Self {
        self.style_sheet = Some(style_sheet.into());
        self
    }

    pub fn css_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.css_rules = Some(rules.into_iter().map(Into::into).collect());
        self
    }

    /// Collects timing statistics for every rule.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn before_style_applied<F>(mut self, hook: F) -> Self
    where
        F: FnMut(StyleTarget<N>) -> Option<StyleTarget<N>> + 'static,
    {
        self.before_style_applied = Some(Box::new(hook));
        self
    }

    /// Parses the configured rule sources.
    ///
    /// A stylesheet that fails to parse fails as a whole; invalid entries of
    /// `css_rules` are logged and skipped.
    pub(super) fn parse_rules(&self) -> Result<Vec<Rule>> {
        let style_sheet = self.style_sheet.as_deref().filter(|text| !text.is_empty());
        if style_sheet.is_none() && self.css_rules.is_none() {
            return Err(Error::Configuration(
                "ExtendedCss configuration should have 'styleSheet' or 'cssRules' defined.".into(),
            ));
        }

        let mut rules = Vec::new();
        if let Some(style_sheet) = style_sheet {
            let parsed = parse_stylesheet(style_sheet).map_err(|err| {
                Error::Configuration(format!(
                    "Pass the rules as configuration.cssRules since configuration.styleSheet cannot be parsed because of: '{err}'"
                ))
            })?;
            rules.extend(parsed);
        }
        if let Some(css_rules) = &self.css_rules {
            rules.extend(parse_rules(css_rules.as_slice()));
        }
        Ok(rules)
    }
}
