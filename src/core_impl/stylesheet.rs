use super::parser::parse_cached;
use super::tokenizer::{self, Token};
use super::*;

mod style_block;

pub use style_block::parse_style_block;

pub(crate) const REMOVE_PROPERTY: &str = "remove";
pub(crate) const CONTENT_PROPERTY: &str = "content";
pub(crate) const POSITIVE_VALUE: &str = "true";
const DEBUG_PROPERTY: &str = "debug";
const DEBUG_GLOBAL_VALUE: &str = "global";
const AT_RULE_MARKER: char = '@';
const VALID_REMOVE_MARKER: &str = ":remove()";
const INVALID_REMOVE_MARKER: &str = ":remove(";

const NO_SELECTOR: &str = "Selector should be defined";
const NO_STYLE: &str = "No style declaration found";
const INVALID_STYLE: &str = "Invalid style declaration";
const UNCLOSED_STYLE: &str = "Unclosed style declaration";
const NO_PROPERTY: &str = "Missing style property in declaration";
const NO_VALUE: &str = "Missing style value in declaration";
const NO_STYLE_OR_REMOVE: &str = "Style should be declared or :remove() pseudo-class should used";
const NO_COMMENT: &str = "Comments are not supported";
const INVALID_REMOVE: &str = "Invalid :remove() pseudo-class in selector";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDeclaration {
    pub property: String,
    pub value: String,
}

impl StyleDeclaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Property/value map of a rule, in first-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    declarations: Vec<StyleDeclaration>,
}

impl Style {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|declaration| declaration.property == property)
            .map(|declaration| declaration.value.as_str())
    }

    /// Sets `property`, keeping its position when it is already present.
    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        match self
            .declarations
            .iter_mut()
            .find(|declaration| declaration.property == property)
        {
            Some(existing) => existing.value = value,
            None => self
                .declarations
                .push(StyleDeclaration::new(property, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|declaration| (declaration.property.as_str(), declaration.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Whether the matched elements are deleted instead of styled.
    pub fn is_remove(&self) -> bool {
        self.get(REMOVE_PROPERTY) == Some(POSITIVE_VALUE)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Style {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut style = Style::default();
        for (property, value) in iter {
            style.insert(property, value);
        }
        style
    }
}

/// Value of the `debug` pseudo-property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    /// `debug: true`, timings are collected for this rule.
    Rule,
    /// `debug: global`, timings are collected for every rule.
    Global,
}

impl DebugMode {
    fn from_value(value: &str) -> Option<Self> {
        match value {
            POSITIVE_VALUE => Some(Self::Rule),
            DEBUG_GLOBAL_VALUE => Some(Self::Global),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub ast: AstNode,
    pub style: Option<Style>,
    pub debug: Option<DebugMode>,
}

/// Selector with a trailing `:remove()` stripped off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveSelector {
    pub selector: String,
    /// `remove: true` when the selector ended with `:remove()`, empty otherwise.
    pub styles: Vec<StyleDeclaration>,
}

impl RemoveSelector {
    pub fn should_remove(&self) -> bool {
        !self.styles.is_empty()
    }
}

/// Validates the position of a `:remove()` pseudo-class and strips it off.
pub fn parse_remove_selector(raw_selector: &str) -> Result<RemoveSelector> {
    let Some(first_index) = raw_selector.find(VALID_REMOVE_MARKER) else {
        // e.g. `div:remove(0)`
        if raw_selector.contains(INVALID_REMOVE_MARKER) {
            return Err(Error::SelectorParse(format!(
                "{INVALID_REMOVE}: '{raw_selector}'"
            )));
        }
        return Ok(RemoveSelector {
            selector: raw_selector.to_string(),
            styles: Vec::new(),
        });
    };

    if first_index == 0 {
        return Err(Error::SelectorParse(format!(
            "{NO_SELECTOR} before :remove() pseudo-class: '{raw_selector}'"
        )));
    }
    if raw_selector.rfind(VALID_REMOVE_MARKER) != Some(first_index) {
        return Err(Error::SelectorParse(format!(
            "Pseudo-class :remove() appears more than once in selector: '{raw_selector}'"
        )));
    }
    if first_index + VALID_REMOVE_MARKER.len() < raw_selector.len() {
        // e.g. `.block:remove():upward(2)`
        return Err(Error::SelectorParse(format!(
            "Pseudo-class :remove() should be at the end of selector: '{raw_selector}'"
        )));
    }

    Ok(RemoveSelector {
        selector: raw_selector[..first_index].to_string(),
        styles: vec![StyleDeclaration::new(REMOVE_PROPERTY, POSITIVE_VALUE)],
    })
}

/// Selector candidate cut from a rule or stylesheet in front of a `{`.
struct SelectorPart {
    selector: String,
    ast: Option<AstNode>,
    styles: Vec<StyleDeclaration>,
}

impl SelectorPart {
    fn should_remove(&self) -> bool {
        !self.styles.is_empty()
    }
}

/// Splits off `:remove()` and tries to parse the rest as a selector.
///
/// A selector that fails to parse is not an error here: the `{` it was cut at
/// may belong to a pseudo-class argument.
fn parse_selector_part(selector_buffer: &str) -> Result<SelectorPart> {
    let selector = selector_buffer.trim();
    if selector.starts_with(AT_RULE_MARKER) {
        return Err(Error::StyleParse(format!(
            "At-rules are not supported: '{selector}'."
        )));
    }

    let remove = parse_remove_selector(selector).map_err(|err| {
        log::error!("{err}");
        Error::StyleParse(format!("{INVALID_REMOVE}: '{selector}'"))
    })?;

    let ast = parse_cached(&remove.selector).ok();
    Ok(SelectorPart {
        selector: remove.selector,
        ast,
        styles: remove.styles,
    })
}

/// Parsed rules keyed by selector text, in first-seen order.
#[derive(Default)]
struct RawResults {
    order: Vec<String>,
    entries: HashMap<String, (AstNode, Vec<StyleDeclaration>)>,
}

impl RawResults {
    fn save(&mut self, selector: String, ast: AstNode, styles: Vec<StyleDeclaration>) {
        match self.entries.get_mut(&selector) {
            Some((_, stored)) => stored.extend(styles),
            None => {
                self.order.push(selector.clone());
                self.entries.insert(selector, (ast, styles));
            }
        }
    }

    fn into_rules(mut self) -> Vec<Rule> {
        let mut rules = Vec::with_capacity(self.order.len());
        for selector in self.order {
            if let Some((ast, styles)) = self.entries.remove(&selector) {
                rules.push(prepare_rule(selector, ast, styles));
            }
        }
        rules
    }
}

/// Turns collected declarations into a rule, extracting `debug` and `remove`.
fn prepare_rule(selector: String, ast: AstNode, raw_styles: Vec<StyleDeclaration>) -> Rule {
    let should_remove = raw_styles
        .iter()
        .any(|style| style.property == REMOVE_PROPERTY && style.value == POSITIVE_VALUE);
    let debug_value = raw_styles
        .iter()
        .find(|style| style.property == DEBUG_PROPERTY)
        .map(|style| style.value.clone());

    let mut styles = raw_styles;
    let mut debug = None;
    if let Some(value) = debug_value {
        styles.retain(|style| style.property != DEBUG_PROPERTY);
        debug = DebugMode::from_value(&value);
    }

    let style = if should_remove {
        let mut style = Style::default();
        style.insert(REMOVE_PROPERTY, POSITIVE_VALUE);
        // kept for the before-style-applied hook
        if let Some(content) = styles.iter().find(|style| style.property == CONTENT_PROPERTY) {
            style.insert(CONTENT_PROPERTY, content.value.clone());
        }
        Some(style)
    } else if styles.is_empty() {
        None
    } else {
        Some(
            styles
                .into_iter()
                .map(|style| (style.property, style.value))
                .collect(),
        )
    };

    Rule {
        selector,
        ast,
        style,
        debug,
    }
}

fn has_comment(css: &str) -> bool {
    css.contains("/*") && css.contains("*/")
}

/// Parses a single `selector { style }` rule, or a bare `selector:remove()`.
///
/// The selector is cut at the last `{` first; when that does not parse, the
/// previous `{` is tried, so braces inside pseudo-class arguments survive.
pub fn parse_rule(raw_rule: &str) -> Result<Rule> {
    let (selector, ast, styles) = parse_raw_rule(raw_rule)?;
    Ok(prepare_rule(selector, ast, styles))
}

fn parse_raw_rule(raw_rule: &str) -> Result<(String, AstNode, Vec<StyleDeclaration>)> {
    let rule = raw_rule.trim();
    if has_comment(rule) {
        return Err(Error::StyleParse(NO_COMMENT.into()));
    }

    let brace_indexes = rule
        .match_indices('{')
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    if brace_indexes.first() == Some(&0) {
        return Err(Error::StyleParse(NO_SELECTOR.into()));
    }
    let has_closing = rule.contains('}');
    if !brace_indexes.is_empty() && !has_closing {
        return Err(Error::StyleParse(format!("{NO_STYLE} OR {UNCLOSED_STYLE}")));
    }

    if brace_indexes.is_empty() {
        // e.g. `div:remove()`; a bare `div` has nothing to apply
        let part = parse_selector_part(rule)?;
        let Some(ast) = part.ast else {
            return Err(Error::StyleParse("Invalid selector".into()));
        };
        if part.styles.is_empty() {
            return Err(Error::StyleParse(NO_STYLE_OR_REMOVE.into()));
        }
        return Ok((part.selector.trim().to_string(), ast, part.styles));
    }

    let block_end = rule
        .char_indices()
        .last()
        .map(|(index, _)| index)
        .unwrap_or_default();
    for &index in brace_indexes.iter().rev() {
        let part = parse_selector_part(&rule[..index])?;
        let Some(ast) = part.ast else {
            continue;
        };
        let style_block = rule.get(index + 1..block_end).unwrap_or_default();
        let mut styles = part.styles;
        styles.extend(parse_style_block(style_block)?);
        return Ok((part.selector.trim().to_string(), ast, styles));
    }

    Err(Error::StyleParse("Selector is not valid".into()))
}

/// Parses a list of rules; invalid ones are logged and skipped.
///
/// Rules are trimmed and de-duplicated first, and styles of rules with the
/// same selector are merged.
pub fn parse_rules<S: AsRef<str>>(raw_rules: &[S]) -> Vec<Rule> {
    let mut seen = HashSet::new();
    let mut results = RawResults::default();
    let mut warnings = Vec::new();

    for raw_rule in raw_rules {
        let rule = raw_rule.as_ref().trim();
        if !seen.insert(rule) {
            continue;
        }
        match parse_raw_rule(rule) {
            Ok((selector, ast, styles)) => results.save(selector, ast, styles),
            Err(err) => warnings.push(format!("'{rule}' - error: '{err}'")),
        }
    }

    if !warnings.is_empty() {
        log::info!("Invalid rules:\n  {}", warnings.join("\n  "));
    }
    results.into_rules()
}

/// Parses a whole stylesheet of `selector { style }` rules.
///
/// Any malformed rule fails the whole stylesheet.
pub fn parse_stylesheet(raw_stylesheet: &str) -> Result<Vec<Rule>> {
    let stylesheet = raw_stylesheet.trim();
    if has_comment(stylesheet) {
        return Err(Error::StyleParse(format!(
            "{NO_COMMENT} in stylesheet: '{stylesheet}'"
        )));
    }

    let mut results = RawResults::default();
    let mut rest = stylesheet;
    let mut selector_buffer = String::new();

    while !rest.is_empty() {
        let next_index = rest.find('{');
        if selector_buffer.is_empty() && next_index == Some(0) {
            return Err(Error::StyleParse(format!(
                "{NO_SELECTOR} before style declaration in stylesheet: '{rest}'"
            )));
        }

        let Some(index) = next_index else {
            // last rule without a style block, only valid with `:remove()`
            selector_buffer.push_str(rest);
            let part = parse_selector_part(&selector_buffer)?;
            if !part.should_remove() {
                return Err(Error::StyleParse(format!(
                    "{NO_STYLE_OR_REMOVE}: '{rest}'"
                )));
            }
            let Some(ast) = part.ast else {
                return Err(Error::StyleParse(format!(
                    "Invalid selector in stylesheet: '{}'",
                    selector_buffer.trim()
                )));
            };
            results.save(part.selector.trim().to_string(), ast, part.styles);
            break;
        };

        selector_buffer.push_str(&rest[..index]);
        let part = parse_selector_part(&selector_buffer)?;
        rest = &rest[index + 1..];
        let Some(ast) = part.ast else {
            // the `{` belongs to the selector, e.g. `div:contains({)`
            selector_buffer.push('{');
            continue;
        };

        selector_buffer.clear();
        let (styles, remaining) = parse_next_style(rest)?;
        let mut rule_styles = part.styles;
        rule_styles.extend(styles);
        results.save(part.selector.trim().to_string(), ast, rule_styles);
        rest = remaining;
    }

    Ok(results.into_rules())
}

/// Parses declarations up to the closing `}` and returns them with the
/// stylesheet text that follows.
fn parse_next_style(css: &str) -> Result<(Vec<StyleDeclaration>, &str)> {
    let mut styles = Vec::new();
    let mut rest = css;

    loop {
        let Some((position, divider)) = rest
            .char_indices()
            .find(|(_, ch)| matches!(ch, ';' | ':' | '}'))
        else {
            return Err(Error::StyleParse(format!("{INVALID_STYLE}: '{rest}'")));
        };

        match divider {
            '}' => {
                if !rest[..position].trim().is_empty() {
                    // e.g. `visible` in `{ display: none; visible }`
                    return Err(Error::StyleParse(format!("{INVALID_STYLE}: '{rest}'")));
                }
                if styles.is_empty() {
                    return Err(Error::StyleParse(format!("{NO_STYLE}: '{rest}'")));
                }
                return Ok((styles, rest[position + 1..].trim_start()));
            }
            ':' => {
                let Some((end, terminator)) = find_declaration_end(rest, position + 1) else {
                    return Err(Error::StyleParse(format!("{UNCLOSED_STYLE}: '{rest}'")));
                };
                let property = rest[..position].trim();
                if property.is_empty() {
                    return Err(Error::StyleParse(format!("{NO_PROPERTY}: '{rest}'")));
                }
                let value = rest[position + 1..end].trim();
                if value.is_empty() {
                    return Err(Error::StyleParse(format!("{NO_VALUE}: '{rest}'")));
                }
                styles.push(StyleDeclaration::new(property, value));
                if terminator == '}' {
                    return Ok((styles, rest[end + 1..].trim_start()));
                }
                rest = &rest[end + 1..];
            }
            _ => rest = &rest[position + 1..],
        }
    }
}

/// Finds the `;` or `}` ending a declaration value, skipping quoted text.
fn find_declaration_end(css: &str, from: usize) -> Option<(usize, char)> {
    let tokens = tokenizer::tokenize(&css[from..], |ch| {
        matches!(ch, ';' | '}' | '\'' | '"' | '\\')
    });
    let mut offset = from;
    let mut quote: Option<&str> = None;
    let mut escaped = false;
    for Token { value, .. } in &tokens {
        match value.as_str() {
            ";" | "}" if quote.is_none() => {
                let terminator = if value == ";" { ';' } else { '}' };
                return Some((offset, terminator));
            }
            mark @ ("'" | "\"") if !escaped => match quote {
                None => quote = Some(mark),
                Some(open) if open == mark => quote = None,
                Some(_) => {}
            },
            _ => {}
        }
        escaped = value == "\\" && !escaped;
        offset += value.len();
    }
    None
}
