use super::ast::NodeType;
use super::tokenizer::{self, Token, is_combinator, is_white_space_char};
use super::*;

use std::cell::RefCell;

mod attribute;
mod context;
mod optimizer;

use attribute::{is_attribute_closing, is_attribute_opening, is_regexp_opening};
use context::ParserContext;

/// Selecting root for a selector that starts with a bare `:xpath()`.
const XPATH_SELECTING_ROOT: &str = "body";
const REMOVE_PSEUDO_MARKER: &str = "remove";
const NO_WHITESPACE_ERROR_PREFIX: &str =
    "No white space is allowed before or after extended pseudo-class name in selector";

/// Pseudo-elements after which `:has()` is rejected, and which `:matches-css()` accepts
/// as its first argument.
pub(crate) const REGULAR_PSEUDO_ELEMENTS: [&str; 16] = [
    "after",
    "backdrop",
    "before",
    "cue",
    "cue-region",
    "first-letter",
    "first-line",
    "file-selector-button",
    "grammar-error",
    "marker",
    "part",
    "placeholder",
    "selection",
    "slotted",
    "spelling-error",
    "target-text",
];

thread_local! {
    static AST_CACHE: RefCell<HashMap<String, AstNode>> = RefCell::new(HashMap::new());
}

/// Parses selector text, reusing a previously parsed AST for the same text.
pub(crate) fn parse_cached(selector: &str) -> Result<AstNode> {
    if let Some(ast) = AST_CACHE.with(|cache| cache.borrow().get(selector).cloned()) {
        return Ok(ast);
    }
    let ast = parse(selector)?;
    AST_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert(selector.to_string(), ast.clone());
    });
    Ok(ast)
}

fn invalid_selector(selector: &str) -> Error {
    Error::SelectorParse(format!("'{selector}' is not a valid selector"))
}

fn is_supported_pseudo(name: &str) -> bool {
    PseudoClass::from_name(&name.to_lowercase()).is_some()
}

/// Tokens around the one being parsed.
struct Window<'a> {
    prev_prev: Option<&'a str>,
    prev: Option<&'a Token>,
    next: Option<&'a Token>,
    next_next: Option<&'a str>,
}

impl<'a> Window<'a> {
    fn at(tokens: &'a [Token], index: usize) -> Self {
        let value = |offset: Option<usize>| {
            offset
                .and_then(|i| tokens.get(i))
                .map(|token| token.value.as_str())
        };
        Self {
            prev_prev: value(index.checked_sub(2)),
            prev: index.checked_sub(1).and_then(|i| tokens.get(i)),
            next: tokens.get(index + 1),
            next_next: value(index.checked_add(2)),
        }
    }

    fn prev_value(&self) -> Option<&'a str> {
        self.prev.map(|token| token.value.as_str())
    }

    fn next_value(&self) -> Option<&'a str> {
        self.next.map(|token| token.value.as_str())
    }
}

/// Parses an extended selector into an AST rooted at a selector list.
pub fn parse(selector: &str) -> Result<AstNode> {
    let tokens = tokenizer::tokenize_selector(selector)?;
    let mut context = ParserContext::default();

    for (index, token) in tokens.iter().enumerate() {
        let window = Window::at(&tokens, index);
        if token.is_word() {
            parse_word(&mut context, selector, &token.value, &window)?;
            continue;
        }
        match token.value.as_str() {
            "," => parse_comma(&mut context, selector, &window)?,
            " " => parse_space(&mut context, selector, &window)?,
            ">" | "+" | "~" | ";" | "/" | "\\" | "'" | "\"" | "^" | "$" | "{" | "}" | "*" | "#"
            | "." | "[" => parse_mark(&mut context, selector, &token.value, &window)?,
            "]" => parse_closing_square_bracket(&mut context, selector, &window)?,
            ":" => parse_colon(&mut context, selector, &window)?,
            "(" => parse_opening_parenthesis(&mut context)?,
            ")" => parse_closing_parenthesis(&mut context, &window)?,
            "\t" => {
                if context.buffer_type() == Some(NodeType::RegularSelector)
                    && context.attribute_open
                {
                    context.update_buffer("\t")?;
                } else {
                    return Err(invalid_selector(selector));
                }
            }
            // line feed, form feed and carriage return are only valid when trimmed away
            _ => return Err(invalid_selector(selector)),
        }
    }

    let ast = context.ast.take().ok_or_else(|| invalid_selector(selector))?;
    if !context.extended_names.is_empty() || context.extended_brackets > 0 {
        return Err(Error::SelectorParse(format!(
            "Unbalanced brackets for extended pseudo-class: '{}'",
            context.extended_names.last().map(String::as_str).unwrap_or_default()
        )));
    }
    if context.attribute_open {
        return Err(Error::SelectorParse(format!(
            "Unbalanced attribute brackets in selector: '{selector}'"
        )));
    }

    if context.should_optimize {
        optimizer::optimize_ast(ast)
    } else {
        Ok(ast)
    }
}

fn parse_word(
    context: &mut ParserContext,
    selector: &str,
    value: &str,
    window: &Window<'_>,
) -> Result<()> {
    match context.buffer_type() {
        None => context.init_ast(value),
        Some(NodeType::SelectorList) => {
            context.add_node(NodeKind::Selector)?;
            context.add_regular(value)
        }
        Some(NodeType::RegularSelector | NodeType::AbsolutePseudoClass) => {
            context.update_buffer(value)
        }
        Some(NodeType::ExtendedSelector) => {
            if window.next_value().is_some_and(is_white_space_char)
                && window.next_next == Some("(")
            {
                return Err(Error::SelectorParse(format!(
                    "{NO_WHITESPACE_ERROR_PREFIX}: '{selector}'"
                )));
            }
            let name = value.to_lowercase();
            let pseudo = PseudoClass::from_name(&name).ok_or_else(|| {
                Error::SelectorParse(format!("Unknown pseudo-class :{name}()"))
            })?;
            context.extended_names.push(name);
            if pseudo.is_absolute() {
                context.add_node(NodeKind::AbsolutePseudoClass {
                    name: pseudo,
                    value: String::new(),
                })
            } else {
                if pseudo.is_optimizable() {
                    context.should_optimize = true;
                }
                context.add_node(NodeKind::RelativePseudoClass { name: pseudo })
            }
        }
        Some(NodeType::RelativePseudoClass) => context.init_relative_subtree(value),
        // word right after a closed extended pseudo-class, e.g. `div:has(a)b`
        Some(NodeType::Selector) => Ok(()),
    }
}

fn parse_comma(context: &mut ParserContext, selector: &str, window: &Window<'_>) -> Result<()> {
    let buffer = context.buffer_type();
    if buffer.is_none() || window.next.is_none() {
        return Err(invalid_selector(selector));
    }
    match buffer {
        Some(NodeType::RegularSelector) => {
            if context.attribute_open {
                context.update_buffer(",")?;
            } else {
                context.up_to_closest(NodeType::SelectorList);
            }
        }
        Some(NodeType::AbsolutePseudoClass) => context.update_buffer(",")?,
        Some(NodeType::Selector) => context.up_to_closest(NodeType::SelectorList),
        _ => {}
    }
    Ok(())
}

/// Whether the token after a space still belongs to the regular selector.
fn does_regular_continue_after_space(next: Option<&Token>) -> bool {
    let Some(next) = next else {
        return false;
    };
    let value = next.value.as_str();
    is_combinator(value)
        || next.is_word()
        || matches!(value, "*" | "#" | "." | ":" | "'" | "\"" | "[")
}

fn parse_space(context: &mut ParserContext, selector: &str, window: &Window<'_>) -> Result<()> {
    let mut buffer = context.buffer_type();
    if buffer == Some(NodeType::RegularSelector) && !context.attribute_open {
        buffer = context.updated_buffer()?;
    }

    if buffer == Some(NodeType::RegularSelector) {
        if !context.attribute_open {
            let prev_is_colon = window.prev_value() == Some(":");
            let next_is_word = window.next.is_some_and(Token::is_word);
            let prev_is_word = window.prev.is_some_and(Token::is_word);
            let next_is_paren = window.next_value() == Some("(");
            // e.g. `.block: nth-child(2)` or `.block:nth-child (2)`
            if (prev_is_colon && next_is_word) || (prev_is_word && next_is_paren) {
                return Err(invalid_selector(selector));
            }
        }
        if window.next.is_none()
            || does_regular_continue_after_space(window.next)
            || context.attribute_open
        {
            context.update_buffer(" ")?;
        }
    }

    if buffer == Some(NodeType::AbsolutePseudoClass) {
        context.update_buffer(" ")?;
    }

    if buffer == Some(NodeType::RelativePseudoClass) {
        context.init_relative_subtree("")?;
    }

    if buffer == Some(NodeType::Selector) && does_regular_continue_after_space(window.next) {
        context.add_regular("")?;
    }
    Ok(())
}

/// Combinators and the marks that are plain selector text.
fn parse_mark(
    context: &mut ParserContext,
    selector: &str,
    value: &str,
    window: &Window<'_>,
) -> Result<()> {
    let mut buffer = context.buffer_type();
    let prev = window.prev_value();
    if is_combinator(value) {
        if buffer.is_none() {
            return Err(invalid_selector(selector));
        }
        buffer = context.updated_buffer()?;
    }

    match buffer {
        None => {
            context.init_ast(value)?;
            if is_attribute_opening(value, prev) {
                context.attribute_open = true;
            }
        }
        Some(NodeType::RegularSelector) => {
            if value == "{" && !(context.attribute_open || context.regexp_open) {
                return Err(invalid_selector(selector));
            }
            context.update_buffer(value)?;
            if is_attribute_opening(value, prev) {
                context.attribute_open = true;
            }
        }
        Some(NodeType::AbsolutePseudoClass) => {
            context.update_buffer(value)?;
            if value == "/" && !context.extended_names.is_empty() {
                if prev == Some("/") && window.prev_prev == Some("\\") {
                    // end of an url pattern, e.g. `/^url\(https:\/\/example\.org\//`
                    context.regexp_open = false;
                } else if let Some(prev) = prev.filter(|prev| *prev != "\\") {
                    let buffer_value = context.buffer_value();
                    if is_regexp_opening(context, prev, &buffer_value)? {
                        context.regexp_open = !context.regexp_open;
                    } else {
                        context.regexp_open = false;
                    }
                }
            }
        }
        Some(NodeType::RelativePseudoClass) => {
            context.init_relative_subtree(value)?;
            if is_attribute_opening(value, prev) {
                context.attribute_open = true;
            }
        }
        Some(NodeType::Selector) => {
            if is_combinator(value) {
                context.add_regular(value)?;
            } else if !context.regexp_open {
                context.push_last_regular()?;
                context.update_buffer(value)?;
                if is_attribute_opening(value, prev) {
                    context.attribute_open = true;
                }
            }
        }
        Some(NodeType::SelectorList) => {
            context.add_node(NodeKind::Selector)?;
            context.add_regular(value)?;
            if is_attribute_opening(value, prev) {
                context.attribute_open = true;
            }
        }
        Some(NodeType::ExtendedSelector) => {}
    }
    Ok(())
}

fn parse_closing_square_bracket(
    context: &mut ParserContext,
    selector: &str,
    window: &Window<'_>,
) -> Result<()> {
    match context.buffer_type() {
        Some(NodeType::RegularSelector) => {
            if !context.attribute_open && window.prev_value() != Some("\\") {
                return Err(Error::SelectorParse(format!(
                    "'{selector}' is not a valid selector due to ']' after '{}'",
                    context.buffer_value()
                )));
            }
            if is_attribute_closing(context)? {
                context.attribute_open = false;
                context.attribute_buffer.clear();
            }
            context.update_buffer("]")
        }
        Some(NodeType::AbsolutePseudoClass) => context.update_buffer("]"),
        _ => Ok(()),
    }
}

/// Handles the token after a colon inside a regular selector: either a standard
/// pseudo-class continuing the regular selector or the start of an extended one.
fn handle_next_token_on_colon(
    context: &mut ParserContext,
    selector: &str,
    next: Option<&str>,
    next_next: Option<&str>,
) -> Result<()> {
    let Some(next) = next else {
        return Err(Error::SelectorParse(format!(
            "Invalid colon ':' at the end of selector: '{selector}'"
        )));
    };

    if !is_supported_pseudo(next) {
        if next.to_lowercase() == REMOVE_PSEUDO_MARKER {
            return Err(Error::SelectorParse(format!(
                "Invalid :remove() pseudo-class in selector: '{selector}'"
            )));
        }
        context.update_buffer(":")?;
        if next_next == Some("(") && !context.attribute_open {
            context.standard_names.push(next.to_string());
        }
        return Ok(());
    }

    let is_has = PseudoClass::from_name(next).is_some_and(PseudoClass::is_has);
    if is_has && !context.standard_names.is_empty() {
        return Err(Error::SelectorParse(format!(
            "Usage of :{next}() pseudo-class is not allowed inside regular pseudo: '{}'",
            context.standard_names.last().map(String::as_str).unwrap_or_default()
        )));
    }
    context.up_to_closest(NodeType::Selector);
    context.add_node(NodeKind::ExtendedSelector)
}

fn parse_colon(context: &mut ParserContext, selector: &str, window: &Window<'_>) -> Result<()> {
    let next = window.next_value();
    let next_next = window.next_next;

    if next.is_some_and(is_white_space_char)
        && next_next.is_some_and(|value| PseudoClass::from_name(value).is_some())
    {
        return Err(Error::SelectorParse(format!(
            "{NO_WHITESPACE_ERROR_PREFIX}: '{selector}'"
        )));
    }

    let mut buffer = context.buffer_type();
    if buffer.is_none() {
        match next {
            Some("xpath") => context.init_ast(XPATH_SELECTING_ROOT)?,
            Some(name @ ("upward" | "nth-ancestor")) => {
                return Err(Error::SelectorParse(format!(
                    "Selector should be defined before :{name}() pseudo-class"
                )));
            }
            // `:has(a)` reads as `*:has(a)`
            _ => context.init_ast("*")?,
        }
        buffer = context.buffer_type();
    }

    if buffer == Some(NodeType::SelectorList) {
        context.add_node(NodeKind::Selector)?;
        context.add_regular("")?;
        buffer = context.buffer_type();
    }

    if buffer == Some(NodeType::RegularSelector) {
        let prev = window.prev_value();
        if prev.is_some_and(is_combinator) || prev == Some(",") {
            context.update_buffer("*")?;
        }
        handle_next_token_on_colon(context, selector, next, next_next)?;
    }

    if buffer == Some(NodeType::Selector) {
        let Some(next) = next else {
            return Err(Error::SelectorParse(format!(
                "Invalid colon ':' at the end of selector: '{selector}'"
            )));
        };
        if is_supported_pseudo(next) {
            context.add_node(NodeKind::ExtendedSelector)?;
        } else if next.to_lowercase() == REMOVE_PSEUDO_MARKER {
            return Err(Error::SelectorParse(format!(
                "Invalid :remove() pseudo-class in selector: '{selector}'"
            )));
        } else {
            // standard pseudo after an extended one, e.g. `input:matches-css(padding: 10):checked`
            context.push_last_regular()?;
            buffer = Some(NodeType::RegularSelector);
            handle_next_token_on_colon(context, selector, Some(next), next_next)?;
        }
    }

    if buffer == Some(NodeType::AbsolutePseudoClass) {
        let is_xpath = context.buffer_pseudo_name() == Some(PseudoClass::XPath);
        if is_xpath
            && next.is_some_and(|value| PseudoClass::from_name(value).is_some())
            && next_next == Some("(")
        {
            return Err(Error::SelectorParse(format!(
                ":xpath() pseudo-class should be the last in selector: '{selector}'"
            )));
        }
        context.update_buffer(":")?;
    }

    if buffer == Some(NodeType::RelativePseudoClass) {
        let Some(next) = next else {
            return Err(Error::SelectorParse(format!(
                "Invalid pseudo-class arg at the end of selector: '{selector}'"
            )));
        };
        context.init_relative_subtree("*")?;
        if !is_supported_pseudo(next) {
            context.update_buffer(":")?;
            if next_next == Some("(") {
                context.standard_names.push(next.to_string());
            }
        } else {
            context.up_to_closest(NodeType::Selector);
            context.add_node(NodeKind::ExtendedSelector)?;
        }
    }
    Ok(())
}

fn parse_opening_parenthesis(context: &mut ParserContext) -> Result<()> {
    let buffer = context.buffer_type();

    if buffer == Some(NodeType::AbsolutePseudoClass) {
        let is_xpath = context.buffer_pseudo_name() == Some(PseudoClass::XPath);
        if !is_xpath && context.regexp_open {
            context.update_buffer("(")?;
        } else {
            context.extended_brackets += 1;
            if context.extended_brackets > context.extended_names.len() {
                context.update_buffer("(")?;
            }
        }
    }

    if buffer == Some(NodeType::RegularSelector) {
        if !context.standard_names.is_empty() {
            context.update_buffer("(")?;
            context.standard_brackets += 1;
        }
        if context.attribute_open {
            context.update_buffer("(")?;
        }
    }

    if buffer == Some(NodeType::RelativePseudoClass) {
        context.extended_brackets += 1;
    }
    Ok(())
}

fn parse_closing_parenthesis(context: &mut ParserContext, window: &Window<'_>) -> Result<()> {
    let buffer = context.buffer_type();

    if buffer == Some(NodeType::AbsolutePseudoClass) {
        let is_xpath = context.buffer_pseudo_name() == Some(PseudoClass::XPath);
        if !is_xpath && context.regexp_open {
            context.update_buffer(")")?;
        } else {
            context.extended_brackets = context.extended_brackets.saturating_sub(1);
            if !is_xpath {
                context.extended_names.pop();
                if context.extended_brackets > context.extended_names.len() {
                    // e.g. the first `)` in `h3:contains((Ads))`
                    context.update_buffer(")")?;
                } else {
                    context.up_to_closest(NodeType::Selector);
                }
            } else if context.extended_brackets < context.extended_names.len() {
                context.extended_names.pop();
            } else {
                context.update_buffer(")")?;
            }
        }
    }

    if buffer == Some(NodeType::RegularSelector) {
        if context.attribute_open {
            context.update_buffer(")")?;
        } else if !context.standard_names.is_empty() && context.standard_brackets > 0 {
            context.update_buffer(")")?;
            context.standard_brackets -= 1;
            let last_standard = context.standard_names.pop().unwrap_or_default();
            let next_next = window.next_next;
            if REGULAR_PSEUDO_ELEMENTS.contains(&last_standard.as_str())
                && window.next_value() == Some(":")
                && next_next.is_some_and(|value| {
                    PseudoClass::from_name(value).is_some_and(PseudoClass::is_has)
                })
            {
                return Err(Error::SelectorParse(format!(
                    "Usage of :{}() pseudo-class is not allowed after any regular pseudo-element: '{last_standard}'",
                    next_next.unwrap_or_default()
                )));
            }
        } else {
            close_extended_pseudo(context);
        }
    }

    if buffer == Some(NodeType::Selector) {
        close_extended_pseudo(context);
    }

    if buffer == Some(NodeType::RelativePseudoClass)
        && !context.extended_names.is_empty()
        && context.extended_brackets > 0
    {
        context.extended_brackets -= 1;
        context.extended_names.pop();
    }
    Ok(())
}

/// Leaves the arguments of a relative pseudo-class, e.g. after `div:has(h3)`.
fn close_extended_pseudo(context: &mut ParserContext) {
    context.extended_brackets = context.extended_brackets.saturating_sub(1);
    context.extended_names.pop();
    context.up_to_closest(NodeType::ExtendedSelector);
    context.up_to_closest(NodeType::Selector);
}
