use super::matcher_arg::{
    MatcherArg, collect_chain_values, js_number, js_string, literal_equals, parse_property_chain,
    split_pseudo_arg,
};
use super::*;

use crate::core_impl::parser::REGULAR_PSEUDO_ELEMENTS;
use crate::js_regex::{self, Regex, RegexBuilder};

const MATCHING_ELEMENT_ERROR_PREFIX: &str = "Error while matching element";
const MAX_ANCESTOR_DEPTH: f64 = 256.0;
const REGEXP_FLAGS: &str = "gmisuy";

/// Removes the backslash in front of any of `escaped`.
fn unescape(text: &str, escaped: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if escaped.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

/// Splits a `/pattern/flags` argument; `None` when `arg` is plain text.
fn split_regexp_literal(arg: &str) -> Option<(&str, &str)> {
    let trimmed = arg.trim_end();
    if !trimmed.starts_with('/') || trimmed.contains('\n') {
        return None;
    }
    let last = trimmed.rfind('/').filter(|last| *last > 0)?;
    let flags = &trimmed[last + 1..];
    if !flags.chars().all(|flag| REGEXP_FLAGS.contains(flag)) {
        return None;
    }
    Some((&trimmed[1..last], flags))
}

/// Quotes bare `url(...)` values so they compare equal with quoted ones.
fn add_url_quotes(value: &str) -> Result<String> {
    if value.contains("url(\"") {
        return Ok(value.to_string());
    }
    let url = Regex::new(r"url\((.*?)\)")?;
    Ok(url.replace_all_with(value, |captures| format!("url(\"{}\")", captures.text(1)))?)
}

/// Makes an explicit `url\(` in a regexp argument accept an optional quote.
fn add_url_quotes_to_regexp(pattern: &str) -> Result<String> {
    let url = Regex::new(r"(\^)?url(\\)?\\\((\w|\[\w)")?;
    Ok(url.replace_all_with(pattern, |captures| {
        format!(
            "{}url{}\\(\"?{}",
            captures.text(1),
            captures.text(2),
            captures.text(3)
        )
    })?)
}

fn remove_content_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn normalize_property_value(property: &str, value: &str) -> Result<String> {
    match property {
        "background" | "background-image" => add_url_quotes(value),
        "content" => Ok(remove_content_quotes(value).to_string()),
        _ => Ok(value.to_string()),
    }
}

/// Case-insensitive regexp for a `:matches-css()` value; plain values are
/// literal apart from `*`, which matches anything.
fn style_value_regex(raw: &str) -> Result<Regex> {
    let pattern = if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
        let quoted = add_url_quotes_to_regexp(raw)?;
        quoted[1..quoted.len() - 1].to_string()
    } else {
        let quoted = add_url_quotes(raw)?;
        let unescaped = unescape(&quoted, &['\\', '(', ')', '[', ']', '"']);
        js_regex::escape_keep_wildcard(&unescaped).replace('*', ".*")
    };
    Ok(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
}

/// Splits a `:matches-css()` argument into an optional `::pseudo-element` and
/// the `property: value` part.
fn parse_style_match_arg(name: PseudoClass, raw: &str) -> Result<(Option<String>, &str)> {
    let (head, rest) = split_pseudo_arg(raw, ',');
    let (pseudo_element, style_arg) = if REGULAR_PSEUDO_ELEMENTS.contains(&head) {
        (Some(format!("::{head}")), rest.unwrap_or_default())
    } else {
        (None, raw)
    };
    if style_arg.is_empty() {
        return Err(Error::Matching(format!(
            "Required style property argument part is missing in :{name}() arg: '{raw}'"
        )));
    }
    Ok((pseudo_element, style_arg))
}

fn raw_matching_data(name: PseudoClass, arg: &str) -> Result<(&str, Option<&str>)> {
    let (raw_name, raw_value) = split_pseudo_arg(arg, '=');
    if raw_name.is_empty() {
        return Err(Error::Matching(format!(
            "Required attribute name is missing in :{name} arg: {arg}"
        )));
    }
    Ok((raw_name, raw_value.filter(|value| !value.is_empty())))
}

fn logged(err: Error) -> Error {
    log::error!("{err}");
    err
}

fn valid_ancestor_depth(raw: &str, name: PseudoClass) -> Result<f64> {
    match js_number(raw) {
        Some(depth) if (1.0..MAX_ANCESTOR_DEPTH).contains(&depth) => Ok(depth),
        _ => Err(Error::Matching(format!(
            "Invalid argument of :{name} pseudo-class: '{raw}'"
        ))),
    }
}

impl<D: HostDocument> MatchContext<'_, D> {
    /// Filter step shared by the text, style, attribute and property pseudo-classes.
    pub(super) fn is_matched_by_absolute(
        &self,
        element: D::Node,
        name: PseudoClass,
        arg: &str,
    ) -> Result<bool> {
        let (matched, subject) = match name {
            PseudoClass::Contains | PseudoClass::HasText | PseudoClass::AbpContains => {
                (self.is_text_matched(element, name, arg), "text content")
            }
            PseudoClass::MatchesCss | PseudoClass::MatchesCssBefore | PseudoClass::MatchesCssAfter => {
                (self.is_style_matched(element, name, arg), "style")
            }
            PseudoClass::MatchesAttr => (self.is_attribute_matched(element, name, arg), "attributes"),
            PseudoClass::MatchesProperty => {
                (self.is_property_matched(element, name, arg), "properties")
            }
            _ => {
                return Err(Error::Matching(format!(
                    "Unknown absolute pseudo-class :{name}()"
                )));
            }
        };
        matched.map_err(|err| {
            log::error!("{err}");
            Error::Matching(format!(
                "{MATCHING_ELEMENT_ERROR_PREFIX} {subject}, may be invalid :{name}() pseudo-class arg: '{arg}'"
            ))
        })
    }

    fn is_text_matched(&self, element: D::Node, name: PseudoClass, arg: &str) -> Result<bool> {
        let text = self.text_of(element);
        if let Some((pattern, flags)) = split_regexp_literal(arg) {
            let pattern = unescape(pattern, &['\\', '"']);
            let regex = Regex::with_flags(&pattern, flags).map_err(|_| {
                Error::Matching(format!(
                    "Invalid argument of :{name}() pseudo-class: {arg}"
                ))
            })?;
            return Ok(regex.is_match(&text)?);
        }
        let needle = unescape(arg, &['\\', '(', ')', '[', ']', '"']);
        Ok(text.contains(&needle))
    }

    fn is_style_matched(&self, element: D::Node, name: PseudoClass, arg: &str) -> Result<bool> {
        let (pseudo_element, style_arg) = parse_style_match_arg(name, arg)?;
        let (property, value) = split_pseudo_arg(style_arg, ':');
        let value = match value {
            Some(value) if !property.is_empty() && !value.is_empty() => value,
            _ => {
                return Err(Error::Matching(format!(
                    "Required property name or value is missing in :{name}() arg: '{style_arg}'"
                )));
            }
        };
        let regex = style_value_regex(value).map_err(|err| {
            log::error!("{err}");
            Error::Matching(format!(
                "Invalid argument of :{name}() pseudo-class: '{style_arg}'"
            ))
        })?;
        let computed = self
            .doc
            .computed_style(element, pseudo_element.as_deref(), property);
        let actual = normalize_property_value(property, &computed)?;
        Ok(regex.is_match(&actual)?)
    }

    fn is_attribute_matched(&self, element: D::Node, name: PseudoClass, arg: &str) -> Result<bool> {
        let attributes = self.doc.attributes(element);
        if attributes.is_empty() {
            return Ok(false);
        }
        let (raw_name, raw_value) = raw_matching_data(name, arg)?;
        let name_match = MatcherArg::parse(raw_name, false).map_err(logged)?;
        let value_match = raw_value
            .map(|raw| MatcherArg::parse(raw, false).map_err(logged))
            .transpose()?;

        for attribute in &attributes {
            if !name_match.matches(&attribute.name)? {
                continue;
            }
            match &value_match {
                Some(value_match) if !value_match.matches(&attribute.value)? => {}
                _ => return Ok(true),
            }
        }
        Ok(false)
    }

    fn is_property_matched(&self, element: D::Node, name: PseudoClass, arg: &str) -> Result<bool> {
        let (raw_name, raw_value) = raw_matching_data(name, arg)?;
        if raw_name.contains("\\/") || raw_name.contains("\\.") {
            return Err(Error::Matching(format!(
                "Invalid :{name} name pattern: {raw_name}"
            )));
        }
        let chain = parse_property_chain(raw_name).map_err(logged)?;

        let mut owners = Vec::new();
        collect_chain_values(&self.doc.element_properties(element), &chain, &mut owners)?;
        if owners.is_empty() {
            return Ok(false);
        }
        let Some(raw_value) = raw_value else {
            return Ok(true);
        };

        let value_match = MatcherArg::parse(raw_value, false).map_err(logged)?;
        for value in &owners {
            let matched = match &value_match {
                MatcherArg::Pattern(regex) => regex.is_match(&js_string(value))?,
                MatcherArg::Literal(literal) => match value.as_str() {
                    // stored as text, so compare as text
                    Some(text @ ("null" | "undefined")) => return Ok(literal == text),
                    _ => literal_equals(literal, value),
                },
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `:nth-ancestor(n)` and numeric `:upward(n)`. Elements with fewer than
    /// `n` ancestors are dropped.
    pub(super) fn nth_ancestors(
        &self,
        elements: &[D::Node],
        raw: &str,
        name: PseudoClass,
    ) -> Result<Vec<D::Node>> {
        let depth = valid_ancestor_depth(raw, name)?;
        let mut ancestors = Vec::with_capacity(elements.len());
        'elements: for &element in elements {
            let mut current = element;
            let mut level = 0.0;
            while level < depth {
                let Some(parent) = self.doc.parent_element(current) else {
                    log::error!(
                        "Out of DOM: Argument of :{name}() pseudo-class is too big -- '{raw}'."
                    );
                    continue 'elements;
                };
                current = parent;
                level += 1.0;
            }
            if self.doc.is_element(current) {
                ancestors.push(current);
            }
        }
        Ok(ancestors)
    }

    pub(super) fn by_xpath(&self, elements: &[D::Node], expression: &str) -> Result<Vec<D::Node>> {
        let mut found = Vec::new();
        for &element in elements {
            let nodes = self.doc.evaluate_xpath(element, expression).map_err(|err| {
                log::error!("{err}");
                Error::Matching(format!(
                    "Invalid argument of :xpath() pseudo-class: '{expression}'"
                ))
            })?;
            found.extend(nodes.into_iter().filter(|node| self.doc.is_element(*node)));
        }
        Ok(found)
    }

    /// Closest ancestor matching `selector`, starting from the parent so an
    /// element never selects itself.
    pub(super) fn upward(&self, elements: &[D::Node], selector: &str) -> Result<Vec<D::Node>> {
        let invalid = || {
            Error::Matching(format!(
                "Invalid argument of :upward pseudo-class: '{selector}'"
            ))
        };
        self.doc
            .query_selector_all(self.doc.document_node(), selector)
            .map_err(|_| invalid())?;

        let mut ancestors = Vec::with_capacity(elements.len());
        for &element in elements {
            let Some(parent) = self.doc.parent_element(element) else {
                continue;
            };
            if let Some(ancestor) = self.doc.closest(parent, selector).map_err(|_| invalid())? {
                ancestors.push(ancestor);
            }
        }
        Ok(ancestors)
    }
}
