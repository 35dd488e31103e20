use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists {
        key: String,
    },
    Value {
        key: String,
        op: SelectorAttrOperator,
        value: String,
        case_insensitive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorAttrOperator {
    Eq,
    StartsWith,
    EndsWith,
    Contains,
    Includes,
    DashMatch,
}

impl SelectorAttrOperator {
    pub(crate) fn matches(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Eq => actual == expected,
            Self::StartsWith => !expected.is_empty() && actual.starts_with(expected),
            Self::EndsWith => !expected.is_empty() && actual.ends_with(expected),
            Self::Contains => !expected.is_empty() && actual.contains(expected),
            Self::Includes => actual.split_whitespace().any(|token| token == expected),
            Self::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorPseudoClass {
    Scope,
    Root,
    FirstChild,
    LastChild,
    FirstOfType,
    LastOfType,
    OnlyChild,
    OnlyOfType,
    Empty,
    NthChild(NthChildSelector),
    NthLastChild(NthChildSelector),
    NthOfType(NthChildSelector),
    NthLastOfType(NthChildSelector),
    Not(Vec<Vec<SelectorPart>>),
    Is(Vec<Vec<SelectorPart>>),
    Where(Vec<Vec<SelectorPart>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NthChildSelector {
    Exact(usize),
    Odd,
    Even,
    AnPlusB(i64, i64),
}

impl NthChildSelector {
    /// Whether the 1-based `position` is selected.
    pub(crate) fn matches(self, position: usize) -> bool {
        let position = position as i64;
        match self {
            Self::Exact(n) => position == n as i64,
            Self::Odd => position % 2 == 1,
            Self::Even => position % 2 == 0,
            Self::AnPlusB(a, b) => {
                if a == 0 {
                    return position == b;
                }
                let diff = position - b;
                diff % a == 0 && diff / a >= 0
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) universal: bool,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
    pub(crate) pseudo_classes: Vec<SelectorPseudoClass>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to previous (left) selector part.
    pub(crate) combinator: Option<SelectorCombinator>,
}

fn unsupported(selector: &str) -> Error {
    Error::UnsupportedSelector(selector.into())
}

pub(crate) fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(unsupported(selector));
    }

    let tokens = tokenize_selector(selector)?;
    let mut steps = Vec::new();
    let mut pending_combinator: Option<SelectorCombinator> = None;

    for token in tokens {
        let combinator = match token.as_str() {
            ">" => Some(SelectorCombinator::Child),
            "+" => Some(SelectorCombinator::AdjacentSibling),
            "~" => Some(SelectorCombinator::GeneralSibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if pending_combinator.is_some() || steps.is_empty() {
                return Err(unsupported(selector));
            }
            pending_combinator = Some(combinator);
            continue;
        }

        let step = parse_selector_step(&token)?;
        let combinator = if steps.is_empty() {
            None
        } else {
            Some(
                pending_combinator
                    .take()
                    .unwrap_or(SelectorCombinator::Descendant),
            )
        };
        steps.push(SelectorPart { step, combinator });
    }

    if steps.is_empty() || pending_combinator.is_some() {
        return Err(unsupported(selector));
    }

    Ok(steps)
}

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let groups = split_selector_groups(selector)?;
    let mut parsed = Vec::with_capacity(groups.len());
    for group in groups {
        parsed.push(parse_selector_chain(&group)?);
    }
    Ok(parsed)
}

/// Tracks brackets, parentheses, quotes and escapes while scanning selector text.
#[derive(Default)]
struct NestingState {
    bracket_depth: usize,
    paren_depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl NestingState {
    /// Feeds one character; returns whether it is at the top level.
    fn feed(&mut self, ch: char, selector: &str) -> Result<bool> {
        if self.escaped {
            self.escaped = false;
            return Ok(false);
        }
        if ch == '\\' {
            self.escaped = true;
            return Ok(false);
        }
        if let Some(quote) = self.quote {
            if ch == quote {
                self.quote = None;
            }
            return Ok(false);
        }
        match ch {
            '"' | '\'' => self.quote = Some(ch),
            '[' => self.bracket_depth += 1,
            ']' => {
                self.bracket_depth = self
                    .bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(selector))?;
            }
            '(' => self.paren_depth += 1,
            ')' => {
                self.paren_depth = self
                    .paren_depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(selector))?;
            }
            _ => return Ok(self.bracket_depth == 0 && self.paren_depth == 0),
        }
        Ok(false)
    }

    fn finish(&self, selector: &str) -> Result<()> {
        if self.bracket_depth != 0 || self.paren_depth != 0 || self.quote.is_some() {
            return Err(unsupported(selector));
        }
        Ok(())
    }
}

pub(crate) fn split_selector_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut state = NestingState::default();

    for ch in selector.chars() {
        if state.feed(ch, selector)? && ch == ',' {
            let trimmed = current.trim();
            if trimmed.is_empty() {
                return Err(unsupported(selector));
            }
            groups.push(trimmed.to_string());
            current.clear();
            continue;
        }
        current.push(ch);
    }
    state.finish(selector)?;

    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(unsupported(selector));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

pub(crate) fn tokenize_selector(selector: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = NestingState::default();

    for ch in selector.chars() {
        let top_level = state.feed(ch, selector)?;
        if top_level && matches!(ch, '>' | '+' | '~') {
            if !current.trim().is_empty() {
                tokens.push(current.trim().to_string());
            }
            current.clear();
            tokens.push(ch.to_string());
        } else if top_level && ch.is_whitespace() {
            if !current.trim().is_empty() {
                tokens.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }
    state.finish(selector)?;

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    Ok(tokens)
}

pub(crate) fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let part = part.trim();
    if part.is_empty() {
        return Err(unsupported(part));
    }

    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = SelectorStep::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() || i != 0 {
                    return Err(unsupported(part));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_selector_ident(part, i + 1).ok_or_else(|| unsupported(part))?;
                if step.id.replace(id).is_some() {
                    return Err(unsupported(part));
                }
                i = next;
            }
            b'.' => {
                let (class_name, next) =
                    parse_selector_ident(part, i + 1).ok_or_else(|| unsupported(part))?;
                step.classes.push(class_name);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_selector_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            b':' => {
                let (pseudo, next) = parse_selector_pseudo(part, i)?;
                step.pseudo_classes.push(pseudo);
                i = next;
            }
            _ => {
                if i != 0 {
                    return Err(unsupported(part));
                }
                let (tag, next) = parse_selector_ident(part, i).ok_or_else(|| unsupported(part))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    Ok(step)
}

const SIMPLE_PSEUDO_CLASSES: [(&str, SelectorPseudoClass); 9] = [
    ("scope", SelectorPseudoClass::Scope),
    ("root", SelectorPseudoClass::Root),
    ("first-child", SelectorPseudoClass::FirstChild),
    ("last-child", SelectorPseudoClass::LastChild),
    ("first-of-type", SelectorPseudoClass::FirstOfType),
    ("last-of-type", SelectorPseudoClass::LastOfType),
    ("only-child", SelectorPseudoClass::OnlyChild),
    ("only-of-type", SelectorPseudoClass::OnlyOfType),
    ("empty", SelectorPseudoClass::Empty),
];

/// Parses the pseudo-class at `start` (pointing at its `:`).
///
/// Pseudo-elements and unknown pseudo-classes are rejected.
pub(crate) fn parse_selector_pseudo(part: &str, start: usize) -> Result<(SelectorPseudoClass, usize)> {
    let name_start = start + 1;
    let (name, after_name) =
        parse_selector_ident(part, name_start).ok_or_else(|| unsupported(part))?;
    let name = name.to_ascii_lowercase();

    if part.as_bytes().get(after_name) != Some(&b'(') {
        return SIMPLE_PSEUDO_CLASSES
            .iter()
            .find(|(simple, _)| *simple == name)
            .map(|(_, pseudo)| (pseudo.clone(), after_name))
            .ok_or_else(|| unsupported(part));
    }

    let body_start = after_name + 1;
    let rest = part.get(body_start..).ok_or_else(|| unsupported(part))?;
    let close_pos = find_matching_paren(rest).ok_or_else(|| unsupported(part))?;
    let body = rest[..close_pos].trim();
    if body.is_empty() {
        return Err(unsupported(part));
    }
    let next = body_start + close_pos + 1;

    let pseudo = match name.as_str() {
        "not" => SelectorPseudoClass::Not(parse_selector_groups(body)?),
        "is" | "matches" => SelectorPseudoClass::Is(parse_selector_groups(body)?),
        "where" => SelectorPseudoClass::Where(parse_selector_groups(body)?),
        "nth-child" => SelectorPseudoClass::NthChild(nth_or_unsupported(body, part)?),
        "nth-last-child" => SelectorPseudoClass::NthLastChild(nth_or_unsupported(body, part)?),
        "nth-of-type" => SelectorPseudoClass::NthOfType(nth_or_unsupported(body, part)?),
        "nth-last-of-type" => SelectorPseudoClass::NthLastOfType(nth_or_unsupported(body, part)?),
        _ => return Err(unsupported(part)),
    };
    Ok((pseudo, next))
}

fn nth_or_unsupported(body: &str, part: &str) -> Result<NthChildSelector> {
    parse_nth_child_selector(body).ok_or_else(|| unsupported(part))
}

pub(crate) fn find_matching_paren(body: &str) -> Option<usize> {
    let mut paren_depth = 1usize;
    let mut bracket_depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (idx, b) in body.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if b == b'\\' {
            escaped = true;
            continue;
        }
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'\'' | b'"' => quote = Some(b),
            b'[' => {
                bracket_depth += 1;
            }
            b']' => {
                bracket_depth = bracket_depth.checked_sub(1)?;
            }
            b'(' if bracket_depth == 0 => {
                paren_depth += 1;
            }
            b')' if bracket_depth == 0 => {
                paren_depth = paren_depth.checked_sub(1)?;
                if paren_depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn parse_nth_child_selector(raw: &str) -> Option<NthChildSelector> {
    let compact = raw
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match compact.as_str() {
        "" => None,
        "odd" => Some(NthChildSelector::Odd),
        "even" => Some(NthChildSelector::Even),
        other if other.contains('n') => parse_nth_child_expression(other),
        other => {
            let value = other.strip_prefix('+').unwrap_or(other).parse::<i64>().ok()?;
            if value <= 0 {
                // never selects anything, still a valid selector
                Some(NthChildSelector::AnPlusB(0, value))
            } else {
                Some(NthChildSelector::Exact(value as usize))
            }
        }
    }
}

pub(crate) fn parse_nth_child_expression(expr: &str) -> Option<NthChildSelector> {
    if expr.matches('n').count() != 1 {
        return None;
    }

    let n_pos = expr.find('n')?;
    let (a_part, rest) = expr.split_at(n_pos);
    let b_part = &rest[1..];

    let a = match a_part {
        "" | "+" => 1,
        "-" => -1,
        _ => a_part.parse::<i64>().ok()?,
    };

    if b_part.is_empty() {
        return Some(NthChildSelector::AnPlusB(a, 0));
    }

    let (sign, raw_b) = if let Some(rest) = b_part.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = b_part.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };
    if raw_b.is_empty() || raw_b.starts_with(['+', '-']) {
        return None;
    }
    let b = raw_b.parse::<i64>().ok()?;
    Some(NthChildSelector::AnPlusB(a, b * sign))
}

/// Reads a CSS identifier starting at `start`, resolving backslash escapes.
pub(crate) fn parse_selector_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let tail = src.get(start..)?;
    let mut ident = String::new();
    let mut end = start;
    let mut chars = tail.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let escaped = chars.next()?;
            ident.push(escaped);
            end += ch.len_utf8() + escaped.len_utf8();
            continue;
        }
        if !is_selector_ident_char(ch) {
            break;
        }
        ident.push(ch);
        end += ch.len_utf8();
    }
    if ident.is_empty() || ident.starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    Some((ident, end))
}

pub(crate) fn is_selector_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

pub(crate) fn parse_selector_attr_condition(
    src: &str,
    open_bracket: usize,
) -> Result<(SelectorAttrCondition, usize)> {
    let bytes = src.as_bytes();
    let mut i = skip_ws(bytes, open_bracket + 1);
    if i >= bytes.len() {
        return Err(unsupported(src));
    }

    let key_start = i;
    while i < bytes.len() && is_selector_attr_name_char(bytes[i]) {
        i += 1;
    }
    if key_start == i {
        return Err(unsupported(src));
    }
    let key = src
        .get(key_start..i)
        .ok_or_else(|| unsupported(src))?
        .to_ascii_lowercase();

    i = skip_ws(bytes, i);
    if i >= bytes.len() {
        return Err(unsupported(src));
    }

    if bytes[i] == b']' {
        return Ok((SelectorAttrCondition::Exists { key }, i + 1));
    }

    let (op, next) = match bytes.get(i) {
        Some(b'=') => (SelectorAttrOperator::Eq, i + 1),
        Some(b'^') if bytes.get(i + 1) == Some(&b'=') => (SelectorAttrOperator::StartsWith, i + 2),
        Some(b'$') if bytes.get(i + 1) == Some(&b'=') => (SelectorAttrOperator::EndsWith, i + 2),
        Some(b'*') if bytes.get(i + 1) == Some(&b'=') => (SelectorAttrOperator::Contains, i + 2),
        Some(b'~') if bytes.get(i + 1) == Some(&b'=') => (SelectorAttrOperator::Includes, i + 2),
        Some(b'|') if bytes.get(i + 1) == Some(&b'=') => (SelectorAttrOperator::DashMatch, i + 2),
        _ => return Err(unsupported(src)),
    };

    i = skip_ws(bytes, next);
    if i >= bytes.len() {
        return Err(unsupported(src));
    }

    let (value, after_value) = parse_selector_attr_value(src, i)?;
    i = skip_ws(bytes, after_value);

    // `[a="b" i]` compares values ASCII case-insensitively
    let mut case_insensitive = false;
    if matches!(bytes.get(i), Some(b'i' | b'I' | b's' | b'S')) {
        case_insensitive = bytes[i].eq_ignore_ascii_case(&b'i');
        i = skip_ws(bytes, i + 1);
    }
    if bytes.get(i) != Some(&b']') {
        return Err(unsupported(src));
    }

    Ok((
        SelectorAttrCondition::Value {
            key,
            op,
            value,
            case_insensitive,
        },
        i + 1,
    ))
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

pub(crate) fn is_selector_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':' || b >= 0x80
}

pub(crate) fn parse_selector_attr_value(src: &str, start: usize) -> Result<(String, usize)> {
    let tail = src.get(start..).ok_or_else(|| unsupported(src))?;
    let mut chars = tail.char_indices().peekable();
    let quote = match chars.peek() {
        Some((_, quote @ ('"' | '\''))) => {
            let quote = *quote;
            chars.next();
            Some(quote)
        }
        _ => None,
    };

    let mut value = String::new();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| unsupported(src))?;
                value.push(escaped);
            }
            ch if Some(ch) == quote => return Ok((value, start + offset + 1)),
            ch if quote.is_none() && (ch.is_whitespace() || ch == ']') => {
                if value.is_empty() {
                    return Err(unsupported(src));
                }
                return Ok((value, start + offset));
            }
            ch => value.push(ch),
        }
    }
    Err(unsupported(src))
}
