use super::*;

const IMPORTANT_SUFFIX: &str = "!important";

pub(crate) fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    let mut start = 0usize;
    for end in top_level_positions(style_attr, b';') {
        push_style_declaration(&style_attr[start..end], &mut out);
        start = end + 1;
    }
    push_style_declaration(&style_attr[start..], &mut out);
    out
}

fn push_style_declaration(raw_decl: &str, out: &mut Vec<(String, String)>) {
    let decl = raw_decl.trim();
    let Some(colon) = top_level_positions(decl, b':').into_iter().next() else {
        return;
    };

    let name = decl[..colon].trim().to_ascii_lowercase();
    if name.is_empty() {
        return;
    }
    let value = decl[colon + 1..].trim().to_string();

    match out.iter_mut().find(|(existing, _)| *existing == name) {
        Some((_, existing)) => *existing = value,
        None => out.push((name, value)),
    }
}

/// Byte offsets of `needle` outside quotes and parentheses.
fn top_level_positions(text: &str, needle: u8) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut positions = Vec::new();
    let mut paren_depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0usize;

    while i < bytes.len() {
        let ch = bytes[i];
        match quote {
            Some(_) if ch == b'\\' => i += 1,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                b'\'' | b'"' => quote = Some(ch),
                b'(' => paren_depth += 1,
                b')' => paren_depth = paren_depth.saturating_sub(1),
                _ if ch == needle && paren_depth == 0 => positions.push(i),
                _ => {}
            },
        }
        i += 1;
    }
    positions
}

pub(crate) fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a trailing `!important` off a declaration value.
pub(crate) fn strip_important(value: &str) -> (&str, bool) {
    let trimmed = value.trim_end();
    let lowered_len = trimmed.len().saturating_sub(IMPORTANT_SUFFIX.len());
    match trimmed.get(lowered_len..) {
        Some(tail) if tail.eq_ignore_ascii_case(IMPORTANT_SUFFIX) => {
            (trimmed[..lowered_len].trim_end(), true)
        }
        _ => (trimmed, false),
    }
}

pub(crate) fn is_supported_style_property(property: &str) -> bool {
    if let Some(custom) = property.strip_prefix("--") {
        return !custom.is_empty();
    }
    let name = property.strip_prefix('-').unwrap_or(property);
    name.starts_with(|ch: char| ch.is_ascii_lowercase())
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

fn default_display(tag_name: &str) -> &'static str {
    match tag_name {
        "head" | "script" | "style" | "template" | "title" | "meta" | "link" | "noscript" => {
            "none"
        }
        "li" => "list-item",
        "table" => "table",
        "tr" => "table-row",
        "td" | "th" => "table-cell",
        "address" | "article" | "aside" | "blockquote" | "body" | "dd" | "details" | "div"
        | "dl" | "dt" | "fieldset" | "figcaption" | "figure" | "footer" | "form" | "h1" | "h2"
        | "h3" | "h4" | "h5" | "h6" | "header" | "hr" | "html" | "main" | "nav" | "ol" | "p"
        | "pre" | "section" | "summary" | "ul" => "block",
        _ => "inline",
    }
}

/// Normalizes `::before`, `:before` and `before` to `before`.
pub(crate) fn normalize_pseudo_element(pseudo_element: &str) -> String {
    pseudo_element.trim_start_matches(':').to_ascii_lowercase()
}

impl Page {
    pub(crate) fn computed_style_value(
        &self,
        node: NodeId,
        pseudo_element: Option<&str>,
        property: &str,
    ) -> String {
        let Some(element) = self.dom.element(node) else {
            return String::new();
        };
        let property = property.trim().to_ascii_lowercase();
        let pseudo_element = pseudo_element
            .map(normalize_pseudo_element)
            .filter(|pseudo| !pseudo.is_empty());

        if pseudo_element.is_none() {
            let inline = parse_style_declarations(element.attr("style"));
            if let Some((_, value)) = inline.iter().find(|(name, _)| *name == property) {
                return strip_important(value).0.to_string();
            }
        }

        let from_rules = self
            .style_rules
            .iter()
            .rev()
            .filter(|rule| rule.pseudo_element == pseudo_element)
            .filter(|rule| {
                rule.selector
                    .iter()
                    .any(|steps| self.dom.matches_selector_chain(node, steps, None))
            })
            .find_map(|rule| {
                rule.declarations
                    .iter()
                    .find(|(name, _)| *name == property)
                    .map(|(_, value)| strip_important(value).0.to_string())
            });
        if let Some(value) = from_rules {
            return value;
        }
        if pseudo_element.is_some() {
            return String::new();
        }

        match property.as_str() {
            "display" => default_display(&element.tag_name).to_string(),
            "visibility" => "visible".to_string(),
            "opacity" => "1".to_string(),
            _ => String::new(),
        }
    }
}
