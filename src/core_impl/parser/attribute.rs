use super::*;

const CASE_INSENSITIVE_FLAG: &str = "i";

/// Marks allowed right before a regexp pattern in a `:contains()` argument.
const MARKS_BEFORE_CONTAINS_REGEXP: [&str; 3] = ["(", "'", "\""];
/// Marks allowed right before a regexp pattern in other absolute pseudo-class arguments.
const MARKS_BEFORE_COMMON_REGEXP: [&str; 7] = ["(", "'", "\"", "=", ".", ":", " "];

pub(super) fn is_attribute_opening(token: &str, prev: Option<&str>) -> bool {
    token == "[" && prev != Some("\\")
}

/// Checks whether the `]` being parsed closes the open attribute selector.
///
/// Spaces inside the brackets are ignored for this check only, so `a[ title ]`
/// validates like `a[title]` while the AST keeps the original text.
pub(super) fn is_attribute_closing(context: &ParserContext) -> Result<bool> {
    if !context.attribute_open {
        return Ok(false);
    }
    let raw = &context.attribute_buffer;
    let compact = raw.replace(' ', "");
    let tokens = tokenizer::tokenize_attribute(&compact);

    if let Some(first) = tokens.first() {
        if !first.is_word() && first.value != "\\" {
            return Err(Error::SelectorParse(format!(
                "'[{raw}]' is not a valid attribute due to '{}' at start of it",
                first.value
            )));
        }
    }

    let last = tokens.last();
    if last.is_some_and(|token| token.value == "=") {
        return Err(Error::SelectorParse(format!(
            "'[{raw}]' is not a valid attribute due to '='"
        )));
    }

    let prev_to_last = tokens
        .len()
        .checked_sub(2)
        .and_then(|index| tokens.get(index))
        .map(|token| token.value.as_str());
    let last_is_word = last.is_some_and(Token::is_word);
    let last_value = last.map(|token| token.value.as_str());

    let Some(equal_index) = tokens
        .iter()
        .position(|token| !token.is_word() && token.value == "=")
    else {
        if last_is_word {
            return Ok(true);
        }
        // e.g. `[class\"ads-article\"]`
        return Ok(prev_to_last == Some("\\") && matches!(last_value, Some("\"" | "'")));
    };

    let after_equal = tokens
        .get(equal_index + 1)
        .map(|token| token.value.as_str());
    let is_quoted = matches!(after_equal, Some("\"" | "'"));
    if !is_quoted {
        if last_is_word {
            return Ok(true);
        }
        return Err(Error::SelectorParse(format!(
            "'[{raw}]' is not a valid attribute"
        )));
    }

    if last_is_word
        && last_value.is_some_and(|value| value.eq_ignore_ascii_case(CASE_INSENSITIVE_FLAG))
    {
        return Ok(prev_to_last == after_equal);
    }
    Ok(last_value == after_equal)
}

/// Checks whether the `/` being parsed opens a regexp pattern inside an
/// absolute pseudo-class argument.
pub(super) fn is_regexp_opening(
    context: &ParserContext,
    prev: &str,
    buffer_value: &str,
) -> Result<bool> {
    let Some(last_name) = context.extended_names.last() else {
        return Err(Error::SelectorParse(
            "Regexp pattern allowed only in arg of extended pseudo-class".into(),
        ));
    };

    let is_contains = PseudoClass::from_name(last_name).is_some_and(PseudoClass::is_text_matching);
    if is_contains {
        return Ok(MARKS_BEFORE_CONTAINS_REGEXP.contains(&prev));
    }

    if prev == "/" && last_name != PseudoClass::XPath.name() {
        let arg_desc = if buffer_value.is_empty() {
            "arg".to_string()
        } else {
            format!("in arg part: '{buffer_value}'")
        };
        return Err(Error::SelectorParse(format!(
            "Invalid regexp pattern for :{last_name}() pseudo-class {arg_desc}"
        )));
    }

    Ok(MARKS_BEFORE_COMMON_REGEXP.contains(&prev))
}
