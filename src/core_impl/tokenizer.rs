use super::*;

use crate::js_regex::{Regex, RegexError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Mark,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) value: String,
}

impl Token {
    fn mark(ch: char) -> Self {
        Self {
            kind: TokenKind::Mark,
            value: ch.to_string(),
        }
    }

    fn word(value: String) -> Self {
        Self {
            kind: TokenKind::Word,
            value,
        }
    }

    pub(crate) fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

pub(crate) const SPACE: char = ' ';
pub(crate) const TAB: char = '\t';
pub(crate) const LINE_FEED: char = '\n';
pub(crate) const CARRIAGE_RETURN: char = '\r';
pub(crate) const FORM_FEED: char = '\u{c}';

pub(crate) fn is_white_space_char(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(SPACE | TAB | LINE_FEED | CARRIAGE_RETURN | FORM_FEED), None)
    )
}

pub(crate) fn is_combinator(value: &str) -> bool {
    matches!(value, " " | ">" | "+" | "~")
}

pub(crate) fn is_selector_mark(ch: char) -> bool {
    matches!(
        ch,
        '[' | ']'
            | '('
            | ')'
            | '{'
            | '}'
            | '/'
            | '\\'
            | ';'
            | ':'
            | ','
            | '\''
            | '"'
            | '^'
            | '$'
            | '*'
            | '#'
            | '.'
            | '>'
            | '+'
            | '~'
            | SPACE
            | TAB
            | LINE_FEED
            | CARRIAGE_RETURN
            | FORM_FEED
    )
}

fn is_attribute_mark(ch: char) -> bool {
    ch == '=' || is_selector_mark(ch)
}

fn is_style_mark(ch: char) -> bool {
    matches!(
        ch,
        ':' | ';' | '\'' | '"' | '\\' | SPACE | TAB | LINE_FEED | CARRIAGE_RETURN | FORM_FEED
    )
}

/// Splits `input` into single-character mark tokens and the maximal word runs between them.
pub(crate) fn tokenize(input: &str, is_mark: impl Fn(char) -> bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in input.chars() {
        if is_mark(ch) {
            if !word.is_empty() {
                tokens.push(Token::word(std::mem::take(&mut word)));
            }
            tokens.push(Token::mark(ch));
        } else {
            word.push(ch);
        }
    }
    if !word.is_empty() {
        tokens.push(Token::word(word));
    }
    tokens
}

pub(crate) fn tokenize_selector(raw_selector: &str) -> Result<Vec<Token>> {
    let selector = normalize_selector(raw_selector)?;
    Ok(tokenize(&selector, is_selector_mark))
}

pub(crate) fn tokenize_attribute(attribute: &str) -> Vec<Token> {
    tokenize(attribute, is_attribute_mark)
}

pub(crate) fn tokenize_style_block(raw_style: &str) -> Vec<Token> {
    tokenize(raw_style.trim(), is_style_mark)
}

thread_local! {
    static OLD_SYNTAX: std::result::Result<Regex, RegexError> =
        Regex::new(r#"\[-(?:ext)-([a-z-_]+)=(["'])((?:(?=(\\?))\4.)*?)\2\]"#);
}

/// Rewrites legacy and shorthand forms into the canonical selector syntax:
/// `[-ext-name="value"]` becomes `:name(value)`, `(:scope >` becomes `(>` and
/// `:matches-css-before(` becomes `:matches-css(before,`.
pub(crate) fn normalize_selector(raw_selector: &str) -> Result<String> {
    let selector = raw_selector.trim();
    let old_syntax = OLD_SYNTAX
        .with(Clone::clone)
        .map_err(|err| Error::SelectorParse(err.to_string()))?;
    let mut failure = None;
    let mut normalized = old_syntax
        .replace_all_with(selector, |captures| {
            let name = captures.text(1);
            let quote = captures.text(2);
            let value = captures.text(3);
            match unescape_old_syntax_quotes(value, quote) {
                Ok(value) => format!(":{name}({value})"),
                Err(err) => {
                    failure.get_or_insert(err);
                    String::new()
                }
            }
        })
        .map_err(|err| Error::SelectorParse(err.to_string()))?;
    if let Some(err) = failure {
        return Err(err);
    }

    normalized = normalized.replace("(:scope >", "(>");
    normalized = normalized
        .replace(":matches-css-before(", ":matches-css(before,")
        .replace(":matches-css-after(", ":matches-css(after,");

    if normalized.contains("[-ext-") {
        return Err(Error::SelectorParse(format!(
            "Invalid extended-css old syntax selector: '{selector}'"
        )));
    }
    Ok(normalized)
}

fn unescape_old_syntax_quotes(value: &str, quote: &str) -> Result<String> {
    let escaped_quote = Regex::new(&format!(r"([^\\]|^)\\{quote}"))
        .map_err(|err| Error::SelectorParse(err.to_string()))?;
    escaped_quote
        .replace_all_with(value, |captures| format!("{}{quote}", captures.text(1)))
        .map_err(|err| Error::SelectorParse(err.to_string()))
}
