use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationPart {
    Property,
    Value,
}

struct StyleBlockContext<'a> {
    style_block: &'a str,
    processing: DeclarationPart,
    styles: Vec<StyleDeclaration>,
    property: String,
    value: String,
    value_quote: Option<char>,
}

impl<'a> StyleBlockContext<'a> {
    fn new(style_block: &'a str) -> Self {
        Self {
            style_block,
            processing: DeclarationPart::Property,
            styles: Vec::new(),
            property: String::new(),
            value: String::new(),
            value_quote: None,
        }
    }

    fn is_value_quote_open(&self) -> bool {
        !self.value.is_empty() && self.value_quote.is_some()
    }

    fn collect_style(&mut self) {
        self.styles.push(StyleDeclaration::new(
            self.property.trim(),
            self.value.trim(),
        ));
        self.property.clear();
        self.value.clear();
    }

    fn invalid_value(&self) -> Error {
        Error::StyleParse(format!(
            "Invalid style value for property '{}' in style block: '{}'",
            self.property, self.style_block
        ))
    }

    fn process_property_token(&mut self, token: &Token) -> Result<()> {
        if token.is_word() {
            if !self.property.is_empty() {
                // e.g. `padding top: 0;`
                return Err(Error::StyleParse(format!(
                    "Invalid style property in style block: '{}'",
                    self.style_block
                )));
            }
            self.property.push_str(&token.value);
            return Ok(());
        }

        if token.value == ":" {
            if self.property.trim().is_empty() {
                return Err(Error::StyleParse(format!(
                    "Missing style property before ':' in style block: '{}'",
                    self.style_block
                )));
            }
            self.property = self.property.trim().to_string();
            self.processing = DeclarationPart::Value;
            Ok(())
        } else if tokenizer::is_white_space_char(&token.value) {
            Ok(())
        } else {
            Err(Error::StyleParse(format!(
                "Invalid style declaration in style block: '{}'",
                self.style_block
            )))
        }
    }

    fn process_value_token(&mut self, token: &Token) -> Result<()> {
        if token.is_word() {
            self.value.push_str(&token.value);
            return Ok(());
        }

        match token.value.as_str() {
            ":" => {
                // a colon is only allowed inside quotes, e.g. `content: "a:b"`
                if !self.is_value_quote_open() {
                    return Err(self.invalid_value());
                }
                self.value.push(':');
            }
            ";" => {
                if self.is_value_quote_open() {
                    self.value.push(';');
                } else {
                    self.collect_style();
                    self.processing = DeclarationPart::Property;
                }
            }
            quote @ ("'" | "\"") => {
                let mark = if quote == "'" { '\'' } else { '"' };
                match self.value_quote {
                    None => self.value_quote = Some(mark),
                    Some(open) if open == mark && !self.value.ends_with('\\') => {
                        self.value_quote = None;
                    }
                    Some(_) => {}
                }
                self.value.push(mark);
            }
            "\\" => {
                if !self.is_value_quote_open() {
                    return Err(self.invalid_value());
                }
                self.value.push('\\');
            }
            space if tokenizer::is_white_space_char(space) => {
                // leading whitespace of a value is dropped
                if !self.value.is_empty() {
                    self.value.push_str(space);
                }
            }
            other => {
                return Err(Error::StyleParse(format!(
                    "Unknown style declaration token: '{other}'"
                )));
            }
        }
        Ok(())
    }
}

/// Parses the content of a `{ ... }` style block into declarations.
pub fn parse_style_block(raw_style_block: &str) -> Result<Vec<StyleDeclaration>> {
    let style_block = raw_style_block.trim();
    let tokens = tokenizer::tokenize_style_block(style_block);
    let mut context = StyleBlockContext::new(style_block);

    for token in &tokens {
        match context.processing {
            DeclarationPart::Property => context.process_property_token(token)?,
            DeclarationPart::Value => context.process_value_token(token)?,
        }
    }

    if context.is_value_quote_open() {
        return Err(Error::StyleParse(format!(
            "Unbalanced style declaration quotes in style block: '{style_block}'"
        )));
    }

    // last declaration without a trailing semicolon
    if !context.property.is_empty() {
        if context.value.is_empty() {
            return Err(Error::StyleParse(format!(
                "Missing style value for property '{}' in style block '{style_block}'",
                context.property
            )));
        }
        context.collect_style();
    }

    if context.styles.is_empty() {
        return Err(Error::StyleParse(NO_STYLE.into()));
    }
    Ok(context.styles)
}

